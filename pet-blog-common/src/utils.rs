use rand::Rng;
use rocket::{
    http::{uri::Uri, RawStr},
    response::{Flash, Redirect},
};

/// Generates an hexadecimal representation of 32 bytes of random data
pub fn random_hex() -> String {
    let bytes = rand::thread_rng().gen::<[u8; 32]>();
    bytes
        .iter()
        .fold(String::new(), |res, byte| format!("{}{:02x}", res, byte))
}

/// Redirects to the login page with a given message.
///
/// The URL to come back to after login is kept in a flash cookie of kind `callback`.
pub fn requires_login<T: Into<Uri<'static>>>(message: &str, url: T) -> Flash<Redirect> {
    Flash::new(
        Redirect::to(format!(
            "/login?m={}",
            RawStr::new(message).percent_encode().as_str()
        )),
        "callback",
        url.into().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_hex_is_hex() {
        let hex = random_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(hex, random_hex());
    }
}
