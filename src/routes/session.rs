use crate::routes::{errors::ErrorPage, invalid, Page, RespondOrRedirect};
use pet_blog_models::{
    db_conn::DbConn,
    users::{User, AUTH_COOKIE},
    Error,
};
use rocket::{
    form::Form,
    http::{Cookie, CookieJar},
    request::FlashMessage,
    response::Redirect,
    serde::json::Json,
};
use serde::Serialize;
use std::borrow::Cow;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Default, FromForm, Serialize, Validate)]
pub struct LoginForm {
    #[field(default = String::new())]
    #[validate(length(min = 1, message = "We need an email, or a username to identify you"))]
    pub email_or_name: String,
    #[serde(skip_serializing)]
    #[field(default = String::new())]
    #[validate(length(min = 1, message = "Your password can't be empty"))]
    pub password: String,
    pub next: Option<String>,
}

#[get("/login?<m>")]
pub fn new(m: Option<String>, flash: Option<FlashMessage<'_>>, account: Option<User>) -> Page {
    let callback = flash
        .filter(|flash| flash.kind() == "callback")
        .map(|flash| flash.message().to_owned());
    let form = LoginForm {
        next: callback.clone(),
        ..LoginForm::default()
    };
    Json(json!({
        "account": account,
        "message": m,
        "callback": callback,
        "form": form,
        "errors": Option::<ValidationErrors>::None,
    }))
}

/// Only local paths are followed after login.
fn return_target(next: Option<String>) -> String {
    next.filter(|next| next.starts_with('/') && !next.starts_with("//"))
        .unwrap_or_else(|| "/".to_owned())
}

#[post("/login", data = "<form>")]
pub async fn create(
    conn: DbConn,
    form: Form<LoginForm>,
    cookies: &CookieJar<'_>,
) -> Result<RespondOrRedirect, ErrorPage> {
    let form = form.into_inner();
    if let Err(errors) = form.validate() {
        return Ok(invalid(json!({ "form": form, "errors": errors })));
    }

    let (ident, password) = (form.email_or_name.clone(), form.password.clone());
    match conn
        .run(move |conn| User::login(conn, &ident, &password))
        .await
    {
        Ok(user) => {
            cookies.add_private(Cookie::new(AUTH_COOKIE, user.id.to_string()));
            Ok(Redirect::to(return_target(form.next)).into())
        }
        Err(Error::NotFound) => {
            let mut error = ValidationError::new("invalid_login");
            error.message = Some(Cow::Borrowed("Invalid username, or password"));
            let mut errors = ValidationErrors::new();
            errors.add("email_or_name", error);
            Ok(invalid(json!({ "form": form, "errors": errors })))
        }
        Err(e) => Err(e.into()),
    }
}

#[get("/logout")]
pub fn delete(cookies: &CookieJar<'_>) -> Redirect {
    cookies.remove_private(Cookie::from(AUTH_COOKIE));
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::return_target;

    #[test]
    fn only_local_targets() {
        assert_eq!(return_target(Some("/feed".to_owned())), "/feed");
        assert_eq!(return_target(Some("https://evil.example".to_owned())), "/");
        assert_eq!(return_target(Some("//evil.example".to_owned())), "/");
        assert_eq!(return_target(None), "/");
    }
}
