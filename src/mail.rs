use lettre::{message::Mailbox, Message};
use pet_blog_models::{
    notifier::{Notifier, NotifyError},
    CONFIG,
};

#[cfg(feature = "debug-mailer")]
use tracing::info;

#[cfg(not(feature = "debug-mailer"))]
use lettre::{
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        extension::ClientId,
    },
    SmtpTransport, Transport,
};
#[cfg(not(feature = "debug-mailer"))]
use pet_blog_models::config::SUBMISSIONS_PORT;
#[cfg(not(feature = "debug-mailer"))]
use tracing::{error, warn};

const DEFAULT_FROM: &str = "from@pet-blog.com";

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse()
        .map_err(|e| NotifyError::InvalidMessage(format!("{}: {}", address, e)))
}

pub fn build_mail(from: &str, dest: &str, subject: &str, body: &str) -> Result<Message, NotifyError> {
    Message::builder()
        .from(mailbox(from)?)
        .to(mailbox(dest)?)
        .subject(subject)
        .body(body.to_owned())
        .map_err(|e| NotifyError::InvalidMessage(e.to_string()))
}

fn sender() -> String {
    CONFIG
        .mail
        .as_ref()
        .map(|mail| mail.from.clone())
        .unwrap_or_else(|| DEFAULT_FROM.to_owned())
}

/// Logs every message instead of sending it.
#[cfg(feature = "debug-mailer")]
pub struct Mailer {
    from: String,
}

#[cfg(feature = "debug-mailer")]
pub fn init() -> Mailer {
    Mailer { from: sender() }
}

#[cfg(feature = "debug-mailer")]
impl Notifier for Mailer {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = build_mail(&self.from, recipient, subject, body)?;
        info!(
            from = %self.from,
            to = %recipient,
            "{}",
            String::from_utf8_lossy(&message.formatted())
        );
        Ok(())
    }
}

/// Sends messages through the SMTP server set up with the `MAIL_*` variables.
#[cfg(not(feature = "debug-mailer"))]
pub struct Mailer {
    from: String,
    transport: Option<SmtpTransport>,
}

#[cfg(not(feature = "debug-mailer"))]
pub fn init() -> Mailer {
    let transport = match CONFIG.mail.as_ref() {
        Some(config) => {
            let builder = if config.port == SUBMISSIONS_PORT {
                SmtpTransport::relay(&config.server)
            } else {
                SmtpTransport::starttls_relay(&config.server)
            };
            match builder {
                Ok(builder) => Some(
                    builder
                        .port(config.port)
                        .hello_name(ClientId::Domain(config.helo_name.clone()))
                        .credentials(Credentials::new(
                            config.username.clone(),
                            config.password.clone(),
                        ))
                        .authentication(vec![Mechanism::Plain])
                        .build(),
                ),
                Err(e) => {
                    error!("Invalid mail server {}: {}", config.server, e);
                    None
                }
            }
        }
        None => {
            warn!("No mail server configured, subscribers won't be notified by email");
            None
        }
    };
    Mailer {
        from: sender(),
        transport,
    }
}

#[cfg(not(feature = "debug-mailer"))]
impl Notifier for Mailer {
    fn notify(&self, recipient: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let transport = self.transport.as_ref().ok_or(NotifyError::NotConfigured)?;
        let message = build_mail(&self.from, recipient, subject, body)?;
        transport
            .send(&message)
            .map(|_| ())
            .map_err(|e| NotifyError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_mail_headers() {
        let message = build_mail(
            "from@pet-blog.com",
            "user1@example.com",
            "New post",
            "You have a new post in your feed.",
        )
        .unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("From: from@pet-blog.com"));
        assert!(formatted.contains("To: user1@example.com"));
        assert!(formatted.contains("Subject: New post"));
        assert!(formatted.contains("You have a new post in your feed."));
    }

    #[test]
    fn build_mail_rejects_bad_addresses() {
        assert!(matches!(
            build_mail("from@pet-blog.com", "not an address", "New post", ""),
            Err(NotifyError::InvalidMessage(_))
        ));
    }

    #[cfg(feature = "debug-mailer")]
    #[test]
    fn debug_mailer_only_logs() {
        let mailer = Mailer {
            from: DEFAULT_FROM.to_owned(),
        };
        assert!(mailer
            .notify("user1@example.com", "New post", "Hello")
            .is_ok());
        assert!(matches!(
            mailer.notify("not an address", "New post", ""),
            Err(NotifyError::InvalidMessage(_))
        ));
    }

    #[cfg(not(feature = "debug-mailer"))]
    #[test]
    fn unconfigured_mailer_fails() {
        let mailer = Mailer {
            from: DEFAULT_FROM.to_owned(),
            transport: None,
        };
        assert!(matches!(
            mailer.notify("user1@example.com", "New post", ""),
            Err(NotifyError::NotConfigured)
        ));
    }
}
