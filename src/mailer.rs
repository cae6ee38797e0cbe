use anyhow::Context;
use axum::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .context("parse SMTP from address")?;

        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        }
        .port(config.port);

        let builder = if let (Some(username), Some(password)) =
            (&config.username, &config.password)
        {
            builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            builder
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str, text: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to.parse().context("parse recipient address")?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )?;

        self.transport.send(message).await.context("smtp send")?;
        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn verification_email(code: &str, expires_minutes: i64) -> RenderedEmail {
    RenderedEmail {
        subject: "Verify your account".to_string(),
        html: format!(
            "<h2>Email Verification</h2>\
             <p>Your verification code is:</p>\
             <h1>{code}</h1>\
             <p>This code will expire in {expires_minutes} minutes.</p>"
        ),
        text: format!(
            "Your verification code is {code}. It expires in {expires_minutes} minutes."
        ),
    }
}

pub fn reset_code_email(code: &str, expires_minutes: i64) -> RenderedEmail {
    RenderedEmail {
        subject: "Your password reset code".to_string(),
        html: format!(
            "<h2>Password Reset</h2>\
             <p>Use this code to reset your password:</p>\
             <h1>{code}</h1>\
             <p>This code will expire in {expires_minutes} minutes. \
             If you did not request a reset, you can ignore this email.</p>"
        ),
        text: format!(
            "Use this code to reset your password: {code}. \
             It expires in {expires_minutes} minutes. \
             If you did not request a reset, you can ignore this email."
        ),
    }
}

pub fn password_changed_email() -> RenderedEmail {
    RenderedEmail {
        subject: "Your password was changed".to_string(),
        html: "<h2>Password Changed</h2>\
               <p>Your password was changed successfully. \
               If this was not you, reset your password immediately.</p>"
            .to_string(),
        text: "Your password was changed successfully. \
               If this was not you, reset your password immediately."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_contains_code_and_ttl() {
        let mail = verification_email("482913", 3);
        assert_eq!(mail.subject, "Verify your account");
        assert!(mail.html.contains("482913"));
        assert!(mail.html.contains("3 minutes"));
        assert!(mail.text.contains("482913"));
    }

    #[test]
    fn reset_email_contains_code_and_ttl() {
        let mail = reset_code_email("000123", 15);
        assert!(mail.html.contains("000123"));
        assert!(mail.html.contains("15 minutes"));
        assert!(mail.text.contains("000123"));
    }

    #[test]
    fn password_changed_email_has_no_placeholders() {
        let mail = password_changed_email();
        assert!(!mail.html.contains('{'));
        assert!(!mail.text.contains('{'));
    }
}
