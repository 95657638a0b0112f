//! SMTP delivery through `lettre`'s blocking transport.

use super::Mailer;
use crate::config::Config;
use crate::error::NotificationError;
use anyhow::{Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;
use tracing::debug;

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
    relay: String,
}

impl SmtpMailer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let smtp = &cfg.mail.smtp;
        let from: Mailbox = cfg
            .mail
            .from
            .parse()
            .with_context(|| format!("mail.from: {}", cfg.mail.from))?;

        let builder = if smtp.starttls {
            SmtpTransport::starttls_relay(&smtp.host)
                .with_context(|| format!("smtp relay: {}", smtp.host))?
        } else {
            SmtpTransport::builder_dangerous(&smtp.host)
        };

        let mut builder = builder.port(smtp.port);
        if !smtp.user.is_empty() {
            builder = builder.credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()));
        }
        if cfg.mail.timeout_seconds > 0 {
            builder = builder.timeout(Some(Duration::from_secs(cfg.mail.timeout_seconds)));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            relay: format!("{}:{}", smtp.host, smtp.port),
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        let to_box: Mailbox = to.parse().map_err(|e: lettre::address::AddressError| {
            NotificationError::Address {
                address: to.to_string(),
                detail: e.to_string(),
            }
        })?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_box)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| NotificationError::Build(e.to_string()))?;

        let response = self
            .transport
            .send(&message)
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        debug!("smtp {} accepted mail for {}: {:?}", self.relay, to, response.code());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("smtp: {}", self.relay)
    }
}
