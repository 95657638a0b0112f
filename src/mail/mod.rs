pub mod command;
pub mod smtp;

use crate::config::{Config, MailTransport};
use crate::error::NotificationError;
use anyhow::Result;

pub use command::CommandMailer;
pub use smtp::SmtpMailer;

pub trait Mailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError>;

    /// Short human-readable description for diagnostics.
    fn describe(&self) -> String;
}

impl<M: Mailer + ?Sized> Mailer for Box<M> {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        (**self).send(to, subject, body)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<M: Mailer + ?Sized> Mailer for &M {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        (**self).send(to, subject, body)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Builds the transport selected by `mail.transport`.
pub fn from_config(cfg: &Config) -> Result<Box<dyn Mailer>> {
    Ok(match cfg.mail.transport {
        MailTransport::Command => Box::new(CommandMailer::new(cfg)),
        MailTransport::Smtp => Box::new(SmtpMailer::new(cfg)?),
    })
}
