use super::Mailer;
use crate::config::Config;
use crate::error::NotificationError;
use crate::process;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

/// Hands the message to a local mail command (`mail -s <subject> <to>` by
/// default), body on stdin. No shell is involved.
pub struct CommandMailer {
    program: String,
    args: Vec<String>,
    from: String,
    timeout: Option<Duration>,
}

impl CommandMailer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            program: cfg.mail.command.clone(),
            args: cfg.mail.command_args.clone(),
            from: cfg.mail.from.clone(),
            timeout: match cfg.mail.timeout_seconds {
                0 => None,
                s => Some(Duration::from_secs(s)),
            },
        }
    }

    fn render(&self, to: &str, subject: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| {
                a.replace("{subject}", subject)
                    .replace("{to}", to)
                    .replace("{from}", &self.from)
            })
            .collect()
    }
}

impl Mailer for CommandMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if to.trim().is_empty() {
            return Err(NotificationError::Address {
                address: to.to_string(),
                detail: "empty address".to_string(),
            });
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(self.render(to, subject));

        let out = process::run(&mut cmd, Some(body.as_bytes()), self.timeout)
            .map_err(|e| NotificationError::Transport(format!("{e:#}")))?;
        if !out.success {
            return Err(NotificationError::Rejected {
                to: to.to_string(),
                detail: out.summary(),
            });
        }
        debug!("{} accepted mail for {}", self.program, to);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("command: {} {}", self.program, self.args.join(" "))
    }
}
