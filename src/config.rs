use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub zowe: Zowe,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub mail: Mail,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.zowe.complete_pattern)
            .with_context(|| format!("zowe.complete_pattern: {}", self.zowe.complete_pattern))?;
        for p in &self.zowe.transient_patterns {
            Regex::new(p).with_context(|| format!("zowe.transient_patterns: {p}"))?;
        }
        if self.polling.interval_seconds == 0 {
            return Err(anyhow!("polling.interval_seconds must be > 0"));
        }
        if !self.input.delimiter.is_ascii() {
            return Err(anyhow!(
                "input.delimiter must be a single ASCII character: {:?}",
                self.input.delimiter
            ));
        }
        if self.mail.transport == MailTransport::Smtp {
            if self.mail.from.trim().is_empty() {
                return Err(anyhow!("mail.from is required for the smtp transport"));
            }
            if self.mail.smtp.host.trim().is_empty() {
                return Err(anyhow!("mail.smtp.host is required for the smtp transport"));
            }
        }
        Ok(())
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub strict_exit: bool,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            strict_exit: false,
            print_summary: true,
        }
    }
}

/// Connection parameters handed to the CLI. Empty values are left to the
/// CLI's own profiles.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub reject_unauthorized: bool,
}
impl Default for Connection {
    fn default() -> Self {
        Self {
            host: "".into(),
            port: 0,
            user: "".into(),
            password: "".into(),
            reject_unauthorized: false,
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Zowe {
    pub exe: String,
    pub command_timeout_seconds: u64,
    pub submit_args: Vec<String>,
    pub status_args: Vec<String>,
    pub rc_args: Vec<String>,
    pub log_args: Vec<String>,
    pub complete_pattern: String,
    pub not_found_markers: Vec<String>,
    pub transient_patterns: Vec<String>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
impl Default for Zowe {
    fn default() -> Self {
        Self {
            exe: "zowe".into(),
            command_timeout_seconds: 120,
            submit_args: args(&["jobs", "submit", "data-set", "{job}", "--rff", "jobid", "--rft", "string"]),
            status_args: args(&["jobs", "view", "job-status-by-jobid", "{job_id}"]),
            rc_args: args(&[
                "jobs",
                "view",
                "job-status-by-jobid",
                "{job_id}",
                "--rff",
                "retcode",
                "--rft",
                "string",
            ]),
            log_args: args(&["jobs", "view", "all-spool-content", "{job_id}"]),
            complete_pattern: r"(?i)\bstatus:\s*OUTPUT\b".into(),
            not_found_markers: vec!["DATA_SET_NOT_FOUND".into()],
            transient_patterns: vec![
                "ECONNRESET".into(),
                "ECONNREFUSED".into(),
                "ETIMEDOUT".into(),
                "EAI_AGAIN".into(),
                "(?i)socket hang up".into(),
            ],
            max_retries: 2,
            retry_delay_ms: 2000,
            env: Default::default(),
        }
    }
}

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Polling {
    pub interval_seconds: u64,
    /// 0 waits forever.
    pub job_timeout_seconds: u64,
}
impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            job_timeout_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    Command,
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mail {
    pub transport: MailTransport,
    pub subject: String,
    pub from: String,
    pub notify_on_error: bool,
    pub max_log_bytes: usize,
    pub timeout_seconds: u64,
    pub command: String,
    pub command_args: Vec<String>,
    #[serde(default)]
    pub smtp: Smtp,
}
impl Default for Mail {
    fn default() -> Self {
        Self {
            transport: MailTransport::Command,
            subject: "JCL Execution Logs".into(),
            from: "".into(),
            notify_on_error: false,
            max_log_bytes: 0,
            timeout_seconds: 60,
            command: "mail".into(),
            command_args: args(&["-s", "{subject}", "{to}"]),
            smtp: Default::default(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Smtp {
    pub host: String,
    pub port: u16,
    pub starttls: bool,
    pub user: String,
    pub password: String,
}
impl Default for Smtp {
    fn default() -> Self {
        Self {
            host: "".into(),
            port: 587,
            starttls: true,
            user: "".into(),
            password: "".into(),
        }
    }
}

impl std::fmt::Debug for Smtp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Smtp")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("user", &self.user)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub path: String,
    pub has_header: bool,
    pub delimiter: char,
}
impl Default for Input {
    fn default() -> Self {
        Self {
            path: "input.csv".into(),
            has_header: false,
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub path: String,
    pub write_header: bool,
    pub write_report_json: bool,
    pub report_path: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            path: "output.csv".into(),
            write_header: true,
            write_report_json: true,
            report_path: "job-notifier-report.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: true,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub log_cli_output: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            log_cli_output: false,
        }
    }
}
