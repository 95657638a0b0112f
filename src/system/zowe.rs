use super::JobSystem;
use crate::config::Config;
use crate::error::{PollError, SubmissionError};
use crate::job::{JobCompletion, JobId, ERROR_CODE};
use crate::process::{self, CmdOutput};
use anyhow::{Context, Result};
use regex::{Regex, RegexSet};
use serde::Serialize;
use std::process::Command;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

static JOBID_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t]*jobid[ \t]*:[ \t]*(\S+)").expect("static regex"));

/// Drives the Zowe CLI. Connection parameters are fixed at construction.
pub struct ZoweCli {
    cfg: Config,
    complete: Regex,
    transient: RegexSet,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZoweDiag {
    pub exe: String,
    pub version: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ZoweCli {
    pub fn new(cfg: &Config) -> Result<Self> {
        let complete = Regex::new(&cfg.zowe.complete_pattern)
            .with_context(|| format!("zowe.complete_pattern: {}", cfg.zowe.complete_pattern))?;
        let transient = RegexSet::new(&cfg.zowe.transient_patterns)
            .with_context(|| "zowe.transient_patterns")?;
        Ok(Self {
            cfg: cfg.clone(),
            complete,
            transient,
        })
    }

    pub fn doctor(&self) -> ZoweDiag {
        let mut cmd = self.command(&["--version".to_string()]);
        match process::run(&mut cmd, None, self.command_timeout()) {
            Ok(out) if out.success => ZoweDiag {
                exe: self.cfg.zowe.exe.clone(),
                version: Some(out.stdout.trim().to_string()),
                ok: true,
                error: None,
            },
            Ok(out) => ZoweDiag {
                exe: self.cfg.zowe.exe.clone(),
                version: None,
                ok: false,
                error: Some(out.summary()),
            },
            Err(e) => ZoweDiag {
                exe: self.cfg.zowe.exe.clone(),
                version: None,
                ok: false,
                error: Some(format!("{e:#}")),
            },
        }
    }

    /// Builds the CLI command with connection parameters in the environment.
    pub fn command(&self, args: &[String]) -> Command {
        let conn = &self.cfg.connection;
        let mut cmd = Command::new(&self.cfg.zowe.exe);
        cmd.args(args);

        for (k, v) in &self.cfg.zowe.env {
            cmd.env(k, v);
        }
        if !conn.host.is_empty() {
            cmd.env("ZOWE_OPT_HOST", &conn.host);
        }
        if conn.port != 0 {
            cmd.env("ZOWE_OPT_PORT", conn.port.to_string());
        }
        if !conn.user.is_empty() {
            cmd.env("ZOWE_OPT_USER", &conn.user);
        }
        if !conn.password.is_empty() {
            cmd.env("ZOWE_OPT_PASSWORD", &conn.password);
        }
        cmd.env(
            "ZOWE_OPT_REJECT_UNAUTHORIZED",
            if conn.reject_unauthorized { "true" } else { "false" },
        );
        cmd
    }

    fn command_timeout(&self) -> Option<Duration> {
        match self.cfg.zowe.command_timeout_seconds {
            0 => None,
            s => Some(Duration::from_secs(s)),
        }
    }

    /// Runs one CLI invocation, retrying while stderr looks like a transient
    /// connection problem.
    fn invoke(&self, template: &[String], job: &str, job_id: &str) -> Result<CmdOutput> {
        let args = render_args(template, job, job_id);
        let mut attempt = 0;
        loop {
            let mut cmd = self.command(&args);
            let out = process::run(&mut cmd, None, self.command_timeout())
                .with_context(|| format!("running {} {}", self.cfg.zowe.exe, args.join(" ")))?;

            if self.cfg.debug.log_cli_output {
                debug!(
                    "{} {} -> {:?}\nstdout: {}\nstderr: {}",
                    self.cfg.zowe.exe,
                    args.join(" "),
                    out.code,
                    out.stdout.trim(),
                    out.stderr.trim()
                );
            }

            if out.success || attempt >= self.cfg.zowe.max_retries || !self.transient.is_match(&out.stderr) {
                return Ok(out);
            }

            attempt += 1;
            warn!(
                "transient CLI failure ({}); retry {}/{}",
                out.summary(),
                attempt,
                self.cfg.zowe.max_retries
            );
            std::thread::sleep(Duration::from_millis(self.cfg.zowe.retry_delay_ms));
        }
    }

    fn is_complete(&self, job_id: &JobId) -> Result<bool, PollError> {
        let out = self
            .invoke(&self.cfg.zowe.status_args, "", &job_id.0)
            .map_err(|e| PollError::Status {
                job_id: job_id.0.clone(),
                detail: format!("{e:#}"),
            })?;
        if !out.success {
            return Err(PollError::Status {
                job_id: job_id.0.clone(),
                detail: out.summary(),
            });
        }
        Ok(self.complete.is_match(&out.stdout))
    }

    fn retrieve(&self, template: &[String], job_id: &JobId) -> Result<String, PollError> {
        let out = self
            .invoke(template, "", &job_id.0)
            .map_err(|e| PollError::Retrieval {
                job_id: job_id.0.clone(),
                detail: format!("{e:#}"),
            })?;
        if !out.success {
            return Err(PollError::Retrieval {
                job_id: job_id.0.clone(),
                detail: out.summary(),
            });
        }
        Ok(out.stdout)
    }
}

impl JobSystem for ZoweCli {
    fn submit(&self, job_name: &str) -> Result<JobId, SubmissionError> {
        let out = self
            .invoke(&self.cfg.zowe.submit_args, job_name, "")
            .map_err(|e| SubmissionError::Invocation {
                job: job_name.to_string(),
                detail: format!("{e:#}"),
            })?;

        let not_found = self
            .cfg
            .zowe
            .not_found_markers
            .iter()
            .any(|m| out.stderr.contains(m.as_str()) || out.stdout.contains(m.as_str()));
        if not_found {
            return Err(SubmissionError::NotFound(job_name.to_string()));
        }
        if !out.success {
            return Err(SubmissionError::Rejected {
                job: job_name.to_string(),
                detail: out.summary(),
            });
        }

        let id = parse_job_id(&out.stdout).ok_or_else(|| SubmissionError::Rejected {
            job: job_name.to_string(),
            detail: format!("no job id in CLI output: {:?}", out.stdout.trim()),
        })?;
        info!("submitted {} as {}", job_name, id);
        Ok(id)
    }

    fn poll(&self, job_id: &JobId) -> Result<JobCompletion, PollError> {
        let started = Instant::now();
        let interval = Duration::from_secs(self.cfg.polling.interval_seconds);
        let limit = self.cfg.polling.job_timeout_seconds;

        while !self.is_complete(job_id)? {
            let waited = started.elapsed().as_secs();
            if limit > 0 && waited >= limit {
                return Err(PollError::Timeout {
                    job_id: job_id.0.clone(),
                    waited_seconds: waited,
                });
            }
            debug!("{} still running after {}s", job_id, waited);
            std::thread::sleep(interval);
        }

        let rc = self.retrieve(&self.cfg.zowe.rc_args, job_id)?;
        let output_code = parse_output_code(&rc).ok_or_else(|| PollError::Retrieval {
            job_id: job_id.0.clone(),
            detail: "empty return code".to_string(),
        })?;
        let log = self.retrieve(&self.cfg.zowe.log_args, job_id)?;

        info!(
            "{} finished rc={} after {}s",
            job_id,
            output_code,
            started.elapsed().as_secs()
        );
        Ok(JobCompletion { output_code, log })
    }
}

/// Substitutes `{job}` and `{job_id}` in an argument template.
pub fn render_args(template: &[String], job: &str, job_id: &str) -> Vec<String> {
    template
        .iter()
        .map(|a| a.replace("{job_id}", job_id).replace("{job}", job))
        .collect()
}

/// A `jobid:` line wins; otherwise the whole output must be a single token.
pub fn parse_job_id(stdout: &str) -> Option<JobId> {
    if let Some(caps) = JOBID_LINE.captures(stdout) {
        return Some(JobId(caps[1].to_string()));
    }
    let trimmed = stdout.trim();
    if trimmed.is_empty() || trimmed.split_whitespace().nth(1).is_some() {
        return None;
    }
    Some(JobId(trimmed.to_string()))
}

/// Last whitespace-separated token, e.g. `CC 0000` -> `0000`.
///
/// A retcode ending in `ERROR` (`JCL ERROR`, `SEC ERROR`) keeps all its words
/// joined by `_` so it can't be mistaken for the local failure sentinel.
pub fn parse_output_code(stdout: &str) -> Option<String> {
    let last = stdout.split_whitespace().last()?;
    if !last.eq_ignore_ascii_case(ERROR_CODE) {
        return Some(last.to_string());
    }
    let words: Vec<&str> = stdout.split_whitespace().collect();
    if words.len() == 1 {
        return Some(format!("JCL_{last}"));
    }
    Some(words.join("_"))
}
