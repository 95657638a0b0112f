use serde::{Deserialize, Serialize};
use std::fmt;

/// Output code reported by a job that ended cleanly.
pub const SUCCESS_CODE: &str = "0000";

/// Output code recorded when no real completion code could be obtained.
pub const ERROR_CODE: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_name: String,
    pub email: String,
}

impl JobRequest {
    pub fn new(job_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            email: email.into(),
        }
    }
}

/// Identifier handed out by the job system on submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a finished job leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    pub output_code: String,
    pub log: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pass,
    Fail,
}

impl JobStatus {
    pub fn from_output_code(code: &str) -> Self {
        if code == SUCCESS_CODE {
            JobStatus::Pass
        } else {
            JobStatus::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pass => "Pass",
            JobStatus::Fail => "Fail",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the run's output. The status is derived from the output code
/// at construction and the value is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    job_name: String,
    output_code: String,
    status: JobStatus,
    email_sent: bool,
}

impl JobResult {
    pub fn new(job_name: impl Into<String>, output_code: impl Into<String>, email_sent: bool) -> Self {
        let output_code = output_code.into();
        Self {
            job_name: job_name.into(),
            status: JobStatus::from_output_code(&output_code),
            output_code,
            email_sent,
        }
    }

    /// Result for a job that never produced a completion code.
    pub fn errored(job_name: impl Into<String>, email_sent: bool) -> Self {
        Self::new(job_name, ERROR_CODE, email_sent)
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn output_code(&self) -> &str {
        &self.output_code
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn email_sent(&self) -> bool {
        self.email_sent
    }

    /// `Yes` / `No`, as written to the output table.
    pub fn email_label(&self) -> &'static str {
        if self.email_sent { "Yes" } else { "No" }
    }

    pub fn to_row(&self) -> [&str; 4] {
        [
            &self.job_name,
            &self.output_code,
            self.status.as_str(),
            self.email_label(),
        ]
    }
}
