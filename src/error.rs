//! Per-job failure taxonomy.
//!
//! None of these abort a run: the notifier folds each of them into a degraded
//! [`crate::job::JobResult`]. Run-level failures (config, input, output) travel
//! as `anyhow::Error` instead.

/// The job system rejected or failed to accept a job.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("job {0} not found on the remote system")]
    NotFound(String),

    #[error("submission of {job} rejected: {detail}")]
    Rejected { job: String, detail: String },

    /// The CLI could not be run at all (missing binary, timeout).
    #[error("submission of {job} failed: {detail}")]
    Invocation { job: String, detail: String },
}

/// Status or log retrieval failed before the job reached a terminal state.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("status query for {job_id} failed: {detail}")]
    Status { job_id: String, detail: String },

    #[error("job {job_id} did not complete within {waited_seconds}s")]
    Timeout { job_id: String, waited_seconds: u64 },

    #[error("retrieving results of {job_id} failed: {detail}")]
    Retrieval { job_id: String, detail: String },
}

/// The mail capability could not deliver a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("invalid address {address}: {detail}")]
    Address { address: String, detail: String },

    #[error("could not build message: {0}")]
    Build(String),

    #[error("mail transport failed: {0}")]
    Transport(String),

    #[error("mail to {to} rejected: {detail}")]
    Rejected { to: String, detail: String },
}

/// Either stage of driving a job to completion.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),
}
