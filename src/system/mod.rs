pub mod zowe;

use crate::error::{PollError, SubmissionError};
use crate::job::{JobCompletion, JobId};

/// The remote batch system, reduced to what the notifier needs.
pub trait JobSystem {
    fn submit(&self, job_name: &str) -> Result<JobId, SubmissionError>;

    /// Blocks until the job reaches a terminal state, then returns its output
    /// code and log.
    fn poll(&self, job_id: &JobId) -> Result<JobCompletion, PollError>;
}

impl<S: JobSystem + ?Sized> JobSystem for &S {
    fn submit(&self, job_name: &str) -> Result<JobId, SubmissionError> {
        (**self).submit(job_name)
    }

    fn poll(&self, job_id: &JobId) -> Result<JobCompletion, PollError> {
        (**self).poll(job_id)
    }
}
