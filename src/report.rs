use crate::job::{JobResult, JobStatus};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started: String,
    pub finished: String,
    pub input: String,
    pub output: String,
    pub totals: RunTotals,
    pub results: Vec<JobResult>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub jobs: usize,
    pub passed: usize,
    pub failed: usize,
    pub emails_sent: usize,
}

impl RunTotals {
    pub fn tally(results: &[JobResult]) -> Self {
        let passed = results
            .iter()
            .filter(|r| r.status() == JobStatus::Pass)
            .count();
        Self {
            jobs: results.len(),
            passed,
            failed: results.len() - passed,
            emails_sent: results.iter().filter(|r| r.email_sent()).count(),
        }
    }
}
