use crate::{
    config::Config,
    error::JobError,
    job::{JobCompletion, JobId, JobRequest, JobResult, JobStatus, ERROR_CODE},
    mail::Mailer,
    system::JobSystem,
};
use std::time::Instant;
use tracing::{info, info_span, warn};

/// Drives each request through submit, poll, notify and record.
pub struct Notifier<S: JobSystem, M: Mailer> {
    cfg: Config,
    system: S,
    mailer: M,
}

impl<S: JobSystem, M: Mailer> Notifier<S, M> {
    pub fn new(cfg: &Config, system: S, mailer: M) -> Self {
        Self {
            cfg: cfg.clone(),
            system,
            mailer,
        }
    }

    /// Processes every request in order. Always yields one result per request.
    pub fn run(&self, requests: &[JobRequest]) -> Vec<JobResult> {
        let started = Instant::now();
        let total = requests.len();
        let mut results = Vec::with_capacity(total);

        for (i, req) in requests.iter().enumerate() {
            info!("job {}/{}: {}", i + 1, total, req.job_name);
            results.push(self.process(req));
        }

        let passed = results
            .iter()
            .filter(|r| r.status() == JobStatus::Pass)
            .count();
        info!(
            "run finished: {} jobs, {} passed, {} failed in {}s",
            total,
            passed,
            total - passed,
            started.elapsed().as_secs()
        );
        results
    }

    pub fn process(&self, request: &JobRequest) -> JobResult {
        let span = info_span!("job", name = %request.job_name);
        let _enter = span.enter();

        match self.execute(&request.job_name) {
            Ok((job_id, completion)) => {
                let status = JobStatus::from_output_code(&completion.output_code);
                info!("rc={} status={}", completion.output_code, status);
                let email_sent = self.notify(
                    request,
                    Some(&job_id),
                    &completion.output_code,
                    status,
                    &completion.log,
                );
                JobResult::new(&request.job_name, completion.output_code, email_sent)
            }
            Err(err) => {
                warn!("{err}");
                let email_sent = if self.cfg.mail.notify_on_error {
                    let detail = format!("The job could not be run to completion.\n\n{err}\n");
                    self.notify(request, None, ERROR_CODE, JobStatus::Fail, &detail)
                } else {
                    false
                };
                JobResult::errored(&request.job_name, email_sent)
            }
        }
    }

    fn execute(&self, job_name: &str) -> Result<(JobId, JobCompletion), JobError> {
        let job_id = self.system.submit(job_name)?;
        let completion = self.system.poll(&job_id)?;
        Ok((job_id, completion))
    }

    fn notify(
        &self,
        request: &JobRequest,
        job_id: Option<&JobId>,
        output_code: &str,
        status: JobStatus,
        log: &str,
    ) -> bool {
        let subject = format!("{}: {} {}", self.cfg.mail.subject, request.job_name, status);
        let body = compose_body(
            &request.job_name,
            job_id,
            output_code,
            status,
            log,
            self.cfg.mail.max_log_bytes,
        );
        match self.mailer.send(&request.email, &subject, &body) {
            Ok(()) => {
                info!("notified {}", request.email);
                true
            }
            Err(err) => {
                warn!("notification to {} failed: {err}", request.email);
                false
            }
        }
    }
}

pub fn compose_body(
    job_name: &str,
    job_id: Option<&JobId>,
    output_code: &str,
    status: JobStatus,
    log: &str,
    max_log_bytes: usize,
) -> String {
    let mut body = String::new();
    body.push_str(&format!("Job:         {job_name}\n"));
    if let Some(id) = job_id {
        body.push_str(&format!("Job ID:      {id}\n"));
    }
    body.push_str(&format!("Status:      {status}\n"));
    body.push_str(&format!("Output code: {output_code}\n\n"));
    body.push_str("----- job log -----\n");
    body.push_str(&truncate_log(log, max_log_bytes));
    if !body.ends_with('\n') {
        body.push('\n');
    }
    body
}

/// Cuts `log` to at most `max` bytes on a char boundary. `0` keeps everything.
pub fn truncate_log(log: &str, max: usize) -> String {
    if max == 0 || log.len() <= max {
        return log.to_string();
    }
    let mut end = max;
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... [truncated {} bytes]\n",
        &log[..end],
        log.len() - end
    )
}
