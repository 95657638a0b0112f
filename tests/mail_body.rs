use job_notifier::{
    config::Config,
    error::{NotificationError, PollError, SubmissionError},
    job::{JobCompletion, JobId, JobRequest, JobStatus},
    mail::Mailer,
    notifier::{compose_body, truncate_log, Notifier},
    system::JobSystem,
};
use std::cell::RefCell;

#[test]
fn short_or_unlimited_logs_are_kept() {
    assert_eq!(truncate_log("IEF142I STEP1\n", 0), "IEF142I STEP1\n");
    assert_eq!(truncate_log("IEF142I STEP1\n", 14), "IEF142I STEP1\n");
    assert_eq!(truncate_log("", 4), "");
}

#[test]
fn long_log_is_cut_with_a_marker() {
    assert_eq!(truncate_log("abcdefgh", 3), "abc\n... [truncated 5 bytes]\n");
}

#[test]
fn cut_backs_off_to_a_char_boundary() {
    // 'é' spans bytes 1..3; a cut at 2 would split it.
    assert_eq!(truncate_log("héllo", 2), "h\n... [truncated 5 bytes]\n");
    assert_eq!(truncate_log("héllo", 3), "hé\n... [truncated 3 bytes]\n");
    assert_eq!(truncate_log("€uro", 1), "\n... [truncated 6 bytes]\n");
}

#[test]
fn body_has_header_block_then_log() {
    let id = JobId("JOB00042".into());
    let body = compose_body("PAYROLL01", Some(&id), "0000", JobStatus::Pass, "line 1\nline 2", 0);
    assert_eq!(
        body,
        "Job:         PAYROLL01\n\
         Job ID:      JOB00042\n\
         Status:      Pass\n\
         Output code: 0000\n\
         \n\
         ----- job log -----\n\
         line 1\n\
         line 2\n"
    );
}

#[test]
fn body_without_job_id_skips_that_line() {
    let body = compose_body("FAILSUB3", None, "ERROR", JobStatus::Fail, "not found", 0);
    assert!(!body.contains("Job ID:"));
    assert!(body.contains("Status:      Fail\n"));
    assert!(body.ends_with("not found\n"));
}

struct LongLog;

impl JobSystem for LongLog {
    fn submit(&self, job_name: &str) -> Result<JobId, SubmissionError> {
        Ok(JobId(format!("JOB-{job_name}")))
    }

    fn poll(&self, _job_id: &JobId) -> Result<JobCompletion, PollError> {
        Ok(JobCompletion {
            output_code: "0000".into(),
            log: "ü".repeat(100),
        })
    }
}

#[derive(Default)]
struct Capture {
    bodies: RefCell<Vec<String>>,
}

impl Mailer for Capture {
    fn send(&self, _to: &str, _subject: &str, body: &str) -> Result<(), NotificationError> {
        self.bodies.borrow_mut().push(body.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "capture".into()
    }
}

#[test]
fn notifier_applies_configured_log_limit() {
    let mut cfg = Config::default();
    cfg.mail.max_log_bytes = 11;
    let mailer = Capture::default();
    let notifier = Notifier::new(&cfg, LongLog, &mailer);

    let result = notifier.process(&JobRequest::new("PAYROLL01", "a@x.com"));
    assert_eq!(result.status(), JobStatus::Pass);

    let bodies = mailer.bodies.borrow();
    assert_eq!(bodies.len(), 1);
    // Five two-byte chars fit in 11 bytes.
    let log = bodies[0].split("----- job log -----\n").nth(1).unwrap();
    assert_eq!(log, format!("{}\n... [truncated 190 bytes]\n", "ü".repeat(5)));
}
