use job_notifier::{
    config::Config,
    error::{NotificationError, PollError, SubmissionError},
    job::{JobCompletion, JobId, JobRequest, JobStatus},
    mail::Mailer,
    notifier::Notifier,
    system::JobSystem,
    table::write_results,
};
use std::cell::RefCell;
use std::collections::HashMap;

enum Outcome {
    Code(&'static str),
    SubmitFails,
    PollFails,
}

struct FakeSystem {
    jobs: HashMap<&'static str, Outcome>,
}

impl FakeSystem {
    fn new(jobs: Vec<(&'static str, Outcome)>) -> Self {
        Self {
            jobs: jobs.into_iter().collect(),
        }
    }
}

impl JobSystem for FakeSystem {
    fn submit(&self, job_name: &str) -> Result<JobId, SubmissionError> {
        match self.jobs.get(job_name) {
            Some(Outcome::SubmitFails) | None => Err(SubmissionError::NotFound(job_name.to_string())),
            Some(_) => Ok(JobId(format!("JOB-{job_name}"))),
        }
    }

    fn poll(&self, job_id: &JobId) -> Result<JobCompletion, PollError> {
        let name = job_id.0.trim_start_matches("JOB-");
        match self.jobs.get(name) {
            Some(Outcome::Code(code)) => Ok(JobCompletion {
                output_code: code.to_string(),
                log: format!("log of {name}\nRC={code}\n"),
            }),
            _ => Err(PollError::Timeout {
                job_id: job_id.0.clone(),
                waited_seconds: 3600,
            }),
        }
    }
}

#[derive(Default)]
struct FakeMailer {
    fail: bool,
    sent: RefCell<Vec<(String, String, String)>>,
}

impl Mailer for FakeMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Transport("relay down".into()));
        }
        self.sent
            .borrow_mut()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }

    fn describe(&self) -> String {
        "fake".into()
    }
}

fn scenario_system() -> FakeSystem {
    FakeSystem::new(vec![
        ("PAYROLL01", Outcome::Code("0000")),
        ("BATCHJOB2", Outcome::Code("0012")),
        ("FAILSUB3", Outcome::SubmitFails),
        ("POLLFAIL4", Outcome::PollFails),
    ])
}

fn scenario_requests() -> Vec<JobRequest> {
    vec![
        JobRequest::new("PAYROLL01", "a@x.com"),
        JobRequest::new("BATCHJOB2", "b@x.com"),
        JobRequest::new("FAILSUB3", "c@x.com"),
        JobRequest::new("POLLFAIL4", "d@x.com"),
    ]
}

fn rows(results: &[job_notifier::job::JobResult]) -> Vec<[String; 4]> {
    results
        .iter()
        .map(|r| r.to_row().map(str::to_string))
        .collect()
}

#[test]
fn documented_scenarios() {
    let cfg = Config::default();
    let mailer = FakeMailer::default();
    let notifier = Notifier::new(&cfg, scenario_system(), &mailer);

    let results = notifier.run(&scenario_requests());
    assert_eq!(
        rows(&results),
        vec![
            ["PAYROLL01", "0000", "Pass", "Yes"].map(String::from),
            ["BATCHJOB2", "0012", "Fail", "Yes"].map(String::from),
            ["FAILSUB3", "ERROR", "Fail", "No"].map(String::from),
            ["POLLFAIL4", "ERROR", "Fail", "No"].map(String::from),
        ]
    );

    let sent = mailer.sent.borrow();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "a@x.com");
    assert_eq!(sent[0].1, "JCL Execution Logs: PAYROLL01 Pass");
    assert!(sent[0].2.contains("Job ID:      JOB-PAYROLL01"));
    assert!(sent[0].2.contains("log of PAYROLL01"));
    assert_eq!(sent[1].1, "JCL Execution Logs: BATCHJOB2 Fail");
    assert!(sent[1].2.contains("Output code: 0012"));
}

#[test]
fn one_result_per_request_in_order() {
    let cfg = Config::default();
    let mailer = FakeMailer::default();
    let notifier = Notifier::new(&cfg, scenario_system(), &mailer);

    let mut requests = scenario_requests();
    requests.reverse();
    requests.push(JobRequest::new("PAYROLL01", "again@x.com"));
    let results = notifier.run(&requests);

    assert_eq!(results.len(), requests.len());
    for (req, res) in requests.iter().zip(&results) {
        assert_eq!(req.job_name, res.job_name());
        assert_eq!(
            res.status() == JobStatus::Pass,
            res.output_code() == "0000"
        );
    }
}

#[test]
fn mail_failure_is_recorded_not_fatal() {
    let cfg = Config::default();
    let mailer = FakeMailer {
        fail: true,
        ..Default::default()
    };
    let notifier = Notifier::new(&cfg, scenario_system(), &mailer);

    let results = notifier.run(&scenario_requests());
    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| !r.email_sent()));
    assert_eq!(results[0].status(), JobStatus::Pass);
    assert_eq!(results[0].email_label(), "No");
}

#[test]
fn notify_on_error_mails_failed_submissions() {
    let mut cfg = Config::default();
    cfg.mail.notify_on_error = true;
    let mailer = FakeMailer::default();
    let notifier = Notifier::new(&cfg, scenario_system(), &mailer);

    let result = notifier.process(&JobRequest::new("FAILSUB3", "c@x.com"));
    assert_eq!(result.output_code(), "ERROR");
    assert_eq!(result.status(), JobStatus::Fail);
    assert!(result.email_sent());

    let sent = mailer.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "JCL Execution Logs: FAILSUB3 Fail");
    assert!(sent[0].2.contains("not found"));
}

#[test]
fn rerun_produces_identical_output() {
    let cfg = Config::default();
    let render = || {
        let mailer = FakeMailer::default();
        let notifier = Notifier::new(&cfg, scenario_system(), &mailer);
        let results = notifier.run(&scenario_requests());
        let mut buf = Vec::new();
        write_results(&mut buf, &results, true).unwrap();
        buf
    };
    let first = render();
    assert_eq!(first, render());

    let text = String::from_utf8(first).unwrap();
    assert!(text.starts_with("JCL Name,Output Code,JCL Pass/Fail,Email Sent\n"));
    assert!(text.contains("FAILSUB3,ERROR,Fail,No\n"));
}
