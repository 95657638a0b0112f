use job_notifier::config::{Config, MailTransport};

#[test]
fn parse_example_config() {
    let raw = include_str!("../job-notifier.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.zowe.exe, "zowe");
    assert_eq!(cfg.mail.transport, MailTransport::Command);
    assert!(cfg.polling.interval_seconds >= 1);
    assert!(!cfg.output.path.is_empty());
}

#[test]
fn defaults_fill_missing_sections() {
    let cfg: Config = toml::from_str("[connection]\nhost = \"mvs.example.com\"\nport = 443\n")
        .expect("parse TOML");
    cfg.validate().expect("valid config");
    assert_eq!(cfg.connection.port, 443);
    assert_eq!(cfg.polling.interval_seconds, 5);
    assert_eq!(cfg.polling.job_timeout_seconds, 3600);
    assert_eq!(cfg.mail.subject, "JCL Execution Logs");
    assert!(!cfg.input.has_header);
    assert!(!cfg.mail.notify_on_error);
}

#[test]
fn rejects_bad_settings() {
    let mut cfg = Config::default();
    cfg.polling.interval_seconds = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.zowe.complete_pattern = "(unclosed".into();
    assert!(cfg.validate().is_err());

    let mut cfg = Config::default();
    cfg.mail.transport = MailTransport::Smtp;
    cfg.mail.smtp.host = "smtp.example.com".into();
    assert!(cfg.validate().is_err(), "smtp needs a from address");
    cfg.mail.from = "batch@example.com".into();
    assert!(cfg.validate().is_ok());
}

#[test]
fn debug_output_hides_passwords() {
    let mut cfg = Config::default();
    cfg.connection.password = "hunter2".into();
    cfg.mail.smtp.password = "s3cret".into();
    let dbg = format!("{cfg:?}");
    assert!(!dbg.contains("hunter2"));
    assert!(!dbg.contains("s3cret"));
}
