use crate::{
    config::Config,
    job::JobRequest,
    mail,
    notifier::Notifier,
    report::{RunReport, RunTotals},
    system::zowe::ZoweCli,
    table::{self, ReadOptions},
    util::{ensure_dir, hash_file, now_rfc3339, sha256_hex},
};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "job-notifier")]
#[command(about = "Submit batch jobs through the Zowe CLI, mail their logs, record pass/fail")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./job-notifier.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the Zowe CLI runs and show the mail transport.
    Doctor {},
    /// Parse the input file and print the requests without running anything.
    Check {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Treat the first input row as a header.
        #[arg(long)]
        has_header: bool,
    },
    /// Process a single job and print its result.
    Submit {
        #[arg(long)]
        job: String,
        #[arg(long)]
        email: String,
    },
    /// Process every job in the input file and write the results.
    Run {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Treat the first input row as a header.
        #[arg(long)]
        has_header: bool,
        /// Exit with status 2 when any job failed.
        #[arg(long)]
        strict: bool,
    },
}

/// Returns the process exit code on success.
pub fn dispatch(args: Args) -> Result<i32> {
    let cfg = match resolve_config_path(args.config.as_deref())? {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg).map(|_| 0),
        Command::Check { input, has_header } => check(&cfg, input.as_deref(), *has_header).map(|_| 0),
        Command::Submit { job, email } => submit(&cfg, job, email).map(|_| 0),
        Command::Run {
            input,
            output,
            has_header,
            strict,
        } => run(&cfg, input.as_deref(), output.as_deref(), *has_header, *strict),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config not found: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    for candidate in ["job-notifier.toml", "job-notifier.example.toml"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Ok(Some(p));
        }
    }
    Ok(None)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from("logs").join("job-notifier.log"))
}

fn read_options(cfg: &Config, has_header: bool) -> ReadOptions {
    ReadOptions {
        has_header: has_header || cfg.input.has_header,
        // Config::validate guarantees ASCII.
        delimiter: cfg.input.delimiter as u8,
    }
}

fn doctor(cfg: &Config) -> Result<()> {
    let zowe = ZoweCli::new(cfg)?;
    let diag = zowe.doctor();
    let mailer = mail::from_config(cfg)?;
    if !diag.ok {
        warn!("zowe CLI check failed: {}", diag.error.as_deref().unwrap_or("unknown"));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "zowe": diag,
            "connection": {
                "host": cfg.connection.host,
                "port": cfg.connection.port,
                "user": cfg.connection.user,
                "password_set": !cfg.connection.password.is_empty(),
            },
            "mail": mailer.describe(),
        }))?
    );
    Ok(())
}

fn check(cfg: &Config, input: Option<&Path>, has_header: bool) -> Result<()> {
    let input = input
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.input.path));
    let requests = table::read_requests(&input, read_options(cfg, has_header))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "input": input,
            "jobs": requests.len(),
            "requests": requests,
        }))?
    );
    Ok(())
}

fn submit(cfg: &Config, job: &str, email: &str) -> Result<()> {
    let notifier = Notifier::new(cfg, ZoweCli::new(cfg)?, mail::from_config(cfg)?);
    let result = notifier.process(&JobRequest::new(job, email));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run(
    cfg: &Config,
    input: Option<&Path>,
    output: Option<&Path>,
    has_header: bool,
    strict: bool,
) -> Result<i32> {
    let input = input
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.input.path));
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.path));

    let requests = table::read_requests(&input, read_options(cfg, has_header))?;

    let cfg_hash = sha256_hex(cfg.normalized_for_hash().as_bytes());
    let input_hash = hash_file(&input).with_context(|| format!("hashing input: {}", input.display()))?;
    let run_id = sha256_hex(format!("{}:{}", cfg_hash, input_hash).as_bytes());

    let zowe = ZoweCli::new(cfg)?;
    let mailer = mail::from_config(cfg)?;
    info!(
        "run_id={run_id} jobs={} input={} output={} mail={}",
        requests.len(),
        input.display(),
        output.display(),
        mailer.describe()
    );

    let notifier = Notifier::new(cfg, zowe, mailer);
    let started = now_rfc3339();
    let results = notifier.run(&requests);

    table::write_results_file(&output, &results, cfg.output.write_header)?;
    let totals = RunTotals::tally(&results);
    info!("wrote {} rows to {}", results.len(), output.display());

    if cfg.output.write_report_json {
        let report = RunReport {
            run_id: run_id.clone(),
            started,
            finished: now_rfc3339(),
            input: input.display().to_string(),
            output: output.display().to_string(),
            totals,
            results,
        };
        let path = PathBuf::from(&cfg.output.report_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
    }

    if cfg.global.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "run_id": run_id,
                "output": output,
                "totals": totals,
            }))?
        );
    }

    if (strict || cfg.global.strict_exit) && totals.failed > 0 {
        warn!("{} of {} jobs failed", totals.failed, totals.jobs);
        return Ok(2);
    }
    Ok(0)
}
