use anyhow::Result;
use clap::Parser;
use job_notifier::cli;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    match cli::dispatch(args) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            if tracing::dispatcher::has_been_set() {
                error!("{:#}", err);
            } else {
                eprintln!("error: {:#}", err);
            }
            std::process::exit(1);
        }
    }
    Ok(())
}
