use crate::job::{JobRequest, JobResult};
use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};
use std::path::Path;

/// Header written above the result rows.
pub const OUTPUT_HEADER: [&str; 4] = ["JCL Name", "Output Code", "JCL Pass/Fail", "Email Sent"];

#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub has_header: bool,
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            has_header: false,
            delimiter: b',',
        }
    }
}

pub fn read_requests(path: &Path, opts: ReadOptions) -> Result<Vec<JobRequest>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening input: {}", path.display()))?;
    parse_requests(file, opts).with_context(|| format!("reading input: {}", path.display()))
}

/// Rows need a job name and an address; anything else is rejected with its line
/// number rather than silently dropped.
pub fn parse_requests<R: Read>(reader: R, opts: ReadOptions) -> Result<Vec<JobRequest>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(opts.has_header)
        .delimiter(opts.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }
        let job_name = record.get(0).unwrap_or_default();
        let email = record.get(1).unwrap_or_default();
        if job_name.is_empty() {
            return Err(anyhow!("line {line}: missing job name"));
        }
        if record.len() < 2 {
            return Err(anyhow!("line {line}: missing email address for {job_name}"));
        }
        out.push(JobRequest::new(job_name, email));
    }
    Ok(out)
}

pub fn write_results<W: Write>(writer: W, results: &[JobResult], write_header: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if write_header {
        wtr.write_record(OUTPUT_HEADER)?;
    }
    for r in results {
        wtr.write_record(r.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes next to `path` and renames into place.
pub fn write_results_file(path: &Path, results: &[JobResult], write_header: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        crate::util::ensure_dir(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    let file = std::fs::File::create(&tmp)
        .with_context(|| format!("create output: {}", tmp.display()))?;
    write_results(file, results, write_header)
        .with_context(|| format!("writing output: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
