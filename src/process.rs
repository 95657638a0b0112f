use anyhow::{anyhow, Context, Result};
use std::io::{Read, Write};
use std::process::{Child, Command, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Captured result of a finished child process.
#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for CmdOutput {
    fn from(out: Output) -> Self {
        Self {
            success: out.status.success(),
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}

impl CmdOutput {
    /// First non-empty line of stderr, falling back to stdout, for error messages.
    pub fn summary(&self) -> String {
        let pick = |s: &str| {
            s.lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        };
        pick(&self.stderr)
            .or_else(|| pick(&self.stdout))
            .unwrap_or_else(|| format!("exit code {:?}", self.code))
    }
}

/// Runs `cmd` to completion, feeding `stdin` if given.
///
/// A non-zero exit is not an error here; callers inspect `success`. Spawn
/// failures and timeouts are.
pub fn run(cmd: &mut Command, stdin: Option<&[u8]>, timeout: Option<Duration>) -> Result<CmdOutput> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    debug!("spawn {} timeout={:?}", program, timeout);

    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning {program}"))?;

    // Write from a separate thread so a child that talks before it finishes
    // reading can't deadlock against us.
    let writer = stdin.map(|bytes| {
        let pipe = child.stdin.take();
        let bytes = bytes.to_vec();
        std::thread::spawn(move || -> Result<()> {
            if let Some(mut pipe) = pipe {
                pipe.write_all(&bytes).with_context(|| "write stdin")?;
                pipe.flush().ok();
            }
            Ok(())
        })
    });

    let output = match timeout {
        Some(limit) if !limit.is_zero() => wait_with_timeout(&mut child, limit, &program)?,
        _ => child
            .wait_with_output()
            .with_context(|| format!("waiting for {program}"))?,
    };

    // A writer still blocked on a pipe held open by a grandchild is left behind.
    if let Some(writer) = writer.filter(|w| w.is_finished()) {
        match writer.join() {
            Ok(Ok(())) => {}
            // The child may exit without draining stdin; that's its call.
            Ok(Err(e)) => debug!("{program}: {e:#}"),
            Err(_) => return Err(anyhow!("stdin writer thread panicked")),
        }
    }

    Ok(output.into())
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, program: &str) -> Result<Output> {
    // Drain pipes while waiting so a chatty child can't block on a full buffer.
    let stdout = Drain::start(child.stdout.take(), "stdout");
    let stderr = Drain::start(child.stderr.take(), "stderr");

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            // A grandchild can inherit the pipes and keep them open after the
            // child exits, so collection is bounded by the same deadline.
            let deadline = (start + timeout).max(Instant::now() + COLLECT_GRACE);
            return Ok(Output {
                status,
                stdout: stdout.collect(deadline, program),
                stderr: stderr.collect(deadline, program),
            });
        }

        if start.elapsed() > timeout {
            warn!("{} timed out after {:?}", program, timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let deadline = Instant::now() + COLLECT_GRACE;
            let stderr = stderr.collect(deadline, program);
            drop(stdout);
            return Err(anyhow!(
                "{} exceeded timeout ({:?}); stderr: {}",
                program,
                timeout,
                String::from_utf8_lossy(&stderr).trim()
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

const COLLECT_GRACE: Duration = Duration::from_millis(200);

/// A pipe being read on its own thread into a shared buffer.
///
/// The reader is never joined: if something else still holds the write end,
/// `collect` returns what has arrived so far and the thread is left to finish
/// on its own.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
    name: &'static str,
}

impl Drain {
    fn start<R: Read + Send + 'static>(reader: Option<R>, name: &'static str) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();
        let sink = Arc::clone(&buf);
        std::thread::spawn(move || {
            if let Some(mut r) = reader {
                let mut chunk = [0u8; 8192];
                loop {
                    match r.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => lock(&sink).extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            debug!("read {name}: {e}");
                            break;
                        }
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { buf, done, name }
    }

    fn collect(self, deadline: Instant, program: &str) -> Vec<u8> {
        let wait = deadline.saturating_duration_since(Instant::now());
        if let Err(RecvTimeoutError::Timeout) = self.done.recv_timeout(wait) {
            debug!("{program}: {} still open, keeping partial output", self.name);
        }
        std::mem::take(&mut *lock(&self.buf))
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
