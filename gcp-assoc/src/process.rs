//! Minimal synchronous runner for the external tools.
//!
//! The tools are opaque: their stdout is streamed line by line to a callback
//! in emission order while the caller blocks until the process exits. stderr
//! is inherited so tool diagnostics reach the terminal untouched. Exit
//! status is reported but never interpreted here; callers decide what a
//! failed invocation means (for the projection solver, the absence of its
//! output file is the real signal).

use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Failure to run an external program to completion.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{program}: not found")]
    NotFound { program: String },
    #[error("cannot run {program}: {source}")]
    Spawn { program: String, source: io::Error },
    #[error("{program}: no exit within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Runs `program` with `args`, feeding each stdout line to `on_line`.
///
/// Blocks until the child exits. With a timeout, a child that outlives it is
/// killed and `InvokeError::Timeout` returned; the pipeline treats that as a
/// recoverable per-image failure.
pub fn invoke<F>(
    program: &Path,
    args: &[String],
    timeout: Option<Duration>,
    mut on_line: F,
) -> std::result::Result<ExitStatus, InvokeError>
where
    F: FnMut(&str),
{
    let program_name = program.display().to_string();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => InvokeError::NotFound {
                program: program_name.clone(),
            },
            _ => InvokeError::Spawn {
                program: program_name.clone(),
                source,
            },
        })?;

    // A separate reader keeps the pipe drained while this thread watches the
    // child, so a chatty tool cannot deadlock on a full pipe and a hung tool
    // can still be killed on time.
    let stdout = child.stdout.take();
    let (sender, receiver) = mpsc::channel();
    let reader = thread::spawn(move || {
        if let Some(stdout) = stdout {
            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => break,
                };
                if sender.send(line).is_err() {
                    break;
                }
            }
        }
    });

    let deadline = timeout.map(|limit| Instant::now() + limit);
    let status = loop {
        while let Ok(line) = receiver.try_recv() {
            on_line(&line);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                return Err(InvokeError::Spawn {
                    program: program_name,
                    source,
                });
            }
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                let _ = reader.join();
                return Err(InvokeError::Timeout {
                    program: program_name,
                    timeout: timeout.unwrap_or_default(),
                });
            }
        }
        thread::sleep(POLL_INTERVAL);
    };

    // The child exited; drain whatever the reader still holds.
    for line in receiver {
        on_line(&line);
    }
    let _ = reader.join();
    Ok(status)
}
