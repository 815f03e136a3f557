use std::io::{self, BufRead};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::info;

use super::types::{CancelToken, CommandSpec, ExecResult, OutputLine};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Run a command to completion, forwarding each output line to the log as
/// it arrives.
///
/// The child is killed if `cancel` fires before it exits; the result then
/// carries `cancelled = true` and `success = false`.
pub fn stream(cmd: &CommandSpec, cancel: &CancelToken) -> io::Result<ExecResult> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &cmd.cwd {
        command.current_dir(dir);
    }
    let mut child = command.spawn()?;

    let (tx, rx) = mpsc::channel();
    let readers = spawn_readers(&mut child, tx);

    // --- poll loop ---------------------------------------------------------
    let mut cancelled = false;
    let exit_status = loop {
        drain(&rx, &cmd.program);

        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {}
            Err(_) => break None,
        }

        if cancel.is_cancelled() {
            cancelled = true;
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }

        std::thread::sleep(POLL_INTERVAL);
    };

    // --- finalize ----------------------------------------------------------
    for handle in readers {
        let _ = handle.join();
    }
    drain(&rx, &cmd.program);

    let exit_code = exit_status.and_then(|s| s.code());
    Ok(ExecResult {
        success: !cancelled && exit_code == Some(0),
        exit_code,
        cancelled,
    })
}

/// Sleep for `duration` in poll-sized slices. Returns `false` as soon as
/// `cancel` fires, `true` if the full delay elapsed.
pub fn pause(duration: Duration, cancel: &CancelToken) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        std::thread::sleep(left.min(POLL_INTERVAL));
    }
}

fn spawn_readers(child: &mut Child, tx: Sender<OutputLine>) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        let tx_out = tx.clone();
        handles.push(std::thread::spawn(move || {
            for line in io::BufReader::new(stdout).lines() {
                match line {
                    // Receiver may be gone during shutdown; ignore send errors.
                    Ok(l) => {
                        let _ = tx_out.send(OutputLine::Stdout(l));
                    }
                    Err(_) => break,
                }
            }
        }));
    }

    if let Some(stderr) = child.stderr.take() {
        handles.push(std::thread::spawn(move || {
            for line in io::BufReader::new(stderr).lines() {
                match line {
                    Ok(l) => {
                        let _ = tx.send(OutputLine::Stderr(l));
                    }
                    Err(_) => break,
                }
            }
        }));
    }

    handles
}

fn drain(rx: &Receiver<OutputLine>, program: &str) {
    while let Ok(line) = rx.try_recv() {
        match line {
            OutputLine::Stdout(l) => info!(target: "jetkit::output", "[{program}] {l}"),
            OutputLine::Stderr(l) => info!(target: "jetkit::output", "[{program}!] {l}"),
        }
    }
}
