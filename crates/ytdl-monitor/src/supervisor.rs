//! Process supervision.
//!
//! The supervising task waits for the process to exit while a separate task
//! drains its stdout through the output monitor. Draining and waiting must
//! never share one sequential flow: a process blocked on a full pipe never
//! exits.

use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::command::CommandLine;
use crate::error::{Error, ExecutionError, Result};
use crate::event::DownloadEvent;
use crate::monitor::{MonitorSummary, monitor_output};

/// How long the monitor may keep reading after the process has exited.
///
/// A descendant that inherited stdout keeps the pipe open past the exit of
/// the process we started.
const MONITOR_JOIN_GRACE: Duration = Duration::from_secs(2);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Create a `tokio::process::Command` that does not pop up a console window
/// on Windows.
pub(crate) fn tokio_command(program: impl AsRef<OsStr>) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.as_std_mut().creation_flags(CREATE_NO_WINDOW);
    }
    cmd
}

/// Where the process's stdout goes.
#[derive(Debug)]
pub enum OutputSink {
    /// Parse it and deliver events on the channel. Failures are mirrored as
    /// [`DownloadEvent::Failed`].
    Events(mpsc::Sender<DownloadEvent>),
    /// Pass it through to our own stdout/stderr, unparsed.
    Echo,
    /// Drop it.
    Discard,
}

/// Runs one command to completion.
#[derive(Debug)]
pub struct ProcessSupervisor {
    command: CommandLine,
    cancellation_token: CancellationToken,
}

impl ProcessSupervisor {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Use `token` to abort the run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    /// Start the process and wait for it to exit.
    ///
    /// With [`OutputSink::Events`], the output monitor is started before
    /// waiting and joined after the exit, so every event it produces is on
    /// the channel before this returns. The join is bounded: if stdout is
    /// still open a short grace period after the exit, the monitor is
    /// aborted. A failed exit is both sent as
    /// [`DownloadEvent::Failed`] and returned.
    ///
    /// Cancelling the token kills the process, aborts the monitor and
    /// returns [`Error::Cancelled`] without emitting an event.
    pub async fn run(self, sink: OutputSink) -> Result<()> {
        let program = self.command.program.clone();
        info!("Starting {}", self.command);

        let (stdout, stderr) = match &sink {
            OutputSink::Events(_) => (Stdio::piped(), Stdio::piped()),
            OutputSink::Echo => (Stdio::inherit(), Stdio::inherit()),
            OutputSink::Discard => (Stdio::null(), Stdio::piped()),
        };

        let mut child = tokio_command(&program)
            .args(&self.command.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| Error::Launch {
                program: program.clone(),
                source,
            })?;

        let monitor = match &sink {
            OutputSink::Events(events) => {
                let Some(stdout) = child.stdout.take() else {
                    let _ = child.kill().await;
                    return Err(Error::StdoutUnavailable { program });
                };
                Some(tokio::spawn(monitor_output(stdout, events.clone())))
            }
            OutputSink::Echo | OutputSink::Discard => None,
        };

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, program.clone()));
        }

        let status = tokio::select! {
            _ = self.cancellation_token.cancelled() => {
                info!("Cancelling {}", program);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", program, e);
                }
                if let Some(monitor) = monitor {
                    monitor.abort();
                }
                return Err(Error::Cancelled);
            }
            status = child.wait() => status,
        };

        if let Some(monitor) = monitor {
            join_monitor(monitor, &self.cancellation_token).await?;
        }

        let failure = match status {
            Ok(status) if status.success() => {
                debug!("{} finished successfully", program);
                return Ok(());
            }
            Ok(status) => {
                warn!("{} exited with status: {}", program, status);
                ExecutionError::Exited { program, status }
            }
            Err(e) => {
                error!("Error waiting for {}: {}", program, e);
                ExecutionError::Wait {
                    program,
                    source: Arc::new(e),
                }
            }
        };

        if let OutputSink::Events(events) = &sink {
            let _ = events.send(DownloadEvent::Failed(failure.clone())).await;
        }

        Err(failure.into())
    }
}

/// Wait for the monitor to reach end-of-stream, unless cancelled first or
/// the grace period runs out.
async fn join_monitor(
    mut monitor: JoinHandle<MonitorSummary>,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    tokio::select! {
        _ = cancellation_token.cancelled() => {
            monitor.abort();
            Err(Error::Cancelled)
        }
        joined = tokio::time::timeout(MONITOR_JOIN_GRACE, &mut monitor) => {
            match joined {
                Ok(summary) => {
                    let summary = summary?;
                    debug!("Monitor joined after {} events", summary.events);
                }
                Err(_) => {
                    monitor.abort();
                    debug!(
                        "Output still open {:?} after exit, monitor aborted",
                        MONITOR_JOIN_GRACE
                    );
                }
            }
            Ok(())
        }
    }
}

/// Forward the tool's stderr to the log, line by line.
async fn forward_stderr(stderr: ChildStderr, program: String) {
    let mut lines = BufReader::new(stderr).split(b'\n');
    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if !line.is_empty() {
                    warn!("{}: {}", program, line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Error reading {} stderr: {}", program, e);
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shell(script: &str) -> CommandLine {
        CommandLine::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    async fn run_with_events(script: &str, capacity: usize) -> (Result<()>, Vec<DownloadEvent>) {
        let (tx, mut rx) = mpsc::channel(capacity);
        let run = tokio::spawn(ProcessSupervisor::new(shell(script)).run(OutputSink::Events(tx)));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (run.await.unwrap(), events)
    }

    #[tokio::test]
    async fn test_successful_run_delivers_events() {
        let script = r"printf '[download] Destination: a.mp4\n\r'
printf '[download]  50.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\r'
printf '[download] 100.0%% of 1.00MiB at 1.00MiB/s ETA 00:00\r'";
        let (result, events) = run_with_events(script, 8).await;

        assert!(result.is_ok());
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], DownloadEvent::Destination(name) if name == "a.mp4"));
        assert_eq!(events[1].as_progress().unwrap().progress(), "50.0%");
        assert_eq!(events[2].as_progress().unwrap().progress(), "100.0%");
    }

    #[tokio::test]
    async fn test_failure_is_returned_and_sent_last() {
        let script = r"printf '[download] Destination: a.mp4\n\r'
printf '[download]  10.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\r'
exit 3";
        let (result, events) = run_with_events(script, 8).await;

        let err = result.unwrap_err();
        assert!(err.is_execution());
        assert_eq!(err.as_execution().and_then(ExecutionError::code), Some(3));

        assert_eq!(events.iter().filter(|e| e.is_failure()).count(), 1);
        match events.last() {
            Some(DownloadEvent::Failed(failure)) => assert_eq!(failure.code(), Some(3)),
            other => panic!("expected failure last, got {other:?}"),
        }
        assert!(events[1].as_progress().is_some());
    }

    #[tokio::test]
    async fn test_background_grandchild_does_not_delay_failure() {
        let script = r"sleep 30 &
printf '[download] Destination: a.mp4\n\r'
exit 1";
        let (result, events) = tokio::time::timeout(Duration::from_secs(10), run_with_events(script, 8))
            .await
            .expect("run stayed blocked on the inherited stdout pipe");

        let err = result.unwrap_err();
        assert!(err.is_execution());
        assert_eq!(err.as_execution().and_then(ExecutionError::code), Some(1));

        assert!(matches!(&events[0], DownloadEvent::Destination(name) if name == "a.mp4"));
        match events.last() {
            Some(DownloadEvent::Failed(failure)) => assert_eq!(failure.code(), Some(1)),
            other => panic!("expected failure last, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_killed_by_signal_is_execution_error() {
        let (result, events) = run_with_events("kill -9 $$", 8).await;

        let err = result.unwrap_err();
        assert!(err.is_execution());
        assert_eq!(err.as_execution().and_then(ExecutionError::code), None);
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_launch_error_sends_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let command = CommandLine::new("/nonexistent/ytdl-monitor-test-binary", Vec::new());
        let err = ProcessSupervisor::new(command)
            .run(OutputSink::Events(tx))
            .await
            .unwrap_err();

        assert!(err.is_launch());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_slow_consumer_gets_every_event_in_order() {
        let script = r"i=1
while [ $i -le 40 ]; do
  printf '[download] %d.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\r' $i
  i=$((i+1))
done";
        let (tx, mut rx) = mpsc::channel(1);
        let run = tokio::spawn(ProcessSupervisor::new(shell(script)).run(OutputSink::Events(tx)));

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            tokio::time::sleep(Duration::from_millis(1)).await;
            if let Some(p) = event.as_progress() {
                seen.push(p.percent().unwrap() as u32);
            }
        }

        assert!(run.await.unwrap().is_ok());
        // The first token is consumed by the destination check.
        assert_eq!(seen, (2..=40).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_noisy_stderr_does_not_stall() {
        let script = "i=0; while [ $i -lt 5000 ]; do echo 'WARNING: noise' >&2; i=$((i+1)); done";
        let result = tokio::time::timeout(
            Duration::from_secs(30),
            ProcessSupervisor::new(shell(script)).run(OutputSink::Discard),
        )
        .await
        .expect("supervisor stalled");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_discard_mode_reports_exit_status() {
        let result = ProcessSupervisor::new(shell("exit 2"))
            .run(OutputSink::Discard)
            .await;
        assert_eq!(
            result.unwrap_err().as_execution().and_then(ExecutionError::code),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_cancellation_kills_process() {
        let token = CancellationToken::new();
        let (tx, _rx) = mpsc::channel(8);
        let supervisor = ProcessSupervisor::new(shell("exec sleep 30")).with_cancellation(token.clone());

        let run = tokio::spawn(supervisor.run(OutputSink::Events(tx)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("cancellation did not stop the run")
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
