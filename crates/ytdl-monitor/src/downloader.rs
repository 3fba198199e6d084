//! youtube-dl client.

use std::process::Stdio;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::command::{CommandLine, Credentials, DownloadRequest};
use crate::config::YoutubeDlConfig;
use crate::error::Result;
use crate::event::DownloadEvent;
use crate::session::DownloadSession;
use crate::supervisor::{OutputSink, ProcessSupervisor, tokio_command};

/// Client for a youtube-dl compatible binary.
#[derive(Debug, Clone, Default)]
pub struct YoutubeDl {
    config: YoutubeDlConfig,
    credentials: Option<Credentials>,
}

impl YoutubeDl {
    /// Create a client with the default configuration and no account.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: YoutubeDlConfig) -> Self {
        Self {
            config,
            credentials: None,
        }
    }

    /// Log in with the given account. An empty username means no account.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn config(&self) -> &YoutubeDlConfig {
        &self.config
    }

    /// The command line that `request` runs.
    pub fn command_line(&self, request: &DownloadRequest) -> CommandLine {
        let args = request.build_args(self.credentials.as_ref(), &self.config.extra_args);
        CommandLine::new(self.config.binary_path.clone(), args)
    }

    /// Download a video, reporting progress on `events`.
    pub async fn download(&self, url: &str, events: mpsc::Sender<DownloadEvent>) -> Result<()> {
        self.run(
            &DownloadRequest::video(url),
            OutputSink::Events(events),
            CancellationToken::new(),
        )
        .await
    }

    /// Resolve a video download without fetching anything.
    pub async fn download_simulate(&self, url: &str) -> Result<()> {
        let request = DownloadRequest::video(url).with_simulate(true);
        self.run(&request, self.simulate_sink(), CancellationToken::new())
            .await
    }

    /// Download and extract the audio track as `format`, reporting progress on `events`.
    pub async fn download_audio(
        &self,
        url: &str,
        format: &str,
        events: mpsc::Sender<DownloadEvent>,
    ) -> Result<()> {
        self.run(
            &DownloadRequest::audio(url, format),
            OutputSink::Events(events),
            CancellationToken::new(),
        )
        .await
    }

    pub async fn download_audio_simulate(&self, url: &str, format: &str) -> Result<()> {
        let request = DownloadRequest::audio(url, format).with_simulate(true);
        self.run(&request, self.simulate_sink(), CancellationToken::new())
            .await
    }

    /// Run `request` to completion.
    pub async fn run(
        &self,
        request: &DownloadRequest,
        sink: OutputSink,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        ProcessSupervisor::new(self.command_line(request))
            .with_cancellation(cancellation_token)
            .run(sink)
            .await
    }

    /// Start `request` in the background and return its session.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(&self, request: DownloadRequest) -> DownloadSession {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let cancellation_token = CancellationToken::new();

        let supervisor = ProcessSupervisor::new(self.command_line(&request))
            .with_cancellation(cancellation_token.clone());
        let task = tokio::spawn(supervisor.run(OutputSink::Events(tx)));

        DownloadSession::new(rx, cancellation_token, task)
    }

    /// First line of `<binary> --version`, or `None` if the binary cannot be run.
    pub async fn version(&self) -> Option<String> {
        let output = tokio_command(&self.config.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .inspect_err(|e| debug!("Failed to run {}: {}", self.config.binary_path, e))
            .ok()?;

        if !output.status.success() {
            return None;
        }

        String::from_utf8(output.stdout)
            .ok()
            .and_then(|s| s.lines().next().map(|l| l.trim().to_string()))
            .filter(|l| !l.is_empty())
    }

    pub async fn is_available(&self) -> bool {
        self.version().await.is_some()
    }

    fn simulate_sink(&self) -> OutputSink {
        if self.config.echo_simulate_output {
            OutputSink::Echo
        } else {
            OutputSink::Discard
        }
    }
}
