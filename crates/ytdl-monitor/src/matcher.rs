//! Pattern matching over youtube-dl output tokens.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::event::{DownloadEvent, DownloadProgress};

/// `[download] Destination: <file>` followed by a newline.
static DESTINATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[download\] Destination: (.*)\n").unwrap());

/// `[download]  45.2% of 10.5MiB at 1.2MiB/s ETA 00:12`
static PROGRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[download\]\s+(.*)\s+of\s+(.*)\s+at\s+(.*)\s+ETA\s+(.*)").unwrap()
});

/// Which pattern the next token is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    /// Nothing consumed yet; the first token may announce the destination.
    #[default]
    AwaitingDestination,
    /// Every further token is a candidate progress line.
    TrackingProgress,
}

/// Destination filename announced in `token`, if any.
pub fn match_destination(token: &str) -> Option<&str> {
    DESTINATION_REGEX
        .captures(token)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Progress report carried by `token`, if any.
///
/// Lines where one of the four fields is empty are not progress lines.
pub fn match_progress(token: &str) -> Option<DownloadProgress> {
    let caps = PROGRESS_REGEX.captures(token)?;
    let field = |i| caps.get(i).map_or("", |m| m.as_str());
    DownloadProgress::new(field(1), field(2), field(3), field(4))
}

/// Two-phase matcher: the first token is checked for the destination
/// announcement, every later token for progress. The phase advances after
/// the first token whether or not it matched, so at most one destination
/// is ever reported.
#[derive(Debug, Clone, Default)]
pub struct ProgressMatcher {
    phase: MatchPhase,
}

impl ProgressMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Consume one token. Returns the event it produces, or `None` if the
    /// token is not recognised.
    pub fn feed(&mut self, token: &str) -> Option<DownloadEvent> {
        match self.phase {
            MatchPhase::AwaitingDestination => {
                self.phase = MatchPhase::TrackingProgress;
                match match_destination(token) {
                    Some(name) => Some(DownloadEvent::Destination(name.to_string())),
                    None => {
                        debug!("No destination announced, tracking progress only");
                        None
                    }
                }
            }
            MatchPhase::TrackingProgress => match_progress(token).map(DownloadEvent::Progress),
        }
    }
}
