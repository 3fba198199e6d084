//! Command-line construction for the download tool.
//!
//! Arguments are kept as a vector and handed to the OS as-is; nothing goes
//! through a shell.

use std::fmt;

/// Format selector for video downloads: best mp4 video plus m4a audio,
/// falling back to the best single mp4, then to anything.
pub const VIDEO_FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Format selector for audio extraction.
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio";

/// `--audio-quality` value; 0 is the best VBR quality.
pub const AUDIO_QUALITY: &str = "0";

const REDACTED: &str = "********";

/// Account credentials passed to the tool.
///
/// They end up as plain process arguments and are therefore visible in the
/// host's process listing. They are masked in logs and `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    /// Video with audio, merged into mp4 when possible.
    Video,
    /// Audio only, converted to `format` (e.g. `"mp3"`, `"m4a"`).
    Audio { format: String },
}

/// A single download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: MediaKind,
    /// Resolve everything but do not download.
    pub simulate: bool,
}

impl DownloadRequest {
    pub fn video(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Video,
            simulate: false,
        }
    }

    pub fn audio(url: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: MediaKind::Audio {
                format: format.into(),
            },
            simulate: false,
        }
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Build the argument vector:
    /// `[--username U --password P] --format SEL [--audio-format F --audio-quality 0 --extract-audio] [--simulate] [extra..] URL`
    pub fn build_args(&self, credentials: Option<&Credentials>, extra_args: &[String]) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(creds) = credentials.filter(|c| !c.username.is_empty()) {
            args.extend([
                "--username".to_string(),
                creds.username.clone(),
                "--password".to_string(),
                creds.password.clone(),
            ]);
        }

        match &self.kind {
            MediaKind::Video => {
                args.extend(["--format".to_string(), VIDEO_FORMAT_SELECTOR.to_string()]);
            }
            MediaKind::Audio { format } => {
                args.extend([
                    "--format".to_string(),
                    AUDIO_FORMAT_SELECTOR.to_string(),
                    "--audio-format".to_string(),
                    format.clone(),
                    "--audio-quality".to_string(),
                    AUDIO_QUALITY.to_string(),
                    "--extract-audio".to_string(),
                ]);
            }
        }

        if self.simulate {
            args.push("--simulate".to_string());
        }

        args.extend(extra_args.iter().cloned());
        args.push(self.url.clone());
        args
    }
}

/// A fully-formed command: program plus argument vector.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments with the value following `--password` masked.
    pub fn redacted_args(&self) -> Vec<&str> {
        let mut hide_next = false;
        self.args
            .iter()
            .map(|arg| {
                let shown = if hide_next { REDACTED } else { arg.as_str() };
                hide_next = arg == "--password";
                shown
            })
            .collect()
    }
}

impl fmt::Display for CommandLine {
    /// Space-joined, password masked. For logs only, not for a shell.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.redacted_args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("program", &self.program)
            .field("args", &self.redacted_args())
            .finish()
    }
}
