use serde::{Deserialize, Serialize};

/// youtube-dl client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeDlConfig {
    /// Path to the youtube-dl (or compatible) binary
    #[serde(default = "default_binary_path")]
    pub binary_path: String,
    /// Capacity of the event channel created by `YoutubeDl::spawn`
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Show the tool's raw output when simulating
    #[serde(default = "default_true")]
    pub echo_simulate_output: bool,
    /// Additional arguments, inserted before the URL
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_binary_path() -> String {
    "youtube-dl".to_string()
}

fn default_channel_capacity() -> usize {
    64
}

fn default_true() -> bool {
    true
}

impl Default for YoutubeDlConfig {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
            channel_capacity: default_channel_capacity(),
            echo_simulate_output: true,
            extra_args: Vec::new(),
        }
    }
}
