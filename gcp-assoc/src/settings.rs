use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable run configuration, populated once before the pipeline starts
/// and passed by reference into the components that need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory the per-GCP result files are written to, relative to the
    /// dataset root.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Emit compact alternation patterns instead of literal image lists.
    #[serde(default = "default_pattern_output")]
    pub pattern_output: bool,
    /// Base path the external tools are resolved beneath.
    #[serde(default = "default_tool_path")]
    pub tool_path: PathBuf,
    /// Kill an external tool that runs longer than this many seconds. A
    /// timed-out tool only costs the affected image, not the run.
    #[serde(default)]
    pub tool_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn timeout(&self) -> Option<Duration> {
        self.tool_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pattern_output: default_pattern_output(),
            tool_path: default_tool_path(),
            tool_timeout_secs: None,
        }
    }
}

fn default_output_dir() -> String {
    "GCP-IMG".to_string()
}

fn default_pattern_output() -> bool {
    true
}

fn default_tool_path() -> PathBuf {
    PathBuf::from(".")
}
