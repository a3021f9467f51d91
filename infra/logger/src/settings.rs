use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

const DEFAULT_MAX_FILES: usize = 10;

/// Logging section of a service configuration.
///
/// ```toml
/// [log]
/// level = "info"
/// filter = "dynconf=debug,hyper=warn"
/// format = "compact"
///
/// [log.file]
/// path = "logs"
/// rotation = "daily"
/// max_files = 7
/// json = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default level for targets not matched by `filter`.
    pub level: String,
    /// Extra directives in `EnvFilter` syntax. `RUST_LOG` is used when unset.
    pub filter: Option<String>,
    pub console: bool,
    pub format: ConsoleFormat,
    pub file: Option<FileSettings>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            console: true,
            format: ConsoleFormat::default(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// Rolling file output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub rotation: RotationKind,
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default)]
    pub json: bool,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), rotation: RotationKind::default(), max_files: DEFAULT_MAX_FILES, json: false }
    }
}

const fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationKind {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<RotationKind> for Rotation {
    fn from(kind: RotationKind) -> Self {
        match kind {
            RotationKind::Minutely => Self::MINUTELY,
            RotationKind::Hourly => Self::HOURLY,
            RotationKind::Daily => Self::DAILY,
            RotationKind::Never => Self::NEVER,
        }
    }
}
