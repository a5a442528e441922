pub mod ssh;

use std::io::Read;
use std::path::PathBuf;

pub use ssh::SshLogSource;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("ssh {stage} failed: {source}")]
    Ssh {
        stage: &'static str,
        #[source]
        source: ssh2::Error,
    },
    #[error("ssh authentication rejected for user {0}")]
    Auth(String),
    #[error("remote command reported errors: {0}")]
    RemoteStderr(String),
    #[error("failed to read log text: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can hand back the raw join/leave log lines.
pub trait LogSource {
    /// Short human-readable origin, used in progress output.
    fn describe(&self) -> String;

    /// Progress line shown before [`LogSource::fetch`] runs.
    fn progress(&self) -> String;

    fn fetch(&self) -> Result<String, FetchError>;
}

/// Already-fetched log text on local disk, or stdin for `-`.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    path: PathBuf,
}

impl FileLogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_stdin(&self) -> bool {
        self.path.as_os_str() == "-"
    }
}

impl LogSource for FileLogSource {
    fn describe(&self) -> String {
        if self.is_stdin() {
            "stdin".to_string()
        } else {
            self.path.display().to_string()
        }
    }

    fn progress(&self) -> String {
        format!("Reading player join/leave events from {}...", self.describe())
    }

    fn fetch(&self) -> Result<String, FetchError> {
        if self.is_stdin() {
            let mut s = String::new();
            std::io::stdin().read_to_string(&mut s)?;
            Ok(s)
        } else {
            Ok(std::fs::read_to_string(&self.path)?)
        }
    }
}
