pub mod analyze;
pub mod fetch;
pub mod init;

use clap::ValueEnum;

/// How the statistics report is printed.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Fixed-width table with progress lines
    #[default]
    Text,
    /// JSON array on stdout, nothing else
    Json,
}
