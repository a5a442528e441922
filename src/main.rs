mod analysis;
mod cli;
mod config;
mod events;
mod logging;
mod remote;
mod report;
mod sessions;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mc-playtime",
    version,
    about = "Minecraft player session statistics and timelines from server logs"
)]
struct Cli {
    /// Config file (default: $MC_PLAYTIME_CONFIG or ./mc-playtime.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch logs, print per-player statistics and render a session timeline
    Analyze(cli::analyze::AnalyzeArgs),
    /// Print the raw join/leave lines found on the server
    Fetch,
    /// Write a config template
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Analyze(args) => cli::analyze::run(config, args)?,
        Commands::Fetch => cli::fetch::run(config)?,
        Commands::Init { force } => cli::init::run(config, force)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_analyze_flags_parse() {
        let cli = Cli::try_parse_from([
            "mc-playtime",
            "analyze",
            "--start-date",
            "2025-03-23",
            "--end-date",
            "2025-03-25",
            "--input",
            "-",
            "--format",
            "json",
            "--no-chart",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.start_date, chrono::NaiveDate::from_ymd_opt(2025, 3, 23));
                assert_eq!(args.end_date, chrono::NaiveDate::from_ymd_opt(2025, 3, 25));
                assert_eq!(args.input, Some(PathBuf::from("-")));
                assert_eq!(args.format, cli::OutputFormat::Json);
                assert!(args.no_chart);
                assert!(!args.open_until_now);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_bad_date_flag_is_rejected() {
        assert!(Cli::try_parse_from(["mc-playtime", "analyze", "--start-date", "23/03/2025"]).is_err());
    }
}
