use std::path::Path;

use anyhow::Context;

use crate::config::Config;
use crate::remote::{LogSource, SshLogSource};

/// Print the raw join/leave lines found on the server.
pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let source = SshLogSource::new(config.ssh()?.clone());

    eprintln!("mc-playtime: connecting to {}", source.describe());
    let output = source.fetch().context("failed to fetch server logs")?;

    if output.trim().is_empty() {
        eprintln!("mc-playtime: no join/leave lines found");
        return Ok(());
    }

    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }

    eprintln!("mc-playtime: fetched {} line(s)", output.lines().count());
    Ok(())
}
