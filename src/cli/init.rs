use std::path::Path;

use crate::config::{self, TEMPLATE};

pub fn run(config_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = config::resolve_path(config_path, std::env::var(config::CONFIG_ENV).ok());

    if write_template(&path, force)? {
        println!("Wrote config template to {}", path.display());
        println!("Fill in the [ssh] section, then run `mc-playtime analyze`.");
    } else {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Ok(())
}

/// Returns `false` when an existing file was left untouched.
fn write_template(path: &Path, force: bool) -> anyhow::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }

    // Ensure parent dir exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, TEMPLATE)?;
    Ok(true)
}
