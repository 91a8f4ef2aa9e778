//! Config command implementation

use anyhow::Result;
use notechunk_core::Config;

pub fn execute(config: &Config, path_only: bool) -> Result<()> {
    if path_only {
        println!("{}", Config::config_path()?.display());
        return Ok(());
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
