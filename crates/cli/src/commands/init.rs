//! `ddrgate init`: Write the default configuration file.

use ddrgate_config::AppConfig;
use std::path::{Path, PathBuf};

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    match write_default_config(&config_path, force)? {
        true => {
            println!("✅ Created config.toml at: {}", config_path.display());
            println!("\n📝 Next steps:");
            println!("   1. Add API tokens under [auth] to require authentication");
            println!("   2. Run: ddrgate serve");
        }
        false => {
            println!("⚠️  Config already exists at: {}", config_path.display());
            println!("   Edit it manually or re-run with --force.");
        }
    }
    Ok(())
}

/// Returns `false` when a config already exists and `force` is not set.
pub fn write_default_config(path: &Path, force: bool) -> Result<bool, Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent().map(PathBuf::from) {
        std::fs::create_dir_all(&dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}
