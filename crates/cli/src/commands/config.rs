//! `init` and `validate`.

use std::path::Path;

use anyhow::{Context, Result};

use contentvc_core::config::AppConfig;

use super::style;

pub fn cmd_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, AppConfig::default_toml()).context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Edit the storage path and merge labels as needed");
    println!(
        "  2. Validate with: contentvc validate --config {}",
        output.display()
    );
    println!(
        "  3. Start the API: contentvc serve --config {}",
        output.display()
    );

    Ok(())
}

pub fn cmd_validate(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    if let Err(e) = config.validate() {
        println!("  [FAIL] Validation error: {}", e);
        anyhow::bail!("configuration validation failed");
    }
    println!("  [OK] All values are valid");

    println!();
    println!("Configuration summary:");
    println!("  Listen address : {}", config.server.listen);
    println!("  Log level      : {}", config.server.log_level);
    println!("  Database       : {}", config.storage.database_path.display());
    println!("  Body limit     : {} bytes", config.limits.max_body_bytes);
    println!(
        "  Diff bounds    : {} ms, {} edited lines",
        config.limits.diff_timeout_ms, config.limits.max_edit_lines
    );
    println!("  Cache capacity : {}", config.cache.capacity);
    println!(
        "  Marker labels  : {} / {} / {}",
        config.merge.ours_label, config.merge.theirs_label, config.merge.base_label
    );
    println!();
    println!("{}", style::success("Configuration is valid."));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_validate() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("contentvc.toml");
        cmd_init(&path).unwrap();
        cmd_validate(&path).unwrap();

        // Refuses to overwrite.
        assert!(cmd_init(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[limits]\nmax_body_bytes = 0\n").unwrap();
        assert!(cmd_validate(&path).is_err());
    }
}
