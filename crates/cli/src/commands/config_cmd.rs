//! `specplan config`: configuration commands.

use std::path::Path;

use specplan_config::AppConfig;

use super::load_config;

pub fn show(path: Option<&Path>) -> specplan_core::Result<()> {
    let config = load_config(path)?;
    println!("{}", config.to_redacted_toml());
    Ok(())
}

pub fn path() -> specplan_core::Result<()> {
    println!("{}", AppConfig::config_dir().join("config.toml").display());
    Ok(())
}

pub fn validate(path: Option<&Path>) -> specplan_core::Result<()> {
    let config = load_config(path)?;
    println!("Config parsed and validated");

    if !config.has_api_key() {
        println!("  warning: no API key set for provider '{}'", config.provider);
    }
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", config.model);
    println!(
        "  Plan:      {} steps ({} exploring), {:?}",
        config.plan.max_steps, config.plan.explore_steps, config.plan.termination
    );
    Ok(())
}
