pub mod config_cmd;
pub mod plan;
pub mod summarize;

use std::path::Path;

use specplan_config::AppConfig;
use specplan_core::error::AppError;

/// Load the config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> specplan_core::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

pub fn read_file(path: &Path) -> specplan_core::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::fs(format!("Failed to read {}: {e}", path.display())))
}

/// Write to `out` when given, else print to stdout.
pub fn emit(text: &str, out: Option<&Path>) -> specplan_core::Result<()> {
    match out {
        Some(path) => std::fs::write(path, format!("{text}\n"))
            .map_err(|e| AppError::fs(format!("Failed to write {}: {e}", path.display()))),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}
