/// File-backed logger.
///
/// The terminal is in raw mode on the alternate screen while the game runs,
/// so log records go to a file instead of stderr. `RUST_LOG` overrides the
/// level from config.toml.

use std::fs::OpenOptions;

use env_logger::{Builder, Env, Target};

use crate::config::GeneralConfig;

/// Install the global logger. Returns false (logging stays off) when the
/// log file cannot be opened.
pub fn init(general: &GeneralConfig) -> bool {
    let file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&general.log_file)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not open log file {}: {e}", general.log_file.display());
            return false;
        }
    };

    Builder::from_env(Env::default().default_filter_or(general.log_level.as_str()))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .is_ok()
}
