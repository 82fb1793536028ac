//! Logging utilities

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system with `env_logger` defaults
pub fn init() {
    env_logger::init();
}

/// Initialize logging with a default level; `RUST_LOG` still takes precedence.
pub fn init_with_level(level: LevelFilter) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
