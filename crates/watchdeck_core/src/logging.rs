use env_logger::{Builder, Target};
use log::{debug, LevelFilter};

pub const LOG_ENV_VAR: &str = "WATCHDECK_LOG";

const QUIET_MODULES: &[&str] = &["reqwest::connect", "hyper_util::client", "rustls"];

fn parse_level(level: &str) -> LevelFilter {
    match level.trim().to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Installs the process logger. Level priority: explicit argument, then
/// `WATCHDECK_LOG`, then `info`. Accepts `module=level` pairs separated by
/// commas. A second call is a no-op.
pub fn init_logger(level: Option<&str>) {
    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var(LOG_ENV_VAR).ok())
        .unwrap_or_else(|| "info".to_string());

    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    for directive in level.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match directive.split_once('=') {
            Some((module, module_level)) => {
                builder.filter_module(module.trim(), parse_level(module_level));
            }
            None => {
                builder.filter_level(parse_level(directive));
            }
        }
    }

    for module in QUIET_MODULES {
        builder.filter_module(module, LevelFilter::Warn);
    }

    if builder.try_init().is_ok() {
        debug!("logger initialised with {level}");
    }
}
