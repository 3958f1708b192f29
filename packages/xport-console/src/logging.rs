//! Logging setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Used when `RUST_LOG` is unset; covers the binary, the console library and
/// the bridge library
pub const DEFAULT_FILTER: &str = "info,xport=debug,xport_rs=debug,console=debug";

pub fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, writing to stderr so command output stays clean
pub fn init() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_default_filter_names_every_crate_target() {
        let directives: Vec<&str> = DEFAULT_FILTER.split(',').collect();
        for target in ["xport", "xport_rs", "console"] {
            assert!(
                directives.contains(&format!("{}=debug", target).as_str()),
                "missing debug directive for {}",
                target
            );
        }
    }
}
