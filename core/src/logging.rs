//! Subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

use crate::config::HabiticaConfig;

/// Environment variable holding a full `EnvFilter` directive.
pub const LOG_ENV: &str = "HABITICA_LOG";

/// Filter from `HABITICA_LOG` if set and parseable, else `default_level`.
pub fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install a stderr `fmt` subscriber. `HABITICA_LOG` wins over `default_level`.
///
/// Returns `false` when a global subscriber was already set, which is not an
/// error: the host's subscriber keeps receiving our events.
pub fn init(default_level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// `init` at the level carried by the config (`HABITICA_LOG_LEVEL`).
pub fn init_from(config: &HabiticaConfig) -> bool {
    init(&config.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn config_level_is_the_fallback() {
        temp_env::with_vars(
            [
                (LOG_ENV, None),
                ("HABITICA_USER_ID", Some("u")),
                ("HABITICA_API_KEY", Some("k")),
                ("HABITICA_LOG_LEVEL", Some("debug")),
            ],
            || {
                let config = HabiticaConfig::from_env().unwrap();
                assert_eq!(filter(&config.log_level).max_level_hint(), Some(LevelFilter::DEBUG));
            },
        );
    }

    #[test]
    fn habitica_log_overrides_config_level() {
        temp_env::with_vars([(LOG_ENV, Some("error"))], || {
            assert_eq!(filter("debug").max_level_hint(), Some(LevelFilter::ERROR));
        });
    }
}
