use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

const DEV_FILTER: &str = "beatwatch=debug";
const PROD_FILTER: &str = "beatwatch=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines, debug level
    Development,
    /// One JSON object per event, info level
    Production,
    /// Nothing printed; events go to the in-memory capture
    Test,
}

impl Profile {
    /// `dev`/`development`, `prod`/`production`/`json`, `test`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "pretty" => Some(Profile::Development),
            "prod" | "production" | "json" => Some(Profile::Production),
            "test" => Some(Profile::Test),
            _ => None,
        }
    }

    fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development | Profile::Test => DEV_FILTER,
            Profile::Production => PROD_FILTER,
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has an effect. `RUST_LOG` overrides the profile's
/// default filter. Events are written to stderr.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        // A subscriber installed elsewhere (a test harness) wins; ignore the error.
        let _ = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(false)
                .with_writer(std::io::stderr)
                .finish()
                .try_init(),
            Profile::Test => {
                super::test_capture::init_test_capture();
                Ok(())
            }
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init(Profile::Test);
        init(Profile::Production);
        init(Profile::Test);
    }

    #[test]
    fn test_parse_profile() {
        assert_eq!(Profile::parse("JSON"), Some(Profile::Production));
        assert_eq!(Profile::parse("dev"), Some(Profile::Development));
        assert_eq!(Profile::parse("verbose"), None);
        assert_eq!(Profile::Production.default_filter(), "beatwatch=info");
    }
}
