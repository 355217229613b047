use crate::store::RANK_FETCH_CAP;

/// Runtime configuration read from the environment
///
/// | Variable         | Default       |
/// |------------------|---------------|
/// | `DB_PATH`        | `mobility.db` |
/// | `PORT`           | `3000`        |
/// | `RANK_FETCH_CAP` | `1000`        |
/// | `USE_FALLBACK`   | `true`        |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
    /// Trips fetched from the store before ranking
    pub fetch_cap: usize,
    /// Serve the fixed dataset when the store fails
    pub use_fallback: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: "mobility.db".to_string(),
            port: 3000,
            fetch_cap: RANK_FETCH_CAP,
            use_fallback: true,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values keep their default
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            db_path: lookup("DB_PATH").unwrap_or(defaults.db_path),
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            fetch_cap: parse_or("RANK_FETCH_CAP", lookup("RANK_FETCH_CAP"), defaults.fetch_cap),
            use_fallback: lookup("USE_FALLBACK")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.use_fallback),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match raw {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
