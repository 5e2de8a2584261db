const DEFAULT_CACHE_MAX_AGE_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub cleanup_enabled: bool,
    pub cleanup_schedule: String,
    pub cache_max_age_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cleanup_enabled = std::env::var("ENABLE_CACHE_CLEANUP_WORKER")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let cleanup_schedule = std::env::var("CACHE_CLEANUP_SCHEDULE")
            .unwrap_or_else(|_| "0 */10 * * * *".to_string());

        let cache_max_age_minutes = std::env::var("CACHE_MAX_AGE_MINUTES")
            .ok()
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|minutes| *minutes > 0 && chrono::Duration::try_minutes(*minutes).is_some())
            .unwrap_or(DEFAULT_CACHE_MAX_AGE_MINUTES);

        Self {
            log_level,
            cleanup_enabled,
            cleanup_schedule,
            cache_max_age_minutes,
        }
    }

    /// Falls back to the default when the configured minutes do not fit a
    /// `chrono::Duration`.
    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::try_minutes(self.cache_max_age_minutes)
            .or_else(|| chrono::Duration::try_minutes(DEFAULT_CACHE_MAX_AGE_MINUTES))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_max_age(minutes: i64) -> Config {
        Config {
            log_level: "info".to_string(),
            cleanup_enabled: true,
            cleanup_schedule: "0 */10 * * * *".to_string(),
            cache_max_age_minutes: minutes,
        }
    }

    #[test]
    fn test_cache_max_age() {
        assert_eq!(config_with_max_age(45).cache_max_age(), chrono::Duration::minutes(45));
    }

    #[test]
    fn test_oversized_cache_max_age_falls_back() {
        let config = config_with_max_age(200_000_000_000_000_000);
        assert_eq!(config.cache_max_age(), chrono::Duration::minutes(DEFAULT_CACHE_MAX_AGE_MINUTES));
    }
}
