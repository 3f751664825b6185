use chrono_tz::Tz;
use dotenv::dotenv;
use std::path::PathBuf;

pub struct Config {
    pub bind_addr: String,
    pub producer_program: String,
    pub producer_script: String,
    pub producer_workdir: Option<PathBuf>,
    pub market_timezone: Tz,
    pub default_exchanges: Vec<String>,
    pub fetch_all_max_rows: usize,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub cache_sweep_interval_secs: u64,
    pub parse_error_ceiling: usize,
    pub first_n_minutes: u32,
    pub trim_cached_to_request: bool,
    pub cors_allow_any: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        let timezone_name = env_or("MARKET_TIMEZONE", "Asia/Kolkata");
        let market_timezone: Tz = timezone_name
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid MARKET_TIMEZONE '{}': {}", timezone_name, e))?;

        let default_exchanges: Vec<String> = env_or("DEFAULT_EXCHANGES", "NSE,BSE")
            .split(',')
            .map(|e| e.trim().to_uppercase())
            .filter(|e| !e.is_empty())
            .collect();
        if default_exchanges.is_empty() {
            anyhow::bail!("DEFAULT_EXCHANGES must name at least one exchange");
        }

        Ok(Config {
            bind_addr: env_or("API_BIND_ADDR", "0.0.0.0:9999"),
            producer_program: env_or("PRODUCER_PROGRAM", "python3"),
            producer_script: env_or("PRODUCER_SCRIPT", "fetch_historical_data.py"),
            producer_workdir: std::env::var("PRODUCER_WORKDIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            market_timezone,
            default_exchanges,
            fetch_all_max_rows: parse_or("FETCH_ALL_MAX_ROWS", 10_000),
            cache_ttl_secs: parse_or("CACHE_TTL_SECS", 300),
            cache_max_entries: parse_or("CACHE_MAX_ENTRIES", 100),
            cache_sweep_interval_secs: parse_or("CACHE_SWEEP_INTERVAL_SECS", 60),
            parse_error_ceiling: parse_or("PARSE_ERROR_CEILING", 10),
            first_n_minutes: parse_or("FIRST_N_MINUTES", 15),
            trim_cached_to_request: parse_or("TRIM_CACHED_TO_REQUEST", false),
            cors_allow_any: parse_or("CORS_ALLOW_ANY", true),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid value '{}' for {}", raw, name);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_falls_back() {
        std::env::set_var("SHARED_TEST_CACHE_TTL", "not-a-number");
        assert_eq!(parse_or("SHARED_TEST_CACHE_TTL", 300u64), 300);
        std::env::set_var("SHARED_TEST_CACHE_TTL", " 120 ");
        assert_eq!(parse_or("SHARED_TEST_CACHE_TTL", 300u64), 120);
        assert!(parse_or("SHARED_TEST_UNSET_FLAG", true));
    }

    #[test]
    fn test_env_or_ignores_blank() {
        std::env::set_var("SHARED_TEST_BLANK", "   ");
        assert_eq!(env_or("SHARED_TEST_BLANK", "python3"), "python3");
    }
}
