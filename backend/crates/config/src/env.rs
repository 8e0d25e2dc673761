use chrono::FixedOffset;
use ctxwatch_common::error::{CtxError, CtxResult};
use ctxwatch_common::types::Severity;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    /// Fixed offset the reporting day is computed in ("+05:30" style).
    pub report_utc_offset: String,
    /// Lowest severity loaded from the anomaly feed.
    pub min_severity: Severity,
    pub classifier_concurrency: usize,
    pub classifier_timeout_secs: u64,
    pub classifier_max_output_tokens: u32,
    pub context_char_budget: usize,
}

impl AppConfig {
    /// Load configuration from environment variables.
    /// Loads `.env` file if present, then reads required vars.
    pub fn from_env() -> CtxResult<Self> {
        // Best-effort .env load; ignore if missing
        let _ = dotenvy::dotenv();

        let report_utc_offset = get_var_or("REPORT_UTC_OFFSET", "+05:30");
        parse_utc_offset(&report_utc_offset)?;

        let classifier_concurrency: usize = parse_var("CLASSIFIER_CONCURRENCY", "8")?;
        if classifier_concurrency == 0 {
            return Err(CtxError::Config(
                "CLASSIFIER_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url: get_var("DATABASE_URL")?,
            host: get_var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", "8080")?,
            log_level: get_var_or("LOG_LEVEL", "info"),
            report_utc_offset,
            min_severity: parse_var("MIN_SEVERITY", "LOW")?,
            classifier_concurrency,
            classifier_timeout_secs: parse_var("CLASSIFIER_TIMEOUT_SECS", "30")?,
            classifier_max_output_tokens: parse_var("CLASSIFIER_MAX_OUTPUT_TOKENS", "100")?,
            context_char_budget: parse_var("CONTEXT_CHAR_BUDGET", "200")?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn report_offset(&self) -> CtxResult<FixedOffset> {
        parse_utc_offset(&self.report_utc_offset)
    }
}

/// Parse a `+HH:MM` / `-HH:MM` offset (also accepts `Z` and `UTC`).
pub fn parse_utc_offset(raw: &str) -> CtxResult<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| CtxError::Config("invalid UTC offset".to_string()));
    }

    let invalid = || CtxError::Config(format!("invalid REPORT_UTC_OFFSET: {raw}"));

    let (sign, rest) = match raw.split_at_checked(1) {
        Some(("+", rest)) => (1, rest),
        Some(("-", rest)) => (-1, rest),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn get_var(key: &str) -> CtxResult<String> {
    env::var(key).map_err(|_| CtxError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: &str) -> CtxResult<T>
where
    T::Err: std::fmt::Display,
{
    get_var_or(key, default)
        .trim()
        .parse()
        .map_err(|e| CtxError::Config(format!("invalid {key}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn config_from_env_succeeds_with_required_vars() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/ctxwatch_test");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.database_url, "postgres://localhost/ctxwatch_test");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.report_utc_offset, "+05:30");
        assert_eq!(cfg.min_severity, Severity::Low);
        assert_eq!(cfg.classifier_concurrency, 8);
        assert_eq!(cfg.classifier_max_output_tokens, 100);
        assert_eq!(cfg.context_char_budget, 200);

        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_from_env_fails_without_database_url() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::remove_var("DATABASE_URL");
        let result = AppConfig::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn config_rejects_zero_concurrency() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/ctxwatch_test");
        env::set_var("CLASSIFIER_CONCURRENCY", "0");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("CLASSIFIER_CONCURRENCY"), "got: {err}");

        env::remove_var("CLASSIFIER_CONCURRENCY");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_rejects_garbage_offset() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/ctxwatch_test");
        env::set_var("REPORT_UTC_OFFSET", "Asia/Kolkata");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("REPORT_UTC_OFFSET"), "got: {err}");

        env::remove_var("REPORT_UTC_OFFSET");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_rejects_unknown_severity() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/ctxwatch_test");
        env::set_var("MIN_SEVERITY", "SEVERE");

        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, CtxError::Config(_)), "got: {err}");
        assert!(err.to_string().contains("MIN_SEVERITY"), "got: {err}");

        env::remove_var("MIN_SEVERITY");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn config_parses_severity_case_insensitively() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");

        env::set_var("DATABASE_URL", "postgres://localhost/ctxwatch_test");
        env::set_var("MIN_SEVERITY", " medium ");

        let cfg = AppConfig::from_env().expect("should parse config");
        assert_eq!(cfg.min_severity, Severity::Medium);

        env::remove_var("MIN_SEVERITY");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn bind_addr_formats_correctly() {
        let cfg = AppConfig {
            database_url: String::new(),
            host: "127.0.0.1".to_owned(),
            port: 3000,
            log_level: "debug".to_owned(),
            report_utc_offset: "+00:00".to_owned(),
            min_severity: Severity::Low,
            classifier_concurrency: 1,
            classifier_timeout_secs: 5,
            classifier_max_output_tokens: 100,
            context_char_budget: 200,
        };
        assert_eq!(cfg.bind_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn parses_positive_and_negative_offsets() {
        assert_eq!(
            parse_utc_offset("+05:30").unwrap().local_minus_utc(),
            5 * 3600 + 30 * 60
        );
        assert_eq!(
            parse_utc_offset("-08:00").unwrap().local_minus_utc(),
            -8 * 3600
        );
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+5").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+05:75").is_err());
        assert!(parse_utc_offset("").is_err());
    }
}
