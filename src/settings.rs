//! Process configuration, read once from the environment at startup.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use megaplan_api::config::{DEFAULT_PACING_MS, DEFAULT_TIMEOUT_SECS};
use megaplan_api::{MegaplanConfig, Pacing};
use thiserror::Error;

use crate::hierarchy::{HierarchyRules, MatchMode, NameRule, DEFAULT_DEVELOPMENT_PATTERN};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// How `MEGAPLAN_PACING_MS` is applied to outbound reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingMode {
    /// Sleep after every successful read.
    Fixed,
    /// Keep at least the delay between the starts of consecutive calls.
    Cooldown,
}

impl FromStr for PacingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fixed" => Ok(PacingMode::Fixed),
            "cooldown" => Ok(PacingMode::Cooldown),
            other => Err(format!("unknown pacing mode '{other}', expected 'fixed' or 'cooldown'")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Immutable service configuration shared by the server and every job.
#[derive(Debug, Clone)]
pub struct Settings {
    pub megaplan_url: String,
    pub megaplan_token: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub pacing_delay: Duration,
    pub pacing_mode: PacingMode,
    pub workers: usize,
    pub queue_capacity: usize,
    pub development_rule: NameRule,
}

impl Settings {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(SettingsError::Missing(name))
        };

        let development_pattern = lookup("DEVELOPMENT_TASK_PATTERN")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEVELOPMENT_PATTERN.to_string());
        let development_mode: MatchMode =
            parse_or(&lookup, "DEVELOPMENT_MATCH_MODE", MatchMode::ContainsIgnoreCase)?;

        let workers: usize = parse_or(&lookup, "REPORT_WORKERS", DEFAULT_WORKERS)?;
        let queue_capacity: usize = parse_or(&lookup, "REPORT_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY)?;

        Ok(Self {
            megaplan_url: required("MEGAPLAN_API_URL")?,
            megaplan_token: required("MEGAPLAN_API_KEY")?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", default_bind_addr())?,
            request_timeout: Duration::from_secs(parse_or(
                &lookup,
                "MEGAPLAN_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
            pacing_delay: Duration::from_millis(parse_or(&lookup, "MEGAPLAN_PACING_MS", DEFAULT_PACING_MS)?),
            pacing_mode: parse_or(&lookup, "MEGAPLAN_PACING_MODE", PacingMode::Fixed)?,
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
            development_rule: NameRule {
                pattern: development_pattern,
                mode: development_mode,
            },
        })
    }

    pub fn megaplan_config(&self) -> MegaplanConfig {
        MegaplanConfig::new(&self.megaplan_url, &self.megaplan_token)
            .with_timeout(self.request_timeout)
            .with_pacing(match self.pacing_mode {
                PacingMode::Fixed => Pacing::FixedDelay(self.pacing_delay),
                PacingMode::Cooldown => Pacing::Cooldown(self.pacing_delay),
            })
    }

    pub fn hierarchy_rules(&self) -> HierarchyRules {
        HierarchyRules::default().with_development(self.development_rule.clone())
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: ToString,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).filter(|value| !value.trim().is_empty()) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(err) => Err(SettingsError::Invalid {
                name,
                reason: err.to_string(),
                value,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{PacingMode, Settings, SettingsError};
    use crate::hierarchy::MatchMode;
    use megaplan_api::Pacing;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("MEGAPLAN_API_URL", "https://kubit.megaplan.ru"),
        ("MEGAPLAN_API_KEY", "token"),
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_set() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8000");
        assert_eq!(settings.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.pacing_delay, Duration::from_secs(1));
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.queue_capacity, 64);
        assert_eq!(settings.development_rule.mode, MatchMode::ContainsIgnoreCase);
        assert_eq!(settings.development_rule.pattern, "разработка продуктов");
    }

    #[test]
    fn missing_credentials_fail_startup() {
        let err = Settings::from_lookup(lookup(&[("MEGAPLAN_API_URL", "https://kubit.megaplan.ru")])).unwrap_err();
        assert_eq!(err, SettingsError::Missing("MEGAPLAN_API_KEY"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("MEGAPLAN_PACING_MS", "250"),
            ("REPORT_WORKERS", "0"),
            ("DEVELOPMENT_MATCH_MODE", "exact"),
            ("DEVELOPMENT_TASK_PATTERN", "🧪 Разработка продуктов"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.workers, 1);
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(
            settings.megaplan_config().pacing,
            Pacing::FixedDelay(Duration::from_millis(250))
        );
        let rules = settings.hierarchy_rules();
        assert_eq!(rules.development.mode, MatchMode::Exact);
        assert_eq!(rules.development.pattern, "🧪 Разработка продуктов");
    }

    #[test]
    fn cooldown_pacing_is_selectable() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("MEGAPLAN_PACING_MODE", "Cooldown"), ("MEGAPLAN_PACING_MS", "500")]);
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.pacing_mode, PacingMode::Cooldown);
        assert_eq!(
            settings.megaplan_config().pacing,
            Pacing::Cooldown(Duration::from_millis(500))
        );
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("MEGAPLAN_TIMEOUT_SECS", "soon"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { name: "MEGAPLAN_TIMEOUT_SECS", .. }));
    }
}
