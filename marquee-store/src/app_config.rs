use marquee_core::FinePolicy;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub seed_shows: Vec<SeedShow>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_url: Option<String>,
    /// Penalty ledger and rate limiting; in-memory ledger when absent
    pub redis_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub seat_hold_seconds: u64,
    pub abandon_fine: u64,
    pub fine_threshold: u64,
    #[serde(default)]
    pub fine_policy: FinePolicy,
    #[serde(default = "default_true")]
    pub allow_direct_booking: bool,
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_write_attempts")]
    pub max_write_attempts: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_true() -> bool { true }
fn default_write_attempts() -> u32 { 5 }
fn default_currency() -> String { "INR".to_string() }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMode {
    Approve,
    Decline,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SettlementConfig {
    pub mode: SettlementMode,
    pub circuit_failure_threshold: usize,
    pub circuit_reset_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedShow {
    pub id: Option<uuid::Uuid>,
    pub venue_name: String,
    pub show_time: String,
    pub price: i64,
    pub rows: Vec<String>,
    pub cols: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // untracked developer overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `MARQUEE__SERVER__PORT=9000`
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [server]
        port = 8080

        [storage]
        backend = "memory"

        [auth]
        jwt_secret = "secret"
        jwt_expiration_seconds = 3600

        [business_rules]
        seat_hold_seconds = 300
        abandon_fine = 5
        fine_threshold = 50
        sweep_interval_seconds = 120

        [settlement]
        mode = "approve"
        circuit_failure_threshold = 5
        circuit_reset_seconds = 30

        [[seed_shows]]
        venue_name = "Screen 1"
        show_time = "18:30"
        price = 250
        rows = ["A", "B"]
        cols = 5
    "#;

    #[test]
    fn test_defaults_fill_optional_rules() {
        let config = Config::from_toml(SAMPLE).unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(config.storage.redis_url.is_none());
        assert_eq!(config.business_rules.fine_policy, FinePolicy::PerHolder);
        assert!(config.business_rules.allow_direct_booking);
        assert_eq!(config.business_rules.max_write_attempts, 5);
        assert_eq!(config.business_rules.currency, "INR");
        assert_eq!(config.settlement.mode, SettlementMode::Approve);
        assert_eq!(config.seed_shows.len(), 1);
        assert_eq!(config.seed_shows[0].rows, vec!["A", "B"]);
    }

    #[test]
    fn test_fine_policy_parses() {
        let source = SAMPLE.replace("abandon_fine = 5", "abandon_fine = 5\nfine_policy = \"per_seat\"");
        let config = Config::from_toml(&source).unwrap();
        assert_eq!(config.business_rules.fine_policy, FinePolicy::PerSeat);
    }
}
