//! # Shell Configuration
//!
//! Unified configuration for the broker, the forwarder and telemetry.
//!
//! ## Environment
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `SB_DUPLICATE_POLICY` | `reject` or `overwrite` | `reject` |
//! | `SB_FORWARD_IDLE_MS` | forwarder idle wait, `0` = indefinite | indefinite |
//! | `SB_ARGS_FOR` | `app:x=a,b;app:y=c` startup arguments | none |
//! | `SB_NAME_MAPPINGS` | `from1=to1,from2=to2` application name aliases | none |
//! | `SB_STARTUP_APP` | application connected to at boot, `none` to skip | `app:authenticating_network_proxy` |
//! | `SB_ACCOUNTS` | comma-separated accounts needing consent per scope | `user@example.com` |
//! | `SB_ACTION_DECISION` | simulated user answer, `approve` or `deny` | `approve` |
//!
//! Telemetry variables are read by [`TelemetryConfig::from_env`].

use crate::host::ActionDecision;
use broker_telemetry::TelemetryConfig;
use sb_02_connection_broker::BrokerConfig;
use sb_03_pipe_forwarder::ForwarderConfig;
use shared_types::ApplicationName;
use std::time::Duration;
use thiserror::Error;

/// Application connected to at boot when nothing else is configured.
pub const DEFAULT_STARTUP_APP: &str = "app:authenticating_network_proxy";

/// Account offered by the local account store when none are configured.
pub const DEFAULT_ACCOUNT: &str = "user@example.com";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Broker configuration.
    pub broker: BrokerConfig,
    /// Forwarder configuration used by interposing applications.
    pub forwarder: ForwarderConfig,
    /// Logging configuration.
    pub telemetry: TelemetryConfig,
    /// Application to connect to at boot. `None` starts nothing.
    pub startup: Option<ApplicationName>,
    /// Accounts known to the local account store.
    pub accounts: Vec<String>,
    /// How the local action host answers.
    pub action_decision: ActionDecision,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            forwarder: ForwarderConfig::default(),
            telemetry: TelemetryConfig {
                service_name: "shell-runtime".to_string(),
                ..TelemetryConfig::default()
            },
            startup: Some(ApplicationName::new(DEFAULT_STARTUP_APP)),
            accounts: vec![DEFAULT_ACCOUNT.to_string()],
            action_decision: ActionDecision::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set to something unparseable.
    #[error("Invalid value for {variable}: {reason}")]
    InvalidValue { variable: &'static str, reason: String },

    /// The startup application name is empty.
    #[error("Startup application name must not be empty")]
    EmptyStartupApp,
}

impl ShellConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.telemetry = TelemetryConfig {
            service_name: config.telemetry.service_name,
            ..TelemetryConfig::from_env()
        };
        Ok(config)
    }

    /// Load broker, forwarder and startup settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(policy) = lookup("SB_DUPLICATE_POLICY") {
            config.broker.duplicate_policy =
                policy.parse().map_err(|reason| ConfigError::InvalidValue {
                    variable: "SB_DUPLICATE_POLICY",
                    reason,
                })?;
        }

        if let Some(idle) = lookup("SB_FORWARD_IDLE_MS") {
            let millis: u64 = idle.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    variable: "SB_FORWARD_IDLE_MS",
                    reason: e.to_string(),
                }
            })?;
            config.forwarder.idle_wait = (millis > 0).then(|| Duration::from_millis(millis));
        }

        if let Some(entries) = lookup("SB_NAME_MAPPINGS") {
            for (from, to) in parse_name_mappings(&entries)? {
                config.broker = config.broker.with_mapping(&from, &to);
            }
        }

        if let Some(entries) = lookup("SB_ARGS_FOR") {
            for (name, args) in parse_args_for(&entries)? {
                config.broker = config.broker.with_args(&name, args);
            }
        }

        if let Some(startup) = lookup("SB_STARTUP_APP") {
            let startup = startup.trim();
            config.startup = match startup {
                "none" => None,
                name => Some(ApplicationName::new(name)),
            };
        }

        if let Some(accounts) = lookup("SB_ACCOUNTS") {
            config.accounts = accounts
                .split(',')
                .map(str::trim)
                .filter(|account| !account.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(decision) = lookup("SB_ACTION_DECISION") {
            config.action_decision =
                decision.parse().map_err(|reason| ConfigError::InvalidValue {
                    variable: "SB_ACTION_DECISION",
                    reason,
                })?;
        }

        Ok(config)
    }

    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.startup.as_ref().is_some_and(ApplicationName::is_empty) {
            return Err(ConfigError::EmptyStartupApp);
        }
        Ok(())
    }
}

/// Parse `from1=to1,from2=to2`. Each pair splits at its first `=`.
fn parse_name_mappings(entries: &str) -> Result<Vec<(String, String)>, ConfigError> {
    entries
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let invalid = || ConfigError::InvalidValue {
                variable: "SB_NAME_MAPPINGS",
                reason: format!("expected from=to, got {entry:?}"),
            };
            let (from, to) = entry.split_once('=').ok_or_else(invalid)?;
            let (from, to) = (from.trim(), to.trim());
            if from.is_empty() || to.is_empty() {
                return Err(invalid());
            }
            Ok((from.to_string(), to.to_string()))
        })
        .collect()
}

/// Parse `app:x=a,b;app:y=c`. The name ends at the first `=`.
fn parse_args_for(entries: &str) -> Result<Vec<(String, Vec<String>)>, ConfigError> {
    entries.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, args) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                variable: "SB_ARGS_FOR",
                reason: format!("missing '=' in {entry:?}"),
            })?;
            let args = args
                .split(',')
                .map(str::trim)
                .filter(|arg| !arg.is_empty())
                .map(str::to_string)
                .collect();
            Ok((name.trim().to_string(), args))
        })
        .collect()
}
