//! Server configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use eventtracker_events::application::ledger_access::DEFAULT_LEDGER_TIMEOUT;
use eventtracker_ledger::LedgerConfig;
use eventtracker_mirror::MirrorConfig;

use crate::error::AppError;

/// Admin MSP directory of the Fabric test network's first organization.
pub const DEFAULT_ADMIN_CREDENTIAL_PATH: &str =
    "../test-network/organizations/peerOrganizations/org1.example.com/users/Admin@org1.example.com/msp";

const DEFAULT_MSP_ID: &str = "Org1MSP";

/// Which ledger client the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    /// A remote ledger behind an HTTP gateway.
    Gateway,
    /// The contract hosted in this process over an in-memory world state.
    InProcess,
}

/// Everything the server reads from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Ledger client selection.
    pub ledger_mode: LedgerMode,
    /// Gateway session settings.
    pub ledger: LedgerConfig,
    /// Bound on each ledger call.
    pub ledger_timeout: Duration,
    /// Mirror database settings.
    pub mirror: MirrorConfig,
    /// OTLP collector endpoint; spans are only exported when set.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = parse(&var, "PORT", 3000_u16)?;

        let ledger_mode = match var("LEDGER_MODE").as_deref() {
            None | Some("gateway") => LedgerMode::Gateway,
            Some("in-process") => LedgerMode::InProcess,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "LEDGER_MODE must be `gateway` or `in-process`, got `{other}`"
                )));
            }
        };

        let ledger = LedgerConfig {
            connection_profile_path: var("CONNECTION_PROFILE_PATH")
                .map(PathBuf::from)
                .unwrap_or_default(),
            channel_name: var("CHANNEL_NAME").unwrap_or_default(),
            chaincode_name: var("CHAINCODE_NAME").unwrap_or_default(),
            wallet_path: var("WALLET_PATH").map(PathBuf::from).unwrap_or_default(),
            msp_id: var("ORG_MSP").unwrap_or_else(|| DEFAULT_MSP_ID.to_owned()),
            admin_credential_path: PathBuf::from(
                var("ADMIN_CREDENTIAL_PATH")
                    .unwrap_or_else(|| DEFAULT_ADMIN_CREDENTIAL_PATH.to_owned()),
            ),
            gateway_url: var("LEDGER_GATEWAY_URL"),
        };
        let ledger_timeout = Duration::from_secs(parse(
            &var,
            "LEDGER_TIMEOUT_SECS",
            DEFAULT_LEDGER_TIMEOUT.as_secs(),
        )?);
        if ledger_timeout.is_zero() {
            return Err(AppError::Config(
                "LEDGER_TIMEOUT_SECS must be at least 1".to_owned(),
            ));
        }

        let mirror_url = var("MIRROR_DATABASE_URL")
            .or_else(|| var("DATABASE_URL"))
            .ok_or_else(|| {
                AppError::Config(
                    "MIRROR_DATABASE_URL (or DATABASE_URL) environment variable must be set"
                        .to_owned(),
                )
            })?;
        let mut mirror = MirrorConfig::new(mirror_url).with_max_connections(parse(
            &var,
            "MIRROR_MAX_CONNECTIONS",
            eventtracker_mirror::config::DEFAULT_MAX_CONNECTIONS,
        )?);
        if let Some(key) = var("MIRROR_ACCESS_KEY") {
            mirror = mirror.with_access_key(key);
        }

        Ok(Self {
            host,
            port,
            ledger_mode,
            ledger,
            ledger_timeout,
            mirror,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}
