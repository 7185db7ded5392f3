//! Ledger connection settings.

use std::path::PathBuf;

use eventtracker_core::error::DomainError;

/// Wallet label of the identity used for every gateway session.
pub const ADMIN_LABEL: &str = "admin";

/// Everything needed to open a gateway session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Path to the JSON connection profile.
    pub connection_profile_path: PathBuf,
    /// Channel the contract is deployed on.
    pub channel_name: String,
    /// Deployed contract (chaincode) name.
    pub chaincode_name: String,
    /// Directory of the file-backed identity wallet.
    pub wallet_path: PathBuf,
    /// Organization MSP identifier attached to the imported identity.
    pub msp_id: String,
    /// MSP directory holding `signcerts/` and `keystore/` for the admin user.
    pub admin_credential_path: PathBuf,
    /// Base URL of the ledger HTTP gateway.
    pub gateway_url: Option<String>,
}

impl LedgerConfig {
    /// Checks that the required settings are present.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Config` naming the first missing setting.
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("CONNECTION_PROFILE_PATH", self.connection_profile_path.as_os_str().is_empty()),
            ("CHANNEL_NAME", self.channel_name.is_empty()),
            ("CHAINCODE_NAME", self.chaincode_name.is_empty()),
            ("WALLET_PATH", self.wallet_path.as_os_str().is_empty()),
            ("ORG_MSP", self.msp_id.is_empty()),
        ];
        match required.iter().find(|(_, missing)| *missing) {
            Some((name, _)) => Err(DomainError::Config(format!("{name} is not defined"))),
            None => Ok(()),
        }
    }
}
