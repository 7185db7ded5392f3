//! File-backed identity wallet.
//!
//! Each identity is a `<label>.id` JSON file in the wallet directory. The
//! admin bootstrap imports a certificate and private key from an MSP
//! directory (`signcerts/` and `keystore/`) when the label is not yet present.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Errors raised by wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// A wallet or credential file could not be read or written.
    #[error("wallet I/O error at {}: {source}", .path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// A stored identity is not valid JSON.
    #[error("corrupt identity file {}: {source}", .path.display())]
    Corrupt {
        /// The identity file.
        path: PathBuf,
        /// The decode failure.
        source: serde_json::Error,
    },

    /// The credential directory or one of its subdirectories is missing.
    #[error("Credential path does not exist: {}", .0.display())]
    MissingCredentials(PathBuf),

    /// `signcerts/` or `keystore/` holds no files.
    #[error("No certificate or key files found in {}", .0.display())]
    EmptyCredentials(PathBuf),
}

/// X.509 credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// PEM-encoded certificate.
    pub certificate: String,
    /// PEM-encoded private key.
    pub private_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("certificate", &self.certificate)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// An identity as stored in the wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Signing credentials.
    pub credentials: Credentials,
    /// MSP the identity belongs to.
    pub msp_id: String,
    /// Identity type; always `X.509`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Storage format version.
    pub version: u32,
}

impl Identity {
    /// Builds an X.509 identity.
    #[must_use]
    pub fn x509(certificate: String, private_key: String, msp_id: impl Into<String>) -> Self {
        Self {
            credentials: Credentials {
                certificate,
                private_key,
            },
            msp_id: msp_id.into(),
            kind: "X.509".to_owned(),
            version: 1,
        }
    }
}

/// A directory of identity files.
#[derive(Debug, Clone)]
pub struct FileSystemWallet {
    root: PathBuf,
}

impl FileSystemWallet {
    /// Opens the wallet, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Io` if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WalletError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| WalletError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    fn identity_path(&self, label: &str) -> PathBuf {
        self.root.join(format!("{label}.id"))
    }

    /// Loads the identity stored under `label`.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Io` or `WalletError::Corrupt` if the file exists
    /// but cannot be read or decoded.
    pub fn get(&self, label: &str) -> Result<Option<Identity>, WalletError> {
        let path = self.identity_path(label);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|source| WalletError::Io {
            path: path.clone(),
            source,
        })?;
        let identity =
            serde_json::from_str(&text).map_err(|source| WalletError::Corrupt { path, source })?;
        Ok(Some(identity))
    }

    /// Stores `identity` under `label`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Io` if the file cannot be written.
    pub fn put(&self, label: &str, identity: &Identity) -> Result<(), WalletError> {
        let path = self.identity_path(label);
        let text = serde_json::to_string(identity).map_err(|source| WalletError::Corrupt {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|source| WalletError::Io { path, source })
    }
}

/// Returns the identity under `label`, importing it from `credential_dir`
/// first if the wallet does not have it.
///
/// # Errors
///
/// Returns `WalletError::MissingCredentials` or
/// `WalletError::EmptyCredentials` if the MSP directory layout is incomplete,
/// or an I/O error.
pub fn bootstrap_identity(
    wallet: &FileSystemWallet,
    label: &str,
    credential_dir: &Path,
    msp_id: &str,
) -> Result<Identity, WalletError> {
    if let Some(identity) = wallet.get(label)? {
        info!(label, "identity already exists in the wallet");
        return Ok(identity);
    }

    info!(label, path = %credential_dir.display(), "importing identity from credential directory");

    if !credential_dir.exists() {
        return Err(WalletError::MissingCredentials(credential_dir.to_path_buf()));
    }
    let signcerts = credential_dir.join("signcerts");
    let keystore = credential_dir.join("keystore");
    for dir in [&signcerts, &keystore] {
        if !dir.is_dir() {
            return Err(WalletError::MissingCredentials(dir.clone()));
        }
    }

    let certificate = read_first_file(&signcerts)?;
    let private_key = read_first_file(&keystore)?;

    let identity = Identity::x509(certificate, private_key, msp_id);
    wallet.put(label, &identity)?;
    info!(label, msp_id, "identity imported into the wallet");
    Ok(identity)
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, WalletError> {
    let io_err = |source: std::io::Error| WalletError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    paths.sort();
    Ok(paths)
}

fn read_first_file(dir: &Path) -> Result<String, WalletError> {
    let first = read_dir_sorted(dir)?
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| WalletError::EmptyCredentials(dir.to_path_buf()))?;
    std::fs::read_to_string(&first).map_err(|source| WalletError::Io {
        path: first,
        source,
    })
}
