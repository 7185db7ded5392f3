//! Connection profile loading.
//!
//! Only the parts the client checks are typed; the rest of the profile is
//! kept as opaque JSON.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a connection profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No file at the configured path.
    #[error("Connection profile not found at: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read connection profile {}: {source}", .path.display())]
    Read {
        /// The profile path.
        path: PathBuf,
        /// The I/O failure.
        source: std::io::Error,
    },

    /// The file is not a valid profile document.
    #[error("Failed to parse connection profile: {0}")]
    Parse(#[from] serde_json::Error),

    /// The profile declares no channels.
    #[error("Invalid connection profile: No channels defined")]
    NoChannels,

    /// The configured channel is not declared.
    #[error("connection profile does not declare channel {0}")]
    UnknownChannel(String),
}

/// A peer entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    /// Peer endpoint, e.g. `grpcs://localhost:7051`.
    pub url: String,
}

/// A parsed connection profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionProfile {
    /// Network name.
    #[serde(default)]
    pub name: Option<String>,
    /// Channels keyed by name.
    #[serde(default)]
    pub channels: BTreeMap<String, serde_json::Value>,
    /// Peers keyed by name.
    #[serde(default)]
    pub peers: BTreeMap<String, PeerConfig>,
}

impl ConnectionProfile {
    /// Reads and validates a profile from disk.
    ///
    /// # Errors
    ///
    /// Returns a `ProfileError` if the file is missing, unreadable, not
    /// JSON, or declares no channels.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            return Err(ProfileError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses and validates a profile document.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Parse` or `ProfileError::NoChannels`.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(text)?;
        if profile.channels.is_empty() {
            return Err(ProfileError::NoChannels);
        }
        Ok(profile)
    }

    /// Checks that `channel` is declared.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::UnknownChannel` otherwise.
    pub fn require_channel(&self, channel: &str) -> Result<(), ProfileError> {
        if self.channels.contains_key(channel) {
            Ok(())
        } else {
            Err(ProfileError::UnknownChannel(channel.to_owned()))
        }
    }

    /// Endpoints of all declared peers.
    #[must_use]
    pub fn peer_urls(&self) -> Vec<&str> {
        self.peers.values().map(|p| p.url.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "name": "test-network-org1",
        "version": "1.0.0",
        "channels": { "mychannel": { "peers": { "peer0.org1.example.com": {} } } },
        "peers": {
            "peer0.org1.example.com": { "url": "grpcs://localhost:7051" }
        }
    }"#;

    #[test]
    fn test_parse_reads_channels_and_peers() {
        let profile = ConnectionProfile::parse(PROFILE).unwrap();

        assert!(profile.require_channel("mychannel").is_ok());
        assert_eq!(profile.peer_urls(), vec!["grpcs://localhost:7051"]);
    }

    #[test]
    fn test_profile_without_channels_is_rejected() {
        let result = ConnectionProfile::parse(r#"{"name":"n","peers":{}}"#);

        assert!(matches!(result, Err(ProfileError::NoChannels)));
    }

    #[test]
    fn test_unknown_channel_is_rejected() {
        let profile = ConnectionProfile::parse(PROFILE).unwrap();

        assert!(matches!(
            profile.require_channel("otherchannel"),
            Err(ProfileError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_a_parse_error() {
        assert!(matches!(
            ConnectionProfile::parse("{"),
            Err(ProfileError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = ConnectionProfile::load(Path::new("/nonexistent/connection-org1.json"));

        assert!(matches!(result, Err(ProfileError::NotFound(_))));
    }
}
