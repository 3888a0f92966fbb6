//! Network data payload
//!
//! Hosts reference a Secret whose `networkData` key holds an OpenStack
//! `network_data.json` document. Only the `networks` list is read: each entry
//! names an interface (`id`) and its bound address.

use bmh_client::SecretData;
use serde::Deserialize;
use thiserror::Error;

/// Secret key holding the network data document
pub const NETWORK_DATA_KEY: &str = "networkData";

/// Errors reading a network data document
#[derive(Debug, Error)]
pub enum NetworkDataError {
    #[error("secret has no networkData key")]
    MissingKey,

    #[error("failed to parse network data: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no network with id {0}")]
    InterfaceNotFound(String),

    #[error("network {0} has no ip_address")]
    NoAddress(String),
}

/// Parsed network data document
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NetworkData {
    #[serde(default)]
    pub networks: Vec<Network>,
}

/// One `networks[]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub netmask: Option<String>,
}

impl NetworkData {
    /// Parse a document; JSON is accepted as a subset of YAML
    pub fn parse(document: &[u8]) -> Result<Self, NetworkDataError> {
        Ok(serde_yaml::from_slice(document)?)
    }

    /// Parse the document stored in a network data Secret
    pub fn from_secret(data: &SecretData) -> Result<Self, NetworkDataError> {
        let document = data.get(NETWORK_DATA_KEY).ok_or(NetworkDataError::MissingKey)?;
        Self::parse(document)
    }

    /// Look up a network by interface name
    pub fn network(&self, interface: &str) -> Option<&Network> {
        self.networks.iter().find(|n| n.id == interface)
    }

    /// Address bound to an interface, without any prefix length
    pub fn address_of(&self, interface: &str) -> Result<String, NetworkDataError> {
        let network = self
            .network(interface)
            .ok_or_else(|| NetworkDataError::InterfaceNotFound(interface.to_string()))?;
        network
            .ip_address
            .as_deref()
            .map(strip_prefix_length)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string)
            .ok_or_else(|| NetworkDataError::NoAddress(interface.to_string()))
    }
}

fn strip_prefix_length(address: &str) -> &str {
    address.split('/').next().unwrap_or_default().trim()
}
