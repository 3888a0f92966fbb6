//! Metadata extrapolation
//!
//! Resolves the connection data a host needs once it is provisioned: BMC
//! credentials from the Secret named by `spec.bmc.credentialsName`, and the
//! addresses bound to service interfaces from the network data Secret.
//! Both operations skip the store entirely when the data is already present
//! on the host.

use crate::error::SchedulerError;
use crate::host::Host;
use crate::network_data::NetworkData;
use bmh_client::{BmhClientTrait, BmhError, SecretData};
use std::collections::BTreeMap;
use tracing::debug;

/// Credential Secret key holding the BMC username
pub const USERNAME_KEY: &str = "username";

/// Credential Secret key holding the BMC password
pub const PASSWORD_KEY: &str = "password";

/// Resolves host connection data from the store
pub struct Extrapolator<'a> {
    store: &'a dyn BmhClientTrait,
}

impl<'a> Extrapolator<'a> {
    pub fn new(store: &'a dyn BmhClientTrait) -> Self {
        Self { store }
    }

    /// Populate the host's BMC username and password
    pub async fn resolve_credentials(&self, host: &mut Host) -> Result<(), SchedulerError> {
        if host.data.has_credentials() {
            debug!("Host {} already has BMC credentials, skipping", host.id);
            return Ok(());
        }

        let secret_ref = host.bmh.credentials_ref().ok_or_else(|| SchedulerError::CredentialResolution {
            host: host.id.to_string(),
            reason: "spec.bmc.credentialsName is not set".to_string(),
        })?;

        let secret = match self.store.get_secret(&secret_ref).await {
            Ok(secret) => secret,
            Err(BmhError::NotFound(what)) => {
                return Err(SchedulerError::CredentialResolution {
                    host: host.id.to_string(),
                    reason: format!("{} not found", what),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let field = |key: &str| required_field(&secret, key, &host.id.to_string());
        let username = field(USERNAME_KEY)?;
        let password = field(PASSWORD_KEY)?;

        host.data.bmc_username = username;
        host.data.bmc_password = password;
        debug!("Resolved BMC credentials for host {} from {}", host.id, secret_ref);
        Ok(())
    }

    /// Populate the addresses the host binds on each of `interfaces`
    ///
    /// Interfaces already present in the host's map are not re-resolved.
    /// Nothing is merged unless every pending interface resolves.
    pub async fn resolve_addresses(&self, host: &mut Host, interfaces: &[String]) -> Result<(), SchedulerError> {
        let pending: Vec<&String> = interfaces
            .iter()
            .filter(|iface| !host.data.ip_on_interface.contains_key(iface.as_str()))
            .collect();
        if pending.is_empty() {
            debug!("Host {} already has addresses for {:?}, skipping", host.id, interfaces);
            return Ok(());
        }

        let secret = match self.store.get_secret(&host.network_data).await {
            Ok(secret) => secret,
            Err(BmhError::NotFound(what)) => {
                return Err(SchedulerError::NetworkDataMissing {
                    host: host.id.to_string(),
                    reason: format!("{} not found", what),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let malformed = |reason: String| SchedulerError::MalformedNetworkData {
            host: host.id.to_string(),
            reason,
        };
        let network_data = NetworkData::from_secret(&secret).map_err(|e| malformed(e.to_string()))?;

        let mut resolved = BTreeMap::new();
        for iface in pending {
            let address = network_data.address_of(iface).map_err(|e| malformed(e.to_string()))?;
            resolved.insert(iface.clone(), address);
        }

        debug!("Resolved addresses for host {}: {:?}", host.id, resolved);
        host.data.ip_on_interface.extend(resolved);
        Ok(())
    }
}

fn required_field(secret: &SecretData, key: &str, host: &str) -> Result<String, SchedulerError> {
    let malformed = |reason: String| SchedulerError::MalformedCredential {
        host: host.to_string(),
        reason,
    };
    let value = secret
        .get(key)
        .ok_or_else(|| malformed(format!("secret has no {} key", key)))?;
    let value = String::from_utf8(value.clone()).map_err(|_| malformed(format!("{} is not valid UTF-8", key)))?;
    if value.is_empty() {
        return Err(malformed(format!("{} is empty", key)));
    }
    Ok(value)
}
