// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! # Domains
//!
//! A domain is a priority ordered group of connectors together with the claim
//! mappings telling which connector stores which claim. Domains are assembled
//! once at boot and never change afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

pub mod error;
pub mod registry;

pub use error::DomainError;
pub use registry::DomainRegistry;

use crate::claim::{MetaClaim, MetaClaimMapping};
use crate::connector::{CredentialStoreConnector, IdentityStoreConnector};

/// Federated namespace of users and groups.
#[derive(Clone, Debug)]
pub struct Domain {
    name: String,
    priority: u32,
    identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
    credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
    /// Claim mappings indexed by the claim URI.
    claim_mappings: HashMap<String, MetaClaimMapping>,
    /// Claims indexed by the (connector id, attribute name).
    attributes: HashMap<(String, String), MetaClaim>,
}

impl Domain {
    pub fn builder<S: Into<String>>(name: S, priority: u32) -> DomainBuilder {
        DomainBuilder::new(name, priority)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority of the domain, `1` is the primary domain.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Identity store connectors sorted by their priority.
    pub fn identity_connectors(&self) -> &[Arc<dyn IdentityStoreConnector>] {
        &self.identity_connectors
    }

    /// Credential store connectors sorted by their priority.
    pub fn credential_connectors(&self) -> &[Arc<dyn CredentialStoreConnector>] {
        &self.credential_connectors
    }

    pub fn identity_connector(&self, connector_id: &str) -> Option<&Arc<dyn IdentityStoreConnector>> {
        self.identity_connectors
            .iter()
            .find(|c| c.connector_id() == connector_id)
    }

    pub fn credential_connector(
        &self,
        connector_id: &str,
    ) -> Option<&Arc<dyn CredentialStoreConnector>> {
        self.credential_connectors
            .iter()
            .find(|c| c.connector_id() == connector_id)
    }

    /// Whether the connector belongs to the domain.
    pub fn has_connector(&self, connector_id: &str) -> bool {
        self.identity_connector(connector_id).is_some()
            || self.credential_connector(connector_id).is_some()
    }

    /// Mapping of the claim.
    pub fn claim_mapping(&self, claim_uri: &str) -> Option<&MetaClaimMapping> {
        self.claim_mappings.get(claim_uri)
    }

    pub fn is_claim_supported(&self, claim_uri: &str) -> bool {
        self.claim_mappings.contains_key(claim_uri)
    }

    /// Claim stored by the connector under the attribute name.
    pub fn meta_claim_of(&self, connector_id: &str, attribute_name: &str) -> Option<&MetaClaim> {
        self.attributes
            .get(&(connector_id.to_string(), attribute_name.to_string()))
    }

    /// All claim mappings of the domain.
    pub fn claim_mappings(&self) -> impl Iterator<Item = &MetaClaimMapping> {
        self.claim_mappings.values()
    }
}

/// Builder of the [`Domain`].
#[derive(Debug, Default)]
pub struct DomainBuilder {
    name: String,
    priority: u32,
    identity_connectors: Vec<Arc<dyn IdentityStoreConnector>>,
    credential_connectors: Vec<Arc<dyn CredentialStoreConnector>>,
    claim_mappings: Vec<MetaClaimMapping>,
}

impl DomainBuilder {
    pub fn new<S: Into<String>>(name: S, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Default::default()
        }
    }

    pub fn identity_connector(mut self, connector: Arc<dyn IdentityStoreConnector>) -> Self {
        self.identity_connectors.push(connector);
        self
    }

    pub fn credential_connector(mut self, connector: Arc<dyn CredentialStoreConnector>) -> Self {
        self.credential_connectors.push(connector);
        self
    }

    pub fn claim_mapping(mut self, mapping: MetaClaimMapping) -> Self {
        self.claim_mappings.push(mapping);
        self
    }

    pub fn claim_mappings<I: IntoIterator<Item = MetaClaimMapping>>(mut self, mappings: I) -> Self {
        self.claim_mappings.extend(mappings);
        self
    }

    /// Validate and build the domain.
    pub fn build(self) -> Result<Domain, DomainError> {
        if self.name.is_empty() {
            return Err(DomainError::Configuration("domain name is empty".into()));
        }
        if self.priority < 1 {
            return Err(DomainError::Configuration(format!(
                "priority of the domain {} must be at least 1",
                self.name
            )));
        }

        let mut ids: HashSet<&str> = HashSet::new();
        for id in self
            .identity_connectors
            .iter()
            .map(|c| c.connector_id())
            .chain(self.credential_connectors.iter().map(|c| c.connector_id()))
        {
            if !ids.insert(id) {
                return Err(DomainError::Configuration(format!(
                    "connector {} is registered twice in the domain {}",
                    id, self.name
                )));
            }
        }

        let mut claim_mappings: HashMap<String, MetaClaimMapping> = HashMap::new();
        let mut attributes: HashMap<(String, String), MetaClaim> = HashMap::new();
        for mapping in self.claim_mappings {
            if !self
                .identity_connectors
                .iter()
                .any(|c| c.connector_id() == mapping.identity_store_connector_id)
            {
                return Err(DomainError::Configuration(format!(
                    "claim {} is mapped to {} which is not an identity store connector of the domain {}",
                    mapping.meta_claim.claim_uri, mapping.identity_store_connector_id, self.name
                )));
            }
            let claim_uri = mapping.meta_claim.claim_uri.clone();
            if claim_mappings.contains_key(&claim_uri) {
                warn!(
                    "claim {} is already mapped in the domain {}, ignoring the mapping to {}",
                    claim_uri, self.name, mapping.identity_store_connector_id
                );
                continue;
            }
            attributes
                .entry((
                    mapping.identity_store_connector_id.clone(),
                    mapping.attribute_name.clone(),
                ))
                .or_insert_with(|| mapping.meta_claim.clone());
            claim_mappings.insert(claim_uri, mapping);
        }

        let mut identity_connectors = self.identity_connectors;
        identity_connectors.sort_by_key(|c| c.priority());
        let mut credential_connectors = self.credential_connectors;
        credential_connectors.sort_by_key(|c| c.priority());

        Ok(Domain {
            name: self.name,
            priority: self.priority,
            identity_connectors,
            credential_connectors,
            claim_mappings,
            attributes,
        })
    }
}
