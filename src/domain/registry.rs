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
//! # Domain registry
//!
//! Immutable, priority ordered set of the domains.
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::connector::{CredentialStoreConnector, IdentityStoreConnector};
use crate::domain::{Domain, DomainError};

#[derive(Clone, Debug)]
pub struct DomainRegistry {
    /// Domains sorted by the priority, the primary domain first.
    domains: Vec<Domain>,
}

impl DomainRegistry {
    /// Validate the topology and build the registry.
    ///
    /// Priorities must be distinct with exactly one primary (`1`) domain.
    /// Domain names and connector ids must be unique across the registry.
    pub fn new(mut domains: Vec<Domain>) -> Result<Self, DomainError> {
        domains.sort_by_key(|d| d.priority());

        let primary = domains.iter().filter(|d| d.priority() == 1).count();
        if primary != 1 {
            return Err(DomainError::Configuration(format!(
                "exactly one primary domain with the priority 1 is required, found {primary}"
            )));
        }
        if let Some(pair) = domains
            .windows(2)
            .find(|pair| pair[0].priority() == pair[1].priority())
        {
            return Err(DomainError::Configuration(format!(
                "domains {} and {} share the priority {}",
                pair[0].name(),
                pair[1].name(),
                pair[0].priority()
            )));
        }

        let mut names: HashSet<&str> = HashSet::new();
        let mut connector_ids: HashSet<&str> = HashSet::new();
        for domain in domains.iter() {
            if !names.insert(domain.name()) {
                return Err(DomainError::Configuration(format!(
                    "domain {} is defined twice",
                    domain.name()
                )));
            }
            for id in domain
                .identity_connectors()
                .iter()
                .map(|c| c.connector_id())
                .chain(domain.credential_connectors().iter().map(|c| c.connector_id()))
            {
                if !connector_ids.insert(id) {
                    return Err(DomainError::Configuration(format!(
                        "connector {id} is registered in more than one domain"
                    )));
                }
            }
        }
        info!(
            "federating {} domain(s): {:?}",
            domains.len(),
            domains.iter().map(|d| d.name()).collect::<Vec<_>>()
        );
        Ok(Self { domains })
    }

    /// Find domain by the name.
    pub fn resolve_domain(&self, name: &str) -> Result<&Domain, DomainError> {
        self.domains
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| DomainError::DomainNotFound(name.into()))
    }

    /// The domain with the priority `1`.
    pub fn primary_domain(&self) -> &Domain {
        // The constructor guarantees the primary domain sorts first.
        &self.domains[0]
    }

    /// Domains in the ascending priority order.
    pub fn list_domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn is_claim_supported(&self, domain: &str, claim_uri: &str) -> Result<bool, DomainError> {
        Ok(self.resolve_domain(domain)?.is_claim_supported(claim_uri))
    }

    /// Domains an operation searches: the named one or all of them.
    pub fn candidate_domains(&self, domain: Option<&str>) -> Result<Vec<&Domain>, DomainError> {
        match domain {
            Some(name) => Ok(vec![self.resolve_domain(name)?]),
            None => Ok(self.domains.iter().collect()),
        }
    }

    /// Domain the connector belongs to.
    pub fn domain_of_connector(&self, connector_id: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.has_connector(connector_id))
    }

    pub fn find_identity_connector(
        &self,
        connector_id: &str,
    ) -> Option<&Arc<dyn IdentityStoreConnector>> {
        self.domains
            .iter()
            .find_map(|d| d.identity_connector(connector_id))
    }

    pub fn find_credential_connector(
        &self,
        connector_id: &str,
    ) -> Option<&Arc<dyn CredentialStoreConnector>> {
        self.domains
            .iter()
            .find_map(|d| d.credential_connector(connector_id))
    }
}
