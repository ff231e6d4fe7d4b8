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
//! # Claim translator
//!
//! Translation between claims and the connector native attributes of a domain.
//! The write path is strict: a claim the domain has no mapping for rejects
//! the whole request before any connector is called. The read path is
//! lenient: attributes without a mapping are dropped.
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::claim::{Claim, ClaimError, MetaClaim, MetaClaimMapping};
use crate::connector::{Attribute, IdentityStoreConnector};
use crate::domain::Domain;

/// Attributes grouped by the connector holding them.
pub type ConnectorAttributes = Vec<(Arc<dyn IdentityStoreConnector>, Vec<Attribute>)>;

/// Mapping of the claim in the domain.
pub fn owner_of<'a>(
    domain: &'a Domain,
    claim_uri: &str,
) -> Result<(&'a Arc<dyn IdentityStoreConnector>, &'a MetaClaimMapping), ClaimError> {
    domain
        .claim_mapping(claim_uri)
        .and_then(|mapping| {
            domain
                .identity_connector(&mapping.identity_store_connector_id)
                .map(|connector| (connector, mapping))
        })
        .ok_or_else(|| ClaimError::ClaimNotSupported {
            claim_uri: claim_uri.into(),
            domain: domain.name().into(),
        })
}

/// Translate claims into the attributes grouped by the owning connector.
///
/// Connectors are returned in the priority order and only when they own at
/// least one of the claims.
pub fn to_attributes(domain: &Domain, claims: &[Claim]) -> Result<ConnectorAttributes, ClaimError> {
    let mut grouped: HashMap<&str, Vec<Attribute>> = HashMap::new();
    for claim in claims {
        let (connector, mapping) = owner_of(domain, &claim.claim_uri)?;
        grouped
            .entry(connector.connector_id())
            .or_default()
            .push(Attribute::new(mapping.attribute_name.clone(), claim.value.clone()));
    }
    Ok(domain
        .identity_connectors()
        .iter()
        .filter_map(|connector| {
            grouped
                .remove(connector.connector_id())
                .map(|attributes| (connector.clone(), attributes))
        })
        .collect())
}

/// Translate attributes read from the connector back into claims.
pub fn to_claims(domain: &Domain, connector_id: &str, attributes: &[Attribute]) -> Vec<Claim> {
    attributes
        .iter()
        .filter_map(|attr| match domain.meta_claim_of(connector_id, &attr.attribute_name) {
            Some(meta) => Some(Claim {
                dialect_uri: meta.dialect_uri.clone(),
                claim_uri: meta.claim_uri.clone(),
                value: attr.value.clone(),
            }),
            None => {
                trace!(
                    "dropping unmapped attribute {} of {}",
                    attr.attribute_name, connector_id
                );
                None
            }
        })
        .collect()
}

/// Attribute names of the claims grouped by the owning connector.
pub fn to_attribute_names(
    domain: &Domain,
    meta_claims: &[MetaClaim],
) -> Result<Vec<(Arc<dyn IdentityStoreConnector>, Vec<String>)>, ClaimError> {
    let mut grouped: HashMap<&str, Vec<String>> = HashMap::new();
    for meta in meta_claims {
        let (connector, mapping) = owner_of(domain, &meta.claim_uri)?;
        grouped
            .entry(connector.connector_id())
            .or_default()
            .push(mapping.attribute_name.clone());
    }
    Ok(domain
        .identity_connectors()
        .iter()
        .filter_map(|connector| {
            grouped
                .remove(connector.connector_id())
                .map(|names| (connector.clone(), names))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::InMemoryIdentityStoreConnector;

    fn domain() -> Domain {
        Domain::builder("PRIMARY", 1)
            .identity_connector(Arc::new(InMemoryIdentityStoreConnector::new("c2", 2)))
            .identity_connector(Arc::new(InMemoryIdentityStoreConnector::new("c1", 1)))
            .claim_mapping(MetaClaimMapping::new("username", "c1", "uid"))
            .claim_mapping(MetaClaimMapping::new("email", "c1", "mail"))
            .claim_mapping(MetaClaimMapping::new("phone", "c2", "mobile"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_to_attributes() {
        let res = to_attributes(
            &domain(),
            &[
                Claim::new("phone", "123"),
                Claim::new("username", "alice"),
                Claim::new("email", "alice@x.com"),
            ],
        )
        .unwrap();
        assert_eq!(2, res.len());
        assert_eq!("c1", res[0].0.connector_id());
        assert_eq!(
            vec![
                Attribute::new("uid", "alice"),
                Attribute::new("mail", "alice@x.com")
            ],
            res[0].1
        );
        assert_eq!("c2", res[1].0.connector_id());
        assert_eq!(vec![Attribute::new("mobile", "123")], res[1].1);
    }

    #[test]
    fn test_to_attributes_unsupported() {
        match to_attributes(
            &domain(),
            &[Claim::new("username", "alice"), Claim::new("country", "DE")],
        ) {
            Err(ClaimError::ClaimNotSupported { claim_uri, domain }) => {
                assert_eq!("country", claim_uri);
                assert_eq!("PRIMARY", domain);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_to_claims_drops_unmapped() {
        let claims = to_claims(
            &domain(),
            "c1",
            &[
                Attribute::new("uid", "alice"),
                Attribute::new("objectClass", "person"),
            ],
        );
        assert_eq!(vec![Claim::new("username", "alice")], claims);
    }

    #[test]
    fn test_to_attribute_names() {
        let res = to_attribute_names(&domain(), &[MetaClaim::new("email")]).unwrap();
        assert_eq!(1, res.len());
        assert_eq!(vec!["mail".to_string()], res[0].1);
        assert!(to_attribute_names(&domain(), &[MetaClaim::new("country")]).is_err());
    }
}
