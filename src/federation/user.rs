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
//! User operations of the federation coordinator.
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

use crate::claim::translator::{owner_of, to_attribute_names, to_attributes, to_claims};
use crate::claim::{Claim, MetaClaim};
use crate::common::UserState;
use crate::connector::{
    Attribute, ConnectorError, Credential, CredentialStoreConnector, IdentityStoreConnector,
};
use crate::domain::Domain;
use crate::federation::error::FederationProviderError;
use crate::federation::types::{User, UserCreate};
use crate::service::ServiceState;
use crate::unique_id::{Partition, UniqueIdProviderError, UniqueIdResolverApi, UniqueUser};

/// Domain the write operation runs in.
pub(crate) fn target_domain<'a>(
    state: &'a ServiceState,
    domain: Option<&str>,
) -> Result<&'a Domain, FederationProviderError> {
    let registry = state.provider.get_domain_registry();
    Ok(match domain {
        Some(name) => registry.resolve_domain(name)?,
        None => registry.primary_domain(),
    })
}

/// Domain of the resolver record.
pub(crate) fn entity_domain<'a>(
    state: &'a ServiceState,
    name: &str,
) -> Result<&'a Domain, FederationProviderError> {
    Ok(state.provider.get_domain_registry().resolve_domain(name)?)
}

/// The connector of the partition must be registered in the domain of the
/// entity owning the partition.
fn check_partition(
    state: &ServiceState,
    domain: &Domain,
    partition: &Partition,
    operation: &str,
    entity: &str,
) -> Result<(), FederationProviderError> {
    let source = match state
        .provider
        .get_domain_registry()
        .domain_of_connector(&partition.connector_id)
    {
        Some(owner) if owner.name() == domain.name() => return Ok(()),
        Some(owner) => ConnectorError::ResolverInconsistency {
            connector_id: partition.connector_id.clone(),
            domain: owner.name().into(),
        },
        None => ConnectorError::UnknownConnector {
            connector_id: partition.connector_id.clone(),
        },
    };
    warn!(
        "resolver record of {} is inconsistent with the domain {}: {}",
        entity,
        domain.name(),
        source
    );
    Err(FederationProviderError::connector(operation, domain.name(), entity)(source))
}

/// Identity connector of the partition.
pub(crate) fn identity_connector_of<'a>(
    state: &'a ServiceState,
    domain: &Domain,
    partition: &Partition,
    operation: &str,
    entity: &str,
) -> Result<&'a Arc<dyn IdentityStoreConnector>, FederationProviderError> {
    check_partition(state, domain, partition, operation, entity)?;
    state
        .provider
        .get_domain_registry()
        .find_identity_connector(&partition.connector_id)
        .ok_or_else(|| {
            FederationProviderError::connector(operation, domain.name(), entity)(
                ConnectorError::UnknownConnector {
                    connector_id: partition.connector_id.clone(),
                },
            )
        })
}

fn credential_connector_of<'a>(
    state: &'a ServiceState,
    domain: &Domain,
    partition: &Partition,
    operation: &str,
    entity: &str,
) -> Result<&'a Arc<dyn CredentialStoreConnector>, FederationProviderError> {
    check_partition(state, domain, partition, operation, entity)?;
    state
        .provider
        .get_domain_registry()
        .find_credential_connector(&partition.connector_id)
        .ok_or_else(|| {
            FederationProviderError::connector(operation, domain.name(), entity)(
                ConnectorError::UnknownConnector {
                    connector_id: partition.connector_id.clone(),
                },
            )
        })
}

/// Load the resolver record of the user.
pub(crate) async fn load_user(
    state: &ServiceState,
    user_id: &str,
) -> Result<UniqueUser, FederationProviderError> {
    state
        .provider
        .get_unique_id_provider()
        .get_user(state, user_id)
        .await?
        .ok_or_else(|| FederationProviderError::UserNotFound(user_id.into()))
}

/// Undo the identity store writes of a failed operation.
async fn compensate_users(added: &[(Arc<dyn IdentityStoreConnector>, String)]) {
    for (connector, local_id) in added.iter().rev() {
        if let Err(err) = connector
            .remove_added_users_in_a_failure(std::slice::from_ref(local_id))
            .await
        {
            warn!(
                "failed to remove user {} from {} after a failed write: {}",
                local_id,
                connector.connector_id(),
                err
            );
        }
    }
}

/// Undo the credential store writes of a failed operation.
async fn compensate_credentials(added: &[(Arc<dyn CredentialStoreConnector>, String)]) {
    for (connector, local_id) in added.iter().rev() {
        if let Err(err) = connector
            .remove_added_credentials_in_a_failure(std::slice::from_ref(local_id))
            .await
        {
            warn!(
                "failed to remove credentials {} from {} after a failed write: {}",
                local_id,
                connector.connector_id(),
                err
            );
        }
    }
}

pub async fn add_user(
    state: &ServiceState,
    user: UserCreate,
    domain: Option<&str>,
) -> Result<User, FederationProviderError> {
    user.validate()?;
    let domain = target_domain(state, domain)?;
    // Unsupported claims reject the request before any connector is called.
    let grouped = to_attributes(domain, &user.claims)?;

    let mut identities: Vec<(Arc<dyn IdentityStoreConnector>, String)> = Vec::new();
    for (connector, attributes) in grouped {
        match connector.add_user(attributes).await {
            Ok(local_id) => identities.push((connector, local_id)),
            Err(source) => {
                compensate_users(&identities).await;
                return Err(FederationProviderError::connector(
                    "add user",
                    domain.name(),
                    connector.connector_id(),
                )(source));
            }
        }
    }

    let mut credentials: Vec<(Arc<dyn CredentialStoreConnector>, String)> = Vec::new();
    if !user.credentials.is_empty() {
        let capable: Vec<&Arc<dyn CredentialStoreConnector>> = domain
            .credential_connectors()
            .iter()
            .filter(|connector| connector.can_store(&user.credentials))
            .collect();
        if capable.is_empty() {
            compensate_users(&identities).await;
            return Err(FederationProviderError::CredentialNotSupported(
                domain.name().into(),
            ));
        }
        for connector in capable {
            match connector.add_credential(user.credentials.clone()).await {
                Ok(local_id) => credentials.push((connector.clone(), local_id)),
                Err(source) => {
                    compensate_credentials(&credentials).await;
                    compensate_users(&identities).await;
                    return Err(FederationProviderError::connector(
                        "add credentials",
                        domain.name(),
                        connector.connector_id(),
                    )(source));
                }
            }
        }
    }

    let partitions: Vec<Partition> = identities
        .iter()
        .map(|(connector, local_id)| Partition::identity(connector.connector_id(), local_id))
        .chain(
            credentials
                .iter()
                .map(|(connector, local_id)| {
                    Partition::credential(connector.connector_id(), local_id)
                }),
        )
        .collect();

    match state
        .provider
        .get_unique_id_provider()
        .add_user(state, partitions, domain.name())
        .await
    {
        Ok(unique) => {
            debug!("added user {} to the domain {}", unique.id, domain.name());
            Ok(unique.into())
        }
        Err(err) => {
            compensate_credentials(&credentials).await;
            compensate_users(&identities).await;
            Err(err.into())
        }
    }
}

pub async fn add_users(
    state: &ServiceState,
    users: Vec<UserCreate>,
    domain: Option<&str>,
) -> Result<Vec<User>, FederationProviderError> {
    let mut added = Vec::with_capacity(users.len());
    for user in users {
        added.push(add_user(state, user, domain).await?);
    }
    Ok(added)
}

pub async fn get_user(state: &ServiceState, user_id: &str) -> Result<User, FederationProviderError> {
    Ok(load_user(state, user_id).await?.into())
}

/// Global user owning the connector local id. A user seen for the first time
/// is registered with the single partition.
async fn resolve_or_register(
    state: &ServiceState,
    domain: &Domain,
    connector_id: &str,
    local_id: &str,
) -> Result<User, FederationProviderError> {
    let resolver = state.provider.get_unique_id_provider();
    if let Some(user_id) = resolver
        .resolve_user_by_connector_local_id(state, connector_id, local_id)
        .await?
    {
        return get_user(state, &user_id).await;
    }
    debug!(
        "registering user {} of {} seen for the first time",
        local_id, connector_id
    );
    match resolver
        .add_user(
            state,
            vec![Partition::identity(connector_id, local_id)],
            domain.name(),
        )
        .await
    {
        Ok(user) => Ok(user.into()),
        // Registered by a concurrent lookup in the meantime.
        Err(UniqueIdProviderError::Conflict(message)) => {
            debug!(
                "user {} of {} got registered concurrently: {}",
                local_id, connector_id, message
            );
            let user_id = resolver
                .resolve_user_by_connector_local_id(state, connector_id, local_id)
                .await?
                .ok_or_else(|| FederationProviderError::UserNotFound(local_id.into()))?;
            get_user(state, &user_id).await
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn get_user_by_claim(
    state: &ServiceState,
    claim: &Claim,
    domain: Option<&str>,
) -> Result<User, FederationProviderError> {
    let registry = state.provider.get_domain_registry();
    let mut supported = false;
    for candidate in registry.candidate_domains(domain)? {
        let Ok((connector, mapping)) = owner_of(candidate, &claim.claim_uri) else {
            continue;
        };
        supported = true;
        if let Some(local_id) = connector
            .get_connector_user_id(&mapping.attribute_name, &claim.value)
            .await
            .map_err(FederationProviderError::connector(
                "get user by claim",
                candidate.name(),
                &claim.claim_uri,
            ))?
        {
            return resolve_or_register(state, candidate, connector.connector_id(), &local_id)
                .await;
        }
    }
    if !supported {
        return Err(FederationProviderError::claim_not_supported(
            &claim.claim_uri,
            domain,
        ));
    }
    Err(FederationProviderError::UserNotFound(format!(
        "{}={}",
        claim.claim_uri, claim.value
    )))
}

/// Users of the connector local ids found by a claim lookup.
async fn list_by_claim(
    state: &ServiceState,
    meta_claim: &MetaClaim,
    value: &str,
    exact: bool,
    offset: usize,
    length: usize,
    domain: Option<&str>,
) -> Result<Vec<User>, FederationProviderError> {
    let registry = state.provider.get_domain_registry();
    let mut users = Vec::new();
    let mut supported = false;
    for candidate in registry.candidate_domains(domain)? {
        let Ok((connector, mapping)) = owner_of(candidate, &meta_claim.claim_uri) else {
            continue;
        };
        supported = true;
        let local_ids = if exact {
            connector
                .list_connector_user_ids(&mapping.attribute_name, value, offset, length)
                .await
        } else {
            connector
                .list_connector_user_ids_by_pattern(&mapping.attribute_name, value, offset, length)
                .await
        }
        .map_err(FederationProviderError::connector(
            "list users",
            candidate.name(),
            &meta_claim.claim_uri,
        ))?;
        for local_id in local_ids {
            users.push(
                resolve_or_register(state, candidate, connector.connector_id(), &local_id).await?,
            );
        }
    }
    if !supported {
        return Err(FederationProviderError::claim_not_supported(
            &meta_claim.claim_uri,
            domain,
        ));
    }
    Ok(users)
}

pub async fn list_users(
    state: &ServiceState,
    claim: Option<&Claim>,
    offset: usize,
    length: usize,
    domain: Option<&str>,
) -> Result<Vec<User>, FederationProviderError> {
    if let Some(claim) = claim {
        return list_by_claim(
            state,
            &claim.meta_claim(),
            &claim.value,
            true,
            offset,
            length,
            domain,
        )
        .await;
    }
    let registry = state.provider.get_domain_registry();
    let resolver = state.provider.get_unique_id_provider();
    let mut users = Vec::new();
    for candidate in registry.candidate_domains(domain)? {
        users.extend(
            resolver
                .list_users(state, candidate.name(), offset, length)
                .await?
                .into_iter()
                .map(User::from),
        );
    }
    Ok(users)
}

pub async fn list_users_by_pattern(
    state: &ServiceState,
    meta_claim: &MetaClaim,
    pattern: &str,
    offset: usize,
    length: usize,
    domain: Option<&str>,
) -> Result<Vec<User>, FederationProviderError> {
    list_by_claim(state, meta_claim, pattern, false, offset, length, domain).await
}

/// Attribute names wanted from each connector, `None` for all of them.
pub(crate) fn wanted_attributes(
    domain: &Domain,
    meta_claims: Option<&[MetaClaim]>,
) -> Result<Option<HashMap<String, Vec<String>>>, FederationProviderError> {
    Ok(meta_claims
        .map(|meta_claims| to_attribute_names(domain, meta_claims))
        .transpose()?
        .map(|grouped| {
            grouped
                .into_iter()
                .map(|(connector, names)| (connector.connector_id().to_string(), names))
                .collect()
        }))
}

pub async fn get_claims_of_user(
    state: &ServiceState,
    user_id: &str,
    meta_claims: Option<&[MetaClaim]>,
) -> Result<Vec<Claim>, FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;
    let wanted = wanted_attributes(domain, meta_claims)?;

    let mut claims = Vec::new();
    for partition in user.identity_partitions() {
        let connector = identity_connector_of(state, domain, partition, "get claims", user_id)?;
        let names = match &wanted {
            Some(wanted) => match wanted.get(&partition.connector_id) {
                Some(names) => Some(names.as_slice()),
                None => continue,
            },
            None => None,
        };
        let attributes = connector
            .get_user_attribute_values(&partition.connector_local_id, names)
            .await
            .map_err(FederationProviderError::connector(
                "get claims",
                domain.name(),
                user_id,
            ))?;
        claims.extend(to_claims(domain, &partition.connector_id, &attributes));
    }
    Ok(claims)
}

/// Attributes of the connector taken out of the translated claims.
pub(crate) fn take_attributes(
    grouped: &mut Vec<(Arc<dyn IdentityStoreConnector>, Vec<Attribute>)>,
    connector_id: &str,
) -> Option<Vec<Attribute>> {
    grouped
        .iter()
        .position(|(connector, _)| connector.connector_id() == connector_id)
        .map(|idx| grouped.remove(idx).1)
}

/// Connector attributes no claim of the domain maps. A claim PUT leaves them
/// untouched.
pub(crate) fn unmapped_attributes(
    domain: &Domain,
    connector_id: &str,
    attributes: Vec<Attribute>,
) -> Vec<Attribute> {
    attributes
        .into_iter()
        .filter(|attribute| {
            domain
                .meta_claim_of(connector_id, &attribute.attribute_name)
                .is_none()
        })
        .collect()
}

pub async fn update_user_claims_put(
    state: &ServiceState,
    user_id: &str,
    claims: Vec<Claim>,
) -> Result<(), FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;
    let mut grouped = to_attributes(domain, &claims)?;

    let mut changed = Vec::new();
    for partition in user.identity_partitions() {
        let connector = identity_connector_of(state, domain, partition, "update claims", user_id)?;
        let current = connector
            .get_user_attribute_values(&partition.connector_local_id, None)
            .await
            .map_err(FederationProviderError::connector(
                "update claims",
                domain.name(),
                user_id,
            ))?;
        let mut attributes = take_attributes(&mut grouped, &partition.connector_id).unwrap_or_default();
        attributes.extend(unmapped_attributes(domain, &partition.connector_id, current));
        let local_id = connector
            .update_user_attributes_put(&partition.connector_local_id, attributes)
            .await
            .map_err(FederationProviderError::connector(
                "update claims",
                domain.name(),
                user_id,
            ))?;
        if local_id != partition.connector_local_id {
            changed.push(Partition::identity(&partition.connector_id, local_id));
        }
    }

    // Claims owned by connectors without a partition of the user.
    let mut added: Vec<(Arc<dyn IdentityStoreConnector>, String)> = Vec::new();
    let res = async {
        for (connector, attributes) in grouped {
            let local_id = connector
                .add_user(attributes)
                .await
                .map_err(FederationProviderError::connector(
                    "update claims",
                    domain.name(),
                    user_id,
                ))?;
            changed.push(Partition::identity(connector.connector_id(), &local_id));
            added.push((connector, local_id));
        }
        state
            .provider
            .get_unique_id_provider()
            .update_user_partitions(state, user_id, changed)
            .await?;
        Ok::<(), FederationProviderError>(())
    }
    .await;
    if res.is_err() {
        compensate_users(&added).await;
    }
    res
}

pub async fn update_user_claims_patch(
    state: &ServiceState,
    user_id: &str,
    add: Vec<Claim>,
    remove: Vec<Claim>,
) -> Result<(), FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;
    let mut to_add = to_attributes(domain, &add)?;
    let mut to_remove = to_attributes(domain, &remove)?;

    let mut added: Vec<(Arc<dyn IdentityStoreConnector>, String)> = Vec::new();
    let res = async {
        let mut changed = Vec::new();
        for connector in domain.identity_connectors() {
            let add = take_attributes(&mut to_add, connector.connector_id());
            let remove = take_attributes(&mut to_remove, connector.connector_id());
            if add.is_none() && remove.is_none() {
                continue;
            }
            let map_err =
                FederationProviderError::connector("update claims", domain.name(), user_id);
            match user.partition(connector.connector_id()) {
                Some(partition) => {
                    let local_id = connector
                        .update_user_attributes_patch(
                            &partition.connector_local_id,
                            add.unwrap_or_default(),
                            remove.unwrap_or_default(),
                        )
                        .await
                        .map_err(map_err)?;
                    if local_id != partition.connector_local_id {
                        changed.push(Partition::identity(connector.connector_id(), local_id));
                    }
                }
                None => {
                    // Nothing to remove from a connector not holding the user.
                    if let Some(add) = add {
                        let local_id = connector.add_user(add).await.map_err(map_err)?;
                        changed.push(Partition::identity(connector.connector_id(), &local_id));
                        added.push((connector.clone(), local_id));
                    }
                }
            }
        }
        state
            .provider
            .get_unique_id_provider()
            .update_user_partitions(state, user_id, changed)
            .await?;
        Ok::<(), FederationProviderError>(())
    }
    .await;
    if res.is_err() {
        compensate_users(&added).await;
    }
    res
}

/// Store credentials no partition of the user handles in a new capable
/// credential store connector.
async fn store_new_credentials(
    domain: &Domain,
    user: &UniqueUser,
    credentials: Vec<Credential>,
) -> Result<(Arc<dyn CredentialStoreConnector>, String), FederationProviderError> {
    let connector = domain
        .credential_connectors()
        .iter()
        .find(|connector| {
            user.partition(connector.connector_id()).is_none() && connector.can_store(&credentials)
        })
        .ok_or_else(|| FederationProviderError::CredentialNotSupported(domain.name().into()))?;
    let local_id = connector
        .add_credential(credentials)
        .await
        .map_err(FederationProviderError::connector(
            "update credentials",
            domain.name(),
            &user.id,
        ))?;
    Ok((connector.clone(), local_id))
}

/// Persist the changed credential partitions, undoing the new credential
/// store entries when the resolver refuses them.
async fn commit_credential_partitions(
    state: &ServiceState,
    user_id: &str,
    mut changed: Vec<Partition>,
    added: Option<(Arc<dyn CredentialStoreConnector>, String)>,
) -> Result<(), FederationProviderError> {
    let added: Vec<_> = added.into_iter().collect();
    changed.extend(
        added
            .iter()
            .map(|(connector, local_id)| Partition::credential(connector.connector_id(), local_id)),
    );
    if let Err(err) = state
        .provider
        .get_unique_id_provider()
        .update_user_partitions(state, user_id, changed)
        .await
    {
        compensate_credentials(&added).await;
        return Err(err.into());
    }
    Ok(())
}

pub async fn update_user_credentials_put(
    state: &ServiceState,
    user_id: &str,
    credentials: Vec<Credential>,
) -> Result<(), FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;

    let mut changed = Vec::new();
    let mut handled = false;
    for partition in user.credential_partitions() {
        let connector =
            credential_connector_of(state, domain, partition, "update credentials", user_id)?;
        if !connector.can_handle(&credentials) {
            continue;
        }
        handled = true;
        let local_id = connector
            .update_credentials_put(&partition.connector_local_id, credentials.clone())
            .await
            .map_err(FederationProviderError::connector(
                "update credentials",
                domain.name(),
                user_id,
            ))?;
        if local_id != partition.connector_local_id {
            changed.push(Partition::credential(&partition.connector_id, local_id));
        }
    }
    let added = if handled {
        None
    } else {
        Some(store_new_credentials(domain, &user, credentials).await?)
    };

    commit_credential_partitions(state, user_id, changed, added).await
}

pub async fn update_user_credentials_patch(
    state: &ServiceState,
    user_id: &str,
    add: Vec<Credential>,
    remove: Vec<Credential>,
) -> Result<(), FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;
    let kind_of = if add.is_empty() { &remove } else { &add };

    let mut changed = Vec::new();
    let mut handled = false;
    for partition in user.credential_partitions() {
        let connector =
            credential_connector_of(state, domain, partition, "update credentials", user_id)?;
        if !connector.can_handle(kind_of) {
            continue;
        }
        handled = true;
        let local_id = connector
            .update_credentials_patch(&partition.connector_local_id, add.clone(), remove.clone())
            .await
            .map_err(FederationProviderError::connector(
                "update credentials",
                domain.name(),
                user_id,
            ))?;
        if local_id != partition.connector_local_id {
            changed.push(Partition::credential(&partition.connector_id, local_id));
        }
    }
    let added = if !handled && !add.is_empty() {
        Some(store_new_credentials(domain, &user, add).await?)
    } else {
        None
    };

    commit_credential_partitions(state, user_id, changed, added).await
}

/// Delete the user from every partition, then from the resolver.
///
/// A partition already gone from its connector counts as deleted. Any other
/// connector failure keeps the resolver record so the deletion can be
/// retried.
pub async fn delete_user(state: &ServiceState, user_id: &str) -> Result<(), FederationProviderError> {
    let user = load_user(state, user_id).await?;
    let domain = entity_domain(state, &user.domain)?;

    for partition in &user.partitions {
        let res = if partition.identity_store {
            identity_connector_of(state, domain, partition, "delete user", user_id)?
                .delete_user(&partition.connector_local_id)
                .await
        } else {
            credential_connector_of(state, domain, partition, "delete user", user_id)?
                .delete_credential(&partition.connector_local_id)
                .await
        };
        match res {
            Ok(()) => {}
            Err(ConnectorError::EntityNotFound(local_id)) => {
                debug!(
                    "user {} is already gone from {}",
                    local_id, partition.connector_id
                );
            }
            Err(source) => {
                return Err(FederationProviderError::connector(
                    "delete user",
                    domain.name(),
                    user_id,
                )(source));
            }
        }
    }

    state
        .provider
        .get_unique_id_provider()
        .delete_user(state, user_id)
        .await?;
    Ok(())
}

pub async fn get_user_state(
    state: &ServiceState,
    user_id: &str,
) -> Result<UserState, FederationProviderError> {
    Ok(load_user(state, user_id).await?.state)
}

pub async fn set_user_state(
    state: &ServiceState,
    user_id: &str,
    user_state: UserState,
) -> Result<(), FederationProviderError> {
    state
        .provider
        .get_unique_id_provider()
        .set_user_state(state, user_id, user_state)
        .await?;
    Ok(())
}
