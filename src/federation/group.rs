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
//! Group operations of the federation coordinator.
use std::sync::Arc;
use tracing::{debug, warn};
use validator::Validate;

use crate::claim::translator::{owner_of, to_attributes, to_claims};
use crate::claim::{Claim, MetaClaim};
use crate::connector::{ConnectorError, IdentityStoreConnector};
use crate::domain::Domain;
use crate::federation::error::FederationProviderError;
use crate::federation::types::{Group, GroupCreate};
use crate::federation::user::{
    entity_domain, identity_connector_of, take_attributes, target_domain, unmapped_attributes,
    wanted_attributes,
};
use crate::service::ServiceState;
use crate::unique_id::{Partition, UniqueGroup, UniqueIdProviderError, UniqueIdResolverApi};

pub(crate) async fn load_group(
    state: &ServiceState,
    group_id: &str,
) -> Result<UniqueGroup, FederationProviderError> {
    state
        .provider
        .get_unique_id_provider()
        .get_group(state, group_id)
        .await?
        .ok_or_else(|| FederationProviderError::GroupNotFound(group_id.into()))
}

async fn compensate_groups(added: &[(Arc<dyn IdentityStoreConnector>, String)]) {
    for (connector, local_id) in added.iter().rev() {
        if let Err(err) = connector
            .remove_added_groups_in_a_failure(std::slice::from_ref(local_id))
            .await
        {
            warn!(
                "failed to remove group {} from {} after a failed write: {}",
                local_id,
                connector.connector_id(),
                err
            );
        }
    }
}

pub async fn add_group(
    state: &ServiceState,
    group: GroupCreate,
    domain: Option<&str>,
) -> Result<Group, FederationProviderError> {
    group.validate()?;
    let domain = target_domain(state, domain)?;
    let grouped = to_attributes(domain, &group.claims)?;

    let mut added: Vec<(Arc<dyn IdentityStoreConnector>, String)> = Vec::new();
    for (connector, attributes) in grouped {
        match connector.add_group(attributes).await {
            Ok(local_id) => added.push((connector, local_id)),
            Err(source) => {
                compensate_groups(&added).await;
                return Err(FederationProviderError::connector(
                    "add group",
                    domain.name(),
                    connector.connector_id(),
                )(source));
            }
        }
    }

    let partitions = added
        .iter()
        .map(|(connector, local_id)| Partition::identity(connector.connector_id(), local_id))
        .collect();
    match state
        .provider
        .get_unique_id_provider()
        .add_group(state, partitions, domain.name())
        .await
    {
        Ok(unique) => {
            debug!("added group {} to the domain {}", unique.id, domain.name());
            Ok(unique.into())
        }
        Err(err) => {
            compensate_groups(&added).await;
            Err(err.into())
        }
    }
}

pub async fn get_group(
    state: &ServiceState,
    group_id: &str,
) -> Result<Group, FederationProviderError> {
    Ok(load_group(state, group_id).await?.into())
}

async fn resolve_or_register(
    state: &ServiceState,
    domain: &Domain,
    connector_id: &str,
    local_id: &str,
) -> Result<Group, FederationProviderError> {
    let resolver = state.provider.get_unique_id_provider();
    if let Some(group_id) = resolver
        .resolve_group_by_connector_local_id(state, connector_id, local_id)
        .await?
    {
        return get_group(state, &group_id).await;
    }
    debug!(
        "registering group {} of {} seen for the first time",
        local_id, connector_id
    );
    match resolver
        .add_group(
            state,
            vec![Partition::identity(connector_id, local_id)],
            domain.name(),
        )
        .await
    {
        Ok(group) => Ok(group.into()),
        // Registered by a concurrent lookup in the meantime.
        Err(UniqueIdProviderError::Conflict(message)) => {
            debug!(
                "group {} of {} got registered concurrently: {}",
                local_id, connector_id, message
            );
            let group_id = resolver
                .resolve_group_by_connector_local_id(state, connector_id, local_id)
                .await?
                .ok_or_else(|| FederationProviderError::GroupNotFound(local_id.into()))?;
            get_group(state, &group_id).await
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn get_group_by_claim(
    state: &ServiceState,
    claim: &Claim,
    domain: Option<&str>,
) -> Result<Group, FederationProviderError> {
    let mut supported = false;
    for candidate in state
        .provider
        .get_domain_registry()
        .candidate_domains(domain)?
    {
        let Ok((connector, mapping)) = owner_of(candidate, &claim.claim_uri) else {
            continue;
        };
        supported = true;
        if let Some(local_id) = connector
            .get_connector_group_id(&mapping.attribute_name, &claim.value)
            .await
            .map_err(FederationProviderError::connector(
                "get group by claim",
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
    Err(FederationProviderError::GroupNotFound(format!(
        "{}={}",
        claim.claim_uri, claim.value
    )))
}

/// Groups with the claim value matching the `*` pattern.
pub async fn list_groups(
    state: &ServiceState,
    meta_claim: &MetaClaim,
    pattern: &str,
    offset: usize,
    length: usize,
    domain: Option<&str>,
) -> Result<Vec<Group>, FederationProviderError> {
    let mut groups = Vec::new();
    let mut supported = false;
    for candidate in state
        .provider
        .get_domain_registry()
        .candidate_domains(domain)?
    {
        let Ok((connector, mapping)) = owner_of(candidate, &meta_claim.claim_uri) else {
            continue;
        };
        supported = true;
        let local_ids = connector
            .list_connector_group_ids_by_pattern(&mapping.attribute_name, pattern, offset, length)
            .await
            .map_err(FederationProviderError::connector(
                "list groups",
                candidate.name(),
                &meta_claim.claim_uri,
            ))?;
        for local_id in local_ids {
            groups.push(
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
    Ok(groups)
}

pub async fn get_claims_of_group(
    state: &ServiceState,
    group_id: &str,
    meta_claims: Option<&[MetaClaim]>,
) -> Result<Vec<Claim>, FederationProviderError> {
    let group = load_group(state, group_id).await?;
    let domain = entity_domain(state, &group.domain)?;
    let wanted = wanted_attributes(domain, meta_claims)?;

    let mut claims = Vec::new();
    for partition in &group.partitions {
        let connector = identity_connector_of(state, domain, partition, "get claims", group_id)?;
        let names = match &wanted {
            Some(wanted) => match wanted.get(&partition.connector_id) {
                Some(names) => Some(names.as_slice()),
                None => continue,
            },
            None => None,
        };
        let attributes = connector
            .get_group_attribute_values(&partition.connector_local_id, names)
            .await
            .map_err(FederationProviderError::connector(
                "get claims",
                domain.name(),
                group_id,
            ))?;
        claims.extend(to_claims(domain, &partition.connector_id, &attributes));
    }
    Ok(claims)
}

pub async fn update_group_claims_put(
    state: &ServiceState,
    group_id: &str,
    claims: Vec<Claim>,
) -> Result<(), FederationProviderError> {
    let group = load_group(state, group_id).await?;
    let domain = entity_domain(state, &group.domain)?;
    let mut grouped = to_attributes(domain, &claims)?;

    let mut changed = Vec::new();
    for partition in &group.partitions {
        let connector =
            identity_connector_of(state, domain, partition, "update claims", group_id)?;
        let current = connector
            .get_group_attribute_values(&partition.connector_local_id, None)
            .await
            .map_err(FederationProviderError::connector(
                "update claims",
                domain.name(),
                group_id,
            ))?;
        let mut attributes = take_attributes(&mut grouped, &partition.connector_id).unwrap_or_default();
        attributes.extend(unmapped_attributes(domain, &partition.connector_id, current));
        let local_id = connector
            .update_group_attributes_put(&partition.connector_local_id, attributes)
            .await
            .map_err(FederationProviderError::connector(
                "update claims",
                domain.name(),
                group_id,
            ))?;
        if local_id != partition.connector_local_id {
            changed.push(Partition::identity(&partition.connector_id, local_id));
        }
    }

    let mut added: Vec<(Arc<dyn IdentityStoreConnector>, String)> = Vec::new();
    let res = async {
        for (connector, attributes) in grouped {
            let local_id = connector
                .add_group(attributes)
                .await
                .map_err(FederationProviderError::connector(
                    "update claims",
                    domain.name(),
                    group_id,
                ))?;
            changed.push(Partition::identity(connector.connector_id(), &local_id));
            added.push((connector, local_id));
        }
        state
            .provider
            .get_unique_id_provider()
            .update_group_partitions(state, group_id, changed)
            .await?;
        Ok::<(), FederationProviderError>(())
    }
    .await;
    if res.is_err() {
        compensate_groups(&added).await;
    }
    res
}

pub async fn update_group_claims_patch(
    state: &ServiceState,
    group_id: &str,
    add: Vec<Claim>,
    remove: Vec<Claim>,
) -> Result<(), FederationProviderError> {
    let group = load_group(state, group_id).await?;
    let domain = entity_domain(state, &group.domain)?;
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
                FederationProviderError::connector("update claims", domain.name(), group_id);
            match group.partition(connector.connector_id()) {
                Some(partition) => {
                    let local_id = connector
                        .update_group_attributes_patch(
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
                    if let Some(add) = add {
                        let local_id = connector.add_group(add).await.map_err(map_err)?;
                        changed.push(Partition::identity(connector.connector_id(), &local_id));
                        added.push((connector.clone(), local_id));
                    }
                }
            }
        }
        state
            .provider
            .get_unique_id_provider()
            .update_group_partitions(state, group_id, changed)
            .await?;
        Ok::<(), FederationProviderError>(())
    }
    .await;
    if res.is_err() {
        compensate_groups(&added).await;
    }
    res
}

pub async fn delete_group(
    state: &ServiceState,
    group_id: &str,
) -> Result<(), FederationProviderError> {
    let group = load_group(state, group_id).await?;
    let domain = entity_domain(state, &group.domain)?;

    for partition in &group.partitions {
        match identity_connector_of(state, domain, partition, "delete group", group_id)?
            .delete_group(&partition.connector_local_id)
            .await
        {
            Ok(()) => {}
            Err(ConnectorError::EntityNotFound(local_id)) => {
                debug!(
                    "group {} is already gone from {}",
                    local_id, partition.connector_id
                );
            }
            Err(source) => {
                return Err(FederationProviderError::connector(
                    "delete group",
                    domain.name(),
                    group_id,
                )(source));
            }
        }
    }

    state
        .provider
        .get_unique_id_provider()
        .delete_group(state, group_id)
        .await?;
    Ok(())
}
