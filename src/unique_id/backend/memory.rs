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
//! In-memory unique id resolver backend.
//!
//! Every write takes the single store lock and validates the whole request
//! before mutating anything, which makes the writes atomic.
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use crate::common::UserState;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdProviderError;
use crate::unique_id::backend::UniqueIdBackend;
use crate::unique_id::types::*;

#[derive(Debug, Default)]
struct Store {
    users: BTreeMap<String, UniqueUser>,
    groups: BTreeMap<String, UniqueGroup>,
    /// (user id, group id)
    memberships: BTreeSet<(String, String)>,
}

impl Store {
    fn user_partition_owner(&self, partition: &Partition) -> Option<&str> {
        self.users
            .values()
            .find(|user| {
                user.partitions.iter().any(|p| {
                    p.connector_id == partition.connector_id
                        && p.connector_local_id == partition.connector_local_id
                })
            })
            .map(|user| user.id.as_str())
    }

    fn group_partition_owner(&self, partition: &Partition) -> Option<&str> {
        self.groups
            .values()
            .find(|group| {
                group.partitions.iter().any(|p| {
                    p.connector_id == partition.connector_id
                        && p.connector_local_id == partition.connector_local_id
                })
            })
            .map(|group| group.id.as_str())
    }
}

fn partition_conflict(partition: &Partition, owner: &str) -> UniqueIdProviderError {
    UniqueIdProviderError::Conflict(format!(
        "{}/{} already belongs to {}",
        partition.connector_id, partition.connector_local_id, owner
    ))
}

/// Replace the local id of the partitions of the same connector, append the
/// others.
fn merge_partitions(current: &mut Vec<Partition>, partitions: Vec<Partition>) {
    for partition in partitions {
        match current
            .iter_mut()
            .find(|p| p.connector_id == partition.connector_id)
        {
            Some(existing) => existing.connector_local_id = partition.connector_local_id,
            None => current.push(partition),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: RwLock<Store>,
}

#[async_trait]
impl UniqueIdBackend for InMemoryBackend {
    async fn create_users(
        &self,
        _state: &ServiceState,
        users: Vec<UniqueUser>,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        let mut seen: BTreeMap<(&str, &str), &str> = BTreeMap::new();
        for user in users.iter() {
            if store.users.contains_key(&user.id) {
                return Err(UniqueIdProviderError::Conflict(format!(
                    "user {} already exists",
                    user.id
                )));
            }
            for partition in user.partitions.iter() {
                if let Some(owner) = store.user_partition_owner(partition) {
                    return Err(partition_conflict(partition, owner));
                }
                let key = (
                    partition.connector_id.as_str(),
                    partition.connector_local_id.as_str(),
                );
                if let Some(owner) = seen.insert(key, user.id.as_str()) {
                    return Err(partition_conflict(partition, owner));
                }
            }
        }
        drop(seen);
        for user in users {
            store.users.insert(user.id.clone(), user);
        }
        Ok(())
    }

    async fn get_user<'a>(
        &self,
        _state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Option<UniqueUser>, UniqueIdProviderError> {
        Ok(self.store.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_partition<'a>(
        &self,
        _state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .user_partition_owner(&Partition::identity(connector_id, connector_local_id))
            .map(String::from))
    }

    async fn upsert_user_partitions<'a>(
        &self,
        _state: &ServiceState,
        user_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        for partition in partitions.iter() {
            if let Some(owner) = store.user_partition_owner(partition)
                && owner != user_id
            {
                return Err(partition_conflict(partition, owner));
            }
        }
        let user = store
            .users
            .get_mut(user_id)
            .ok_or_else(|| UniqueIdProviderError::UserNotFound(user_id.into()))?;
        merge_partitions(&mut user.partitions, partitions);
        Ok(())
    }

    async fn delete_user<'a>(
        &self,
        _state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        store
            .users
            .remove(user_id)
            .ok_or_else(|| UniqueIdProviderError::UserNotFound(user_id.into()))?;
        store.memberships.retain(|(user, _)| user != user_id);
        Ok(())
    }

    async fn list_users<'a>(
        &self,
        _state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .users
            .values()
            .filter(|user| user.domain == domain)
            .skip(offset)
            .take(length)
            .cloned()
            .collect())
    }

    async fn set_user_state<'a>(
        &self,
        _state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), UniqueIdProviderError> {
        self.store
            .write()
            .await
            .users
            .get_mut(user_id)
            .ok_or_else(|| UniqueIdProviderError::UserNotFound(user_id.into()))?
            .state = user_state;
        Ok(())
    }

    async fn create_group(
        &self,
        _state: &ServiceState,
        group: UniqueGroup,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        if store.groups.contains_key(&group.id) {
            return Err(UniqueIdProviderError::Conflict(format!(
                "group {} already exists",
                group.id
            )));
        }
        for partition in group.partitions.iter() {
            if let Some(owner) = store.group_partition_owner(partition) {
                return Err(partition_conflict(partition, owner));
            }
        }
        store.groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn get_group<'a>(
        &self,
        _state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Option<UniqueGroup>, UniqueIdProviderError> {
        Ok(self.store.read().await.groups.get(group_id).cloned())
    }

    async fn find_group_by_partition<'a>(
        &self,
        _state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .group_partition_owner(&Partition::identity(connector_id, connector_local_id))
            .map(String::from))
    }

    async fn upsert_group_partitions<'a>(
        &self,
        _state: &ServiceState,
        group_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        for partition in partitions.iter() {
            if let Some(owner) = store.group_partition_owner(partition)
                && owner != group_id
            {
                return Err(partition_conflict(partition, owner));
            }
        }
        let group = store
            .groups
            .get_mut(group_id)
            .ok_or_else(|| UniqueIdProviderError::GroupNotFound(group_id.into()))?;
        merge_partitions(&mut group.partitions, partitions);
        Ok(())
    }

    async fn delete_group<'a>(
        &self,
        _state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        store
            .groups
            .remove(group_id)
            .ok_or_else(|| UniqueIdProviderError::GroupNotFound(group_id.into()))?;
        store.memberships.retain(|(_, group)| group != group_id);
        Ok(())
    }

    async fn list_groups<'a>(
        &self,
        _state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueGroup>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .groups
            .values()
            .filter(|group| group.domain == domain)
            .skip(offset)
            .take(length)
            .cloned()
            .collect())
    }

    async fn list_groups_of_user<'a>(
        &self,
        _state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .memberships
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, group)| group.clone())
            .collect())
    }

    async fn list_users_of_group<'a>(
        &self,
        _state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError> {
        Ok(self
            .store
            .read()
            .await
            .memberships
            .iter()
            .filter(|(_, group)| group == group_id)
            .map(|(user, _)| user.clone())
            .collect())
    }

    async fn add_memberships(
        &self,
        _state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        for (user_id, group_id) in memberships.iter() {
            if !store.users.contains_key(user_id) {
                return Err(UniqueIdProviderError::UserNotFound(user_id.clone()));
            }
            if !store.groups.contains_key(group_id) {
                return Err(UniqueIdProviderError::GroupNotFound(group_id.clone()));
            }
        }
        store.memberships.extend(memberships);
        Ok(())
    }

    async fn remove_memberships(
        &self,
        _state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError> {
        let mut store = self.store.write().await;
        for membership in memberships.iter() {
            store.memberships.remove(membership);
        }
        Ok(())
    }
}
