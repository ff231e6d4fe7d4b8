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
//! # Unique id resolver
//!
//! The resolver is the sole authority over the mapping between the global id
//! of a federated user or group and the partitions (connector id + connector
//! local id) holding its data.
//!
//! Writes of the resolver are atomic. Adding a user persists the user record
//! with all its partitions or nothing. Group memberships and the account
//! state are resolver level metadata and are never pushed to the connectors.
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub mod backend;
pub mod error;
pub mod types;

use crate::common::UserState;
use crate::config::Config;
use crate::plugin_manager::PluginManager;
use crate::service::ServiceState;
use crate::unique_id::backend::{UniqueIdBackend, memory::InMemoryBackend, sql::SqlBackend};

pub use error::UniqueIdProviderError;
pub use types::*;

#[derive(Clone)]
pub struct UniqueIdResolverProvider {
    backend_driver: Arc<dyn UniqueIdBackend>,
    /// State of the newly added users.
    initial_state: UserState,
}

impl UniqueIdResolverProvider {
    pub fn new(
        config: &Config,
        plugin_manager: &PluginManager,
    ) -> Result<Self, UniqueIdProviderError> {
        let backend_driver: Arc<dyn UniqueIdBackend> = if let Some(driver) =
            plugin_manager.get_unique_id_backend(config.unique_id.driver.clone())
        {
            driver.clone()
        } else {
            match config.unique_id.driver.as_str() {
                "sql" => Arc::new(SqlBackend::default()),
                "memory" => Arc::new(InMemoryBackend::default()),
                _ => {
                    return Err(UniqueIdProviderError::UnsupportedDriver(
                        config.unique_id.driver.clone(),
                    ));
                }
            }
        };
        Ok(Self {
            backend_driver,
            initial_state: config.user_state.initial_state,
        })
    }

    fn new_user(&self, partitions: Vec<Partition>, domain: &str) -> Result<UniqueUser, UniqueIdProviderError> {
        if partitions.is_empty() {
            return Err(UniqueIdProviderError::NoPartitions);
        }
        Ok(UniqueUser {
            id: Uuid::new_v4().simple().to_string(),
            domain: domain.into(),
            state: self.initial_state,
            partitions,
        })
    }
}

impl std::fmt::Debug for UniqueIdResolverProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueIdResolverProvider")
            .field("initial_state", &self.initial_state)
            .finish()
    }
}

#[async_trait]
impl UniqueIdResolverApi for UniqueIdResolverProvider {
    /// Register new user.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn add_user<'a>(
        &self,
        state: &ServiceState,
        partitions: Vec<Partition>,
        domain: &'a str,
    ) -> Result<UniqueUser, UniqueIdProviderError> {
        let user = self.new_user(partitions, domain)?;
        self.backend_driver
            .create_users(state, vec![user.clone()])
            .await?;
        Ok(user)
    }

    /// Register new users.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn add_users<'a>(
        &self,
        state: &ServiceState,
        users: Vec<Vec<Partition>>,
        domain: &'a str,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError> {
        let users = users
            .into_iter()
            .map(|partitions| self.new_user(partitions, domain))
            .collect::<Result<Vec<_>, _>>()?;
        self.backend_driver
            .create_users(state, users.clone())
            .await?;
        Ok(users)
    }

    /// Get the user.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Option<UniqueUser>, UniqueIdProviderError> {
        self.backend_driver.get_user(state, user_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn resolve_user_by_connector_local_id<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        self.backend_driver
            .find_user_by_partition(state, connector_id, connector_local_id)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_user_partitions<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        if partitions.is_empty() {
            return Ok(());
        }
        self.backend_driver
            .upsert_user_partitions(state, user_id, partitions)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        self.backend_driver.delete_user(state, user_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_users<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError> {
        self.backend_driver
            .list_users(state, domain, offset, length)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn set_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), UniqueIdProviderError> {
        self.backend_driver
            .set_user_state(state, user_id, user_state)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn add_group<'a>(
        &self,
        state: &ServiceState,
        partitions: Vec<Partition>,
        domain: &'a str,
    ) -> Result<UniqueGroup, UniqueIdProviderError> {
        if partitions.is_empty() {
            return Err(UniqueIdProviderError::NoPartitions);
        }
        let group = UniqueGroup {
            id: Uuid::new_v4().simple().to_string(),
            domain: domain.into(),
            partitions,
        };
        self.backend_driver
            .create_group(state, group.clone())
            .await?;
        Ok(group)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Option<UniqueGroup>, UniqueIdProviderError> {
        self.backend_driver.get_group(state, group_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn resolve_group_by_connector_local_id<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        self.backend_driver
            .find_group_by_partition(state, connector_id, connector_local_id)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_group_partitions<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        if partitions.is_empty() {
            return Ok(());
        }
        self.backend_driver
            .upsert_group_partitions(state, group_id, partitions)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn delete_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        self.backend_driver.delete_group(state, group_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_groups<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueGroup>, UniqueIdProviderError> {
        self.backend_driver
            .list_groups(state, domain, offset, length)
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn is_user_in_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_id: &'a str,
    ) -> Result<bool, UniqueIdProviderError> {
        Ok(self
            .backend_driver
            .list_groups_of_user(state, user_id)
            .await?
            .iter()
            .any(|group| group == group_id))
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<BTreeSet<String>, UniqueIdProviderError> {
        Ok(BTreeSet::from_iter(
            self.backend_driver
                .list_groups_of_user(state, user_id)
                .await?,
        ))
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<BTreeSet<String>, UniqueIdProviderError> {
        Ok(BTreeSet::from_iter(
            self.backend_driver
                .list_users_of_group(state, group_id)
                .await?,
        ))
    }

    /// Set groups of the user.
    ///
    /// Only the difference to the current memberships is written.
    #[tracing::instrument(level = "info", skip(self, state))]
    async fn set_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_ids: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError> {
        let current = self.get_groups_of_user(state, user_id).await?;
        let remove = current.difference(&group_ids).cloned().collect();
        let add = group_ids.difference(&current).cloned().collect();
        self.update_groups_of_user(state, user_id, add, remove)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError> {
        let current = self.get_groups_of_user(state, user_id).await?;
        let mut target = current.clone();
        for group in remove.iter() {
            target.remove(group);
        }
        target.extend(add);

        let to_remove: Vec<(String, String)> = current
            .difference(&target)
            .map(|group| (user_id.to_string(), group.clone()))
            .collect();
        let to_add: Vec<(String, String)> = target
            .difference(&current)
            .map(|group| (user_id.to_string(), group.clone()))
            .collect();
        debug!(
            "user {} membership changes: +{:?} -{:?}",
            user_id, to_add, to_remove
        );
        if !to_remove.is_empty() {
            self.backend_driver
                .remove_memberships(state, to_remove)
                .await?;
        }
        if !to_add.is_empty() {
            self.backend_driver.add_memberships(state, to_add).await?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn set_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        user_ids: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError> {
        let current = self.get_users_of_group(state, group_id).await?;
        let remove = current.difference(&user_ids).cloned().collect();
        let add = user_ids.difference(&current).cloned().collect();
        self.update_users_of_group(state, group_id, add, remove)
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError> {
        let current = self.get_users_of_group(state, group_id).await?;
        let mut target = current.clone();
        for user in remove.iter() {
            target.remove(user);
        }
        target.extend(add);

        let to_remove: Vec<(String, String)> = current
            .difference(&target)
            .map(|user| (user.clone(), group_id.to_string()))
            .collect();
        let to_add: Vec<(String, String)> = target
            .difference(&current)
            .map(|user| (user.clone(), group_id.to_string()))
            .collect();
        if !to_remove.is_empty() {
            self.backend_driver
                .remove_memberships(state, to_remove)
                .await?;
        }
        if !to_add.is_empty() {
            self.backend_driver.add_memberships(state, to_add).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DatabaseConnection;
    use std::sync::Arc;

    use super::*;
    use crate::provider::Provider;
    use crate::service::Service;
    use crate::unique_id::backend::MockUniqueIdBackend;

    fn get_state() -> ServiceState {
        let config = Config::default();
        let provider = Provider::mocked_builder().build().unwrap();
        Arc::new(Service::new(config, DatabaseConnection::Disconnected, provider).unwrap())
    }

    fn provider_with(backend: MockUniqueIdBackend) -> UniqueIdResolverProvider {
        UniqueIdResolverProvider {
            backend_driver: Arc::new(backend),
            initial_state: UserState::Created,
        }
    }

    fn memory_provider() -> UniqueIdResolverProvider {
        UniqueIdResolverProvider {
            backend_driver: Arc::new(InMemoryBackend::default()),
            initial_state: UserState::LockedSelfSignUp,
        }
    }

    #[tokio::test]
    async fn test_add_user() {
        let state = get_state();
        let mut backend = MockUniqueIdBackend::default();
        backend
            .expect_create_users()
            .withf(|_, users: &Vec<UniqueUser>| {
                users.len() == 1
                    && users[0].domain == "PRIMARY"
                    && users[0].state == UserState::Created
                    && users[0].partitions.len() == 2
            })
            .returning(|_, _| Ok(()));
        let provider = provider_with(backend);

        let user = provider
            .add_user(
                &state,
                vec![
                    Partition::identity("c1", "l1"),
                    Partition::credential("k1", "l2"),
                ],
                "PRIMARY",
            )
            .await
            .unwrap();
        assert_eq!(32, user.id.len());
    }

    #[tokio::test]
    async fn test_add_user_no_partitions() {
        let state = get_state();
        let mut backend = MockUniqueIdBackend::default();
        backend.expect_create_users().never();
        let provider = provider_with(backend);

        assert!(matches!(
            provider.add_user(&state, Vec::new(), "PRIMARY").await,
            Err(UniqueIdProviderError::NoPartitions)
        ));
    }

    #[tokio::test]
    async fn test_unsupported_driver() {
        let mut config = Config::default();
        config.unique_id.driver = "ldap".into();
        assert!(matches!(
            UniqueIdResolverProvider::new(&config, &PluginManager::default()),
            Err(UniqueIdProviderError::UnsupportedDriver(..))
        ));
    }

    #[tokio::test]
    async fn test_builtin_drivers() {
        let mut config = Config::default();
        for driver in ["sql", "memory"] {
            config.unique_id.driver = driver.into();
            assert!(UniqueIdResolverProvider::new(&config, &PluginManager::default()).is_ok());
        }

        let mut plugin_manager = PluginManager::default();
        plugin_manager.register_unique_id_backend("custom", Arc::new(MockUniqueIdBackend::default()));
        config.unique_id.driver = "custom".into();
        assert!(UniqueIdResolverProvider::new(&config, &plugin_manager).is_ok());
    }

    #[tokio::test]
    async fn test_update_groups_of_user_diff() {
        let state = get_state();
        let mut backend = MockUniqueIdBackend::default();
        backend
            .expect_list_groups_of_user()
            .returning(|_, _| Ok(vec!["g1".into(), "g2".into()]));
        backend
            .expect_remove_memberships()
            .withf(|_, m: &Vec<(String, String)>| *m == vec![("u1".to_string(), "g1".to_string())])
            .times(1)
            .returning(|_, _| Ok(()));
        backend
            .expect_add_memberships()
            .withf(|_, m: &Vec<(String, String)>| *m == vec![("u1".to_string(), "g3".to_string())])
            .times(1)
            .returning(|_, _| Ok(()));
        let provider = provider_with(backend);

        provider
            .update_groups_of_user(
                &state,
                "u1",
                BTreeSet::from(["g2".to_string(), "g3".to_string()]),
                BTreeSet::from(["g1".to_string(), "g4".to_string()]),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_groups_of_user_idempotent() {
        let state = get_state();
        let provider = memory_provider();
        let user = provider
            .add_user(&state, vec![Partition::identity("c1", "u")], "PRIMARY")
            .await
            .unwrap();
        let group = provider
            .add_group(&state, vec![Partition::identity("c1", "g")], "PRIMARY")
            .await
            .unwrap();

        let add = BTreeSet::from([group.id.clone()]);
        provider
            .update_groups_of_user(&state, &user.id, add.clone(), BTreeSet::new())
            .await
            .unwrap();
        let once = provider.get_groups_of_user(&state, &user.id).await.unwrap();
        provider
            .update_groups_of_user(&state, &user.id, add, BTreeSet::new())
            .await
            .unwrap();
        assert_eq!(
            once,
            provider.get_groups_of_user(&state, &user.id).await.unwrap()
        );

        provider
            .update_groups_of_user(
                &state,
                &user.id,
                BTreeSet::new(),
                BTreeSet::from(["absent".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(
            once,
            provider.get_groups_of_user(&state, &user.id).await.unwrap()
        );
        assert!(
            provider
                .is_user_in_group(&state, &user.id, &group.id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_add_users_is_atomic() {
        let state = get_state();
        let provider = memory_provider();
        provider
            .add_user(&state, vec![Partition::identity("c1", "taken")], "PRIMARY")
            .await
            .unwrap();

        assert!(matches!(
            provider
                .add_users(
                    &state,
                    vec![
                        vec![
                            Partition::identity("c1", "fresh"),
                            Partition::credential("k1", "fresh"),
                        ],
                        vec![Partition::identity("c1", "taken")],
                    ],
                    "PRIMARY",
                )
                .await,
            Err(UniqueIdProviderError::Conflict(..))
        ));
        assert!(
            provider
                .resolve_user_by_connector_local_id(&state, "c1", "fresh")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            provider
                .resolve_user_by_connector_local_id(&state, "k1", "fresh")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            1,
            provider.list_users(&state, "PRIMARY", 0, 10).await.unwrap().len()
        );
    }

    #[tokio::test]
    async fn test_partition_upsert() {
        let state = get_state();
        let provider = memory_provider();
        let user = provider
            .add_user(&state, vec![Partition::identity("c1", "l1")], "PRIMARY")
            .await
            .unwrap();
        assert_eq!(UserState::LockedSelfSignUp, user.state);

        provider
            .update_user_partitions(
                &state,
                &user.id,
                vec![
                    Partition::identity("c1", "l1-renamed"),
                    Partition::identity("c2", "l2"),
                ],
            )
            .await
            .unwrap();
        let stored = provider.get_user(&state, &user.id).await.unwrap().unwrap();
        assert_eq!(
            vec![
                Partition::identity("c1", "l1-renamed"),
                Partition::identity("c2", "l2"),
            ],
            stored.partitions
        );

        provider.delete_user(&state, &user.id).await.unwrap();
        assert!(provider.get_user(&state, &user.id).await.unwrap().is_none());
        assert!(matches!(
            provider.delete_user(&state, &user.id).await,
            Err(UniqueIdProviderError::UserNotFound(..))
        ));
    }
}
