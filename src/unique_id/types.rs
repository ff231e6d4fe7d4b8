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
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::common::UserState;
use crate::service::ServiceState;
use crate::unique_id::error::UniqueIdProviderError;

/// Location of one fragment of a federated entity.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Partition {
    /// Connector holding the fragment.
    pub connector_id: String,
    /// Id of the entity inside of the connector.
    pub connector_local_id: String,
    /// Whether the connector is an identity store (or a credential store).
    pub identity_store: bool,
}

impl Partition {
    /// Partition in an identity store connector.
    pub fn identity<C: Into<String>, L: Into<String>>(connector_id: C, local_id: L) -> Self {
        Self {
            connector_id: connector_id.into(),
            connector_local_id: local_id.into(),
            identity_store: true,
        }
    }

    /// Partition in a credential store connector.
    pub fn credential<C: Into<String>, L: Into<String>>(connector_id: C, local_id: L) -> Self {
        Self {
            connector_id: connector_id.into(),
            connector_local_id: local_id.into(),
            identity_store: false,
        }
    }
}

/// Federated user record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UniqueUser {
    /// Global id.
    pub id: String,
    /// Name of the domain the user belongs to.
    pub domain: String,
    /// Account state.
    pub state: UserState,
    /// Partitions in the insertion order.
    pub partitions: Vec<Partition>,
}

impl UniqueUser {
    /// Partitions in identity store connectors.
    pub fn identity_partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| p.identity_store)
    }

    /// Partitions in credential store connectors.
    pub fn credential_partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| !p.identity_store)
    }

    pub fn partition(&self, connector_id: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.connector_id == connector_id)
    }
}

/// Federated group record.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UniqueGroup {
    /// Global id.
    pub id: String,
    /// Name of the domain the group belongs to.
    pub domain: String,
    /// Partitions in the insertion order.
    pub partitions: Vec<Partition>,
}

impl UniqueGroup {
    pub fn partition(&self, connector_id: &str) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.connector_id == connector_id)
    }
}

/// Unique id resolver interface.
///
/// The resolver is the only place recording which connectors hold the
/// fragments of a federated entity. It never touches connector data.
#[async_trait]
pub trait UniqueIdResolverApi: Send + Sync {
    /// Register a new user with the partitions in one transaction.
    async fn add_user<'a>(
        &self,
        state: &ServiceState,
        partitions: Vec<Partition>,
        domain: &'a str,
    ) -> Result<UniqueUser, UniqueIdProviderError>;

    /// Register multiple users in one transaction.
    async fn add_users<'a>(
        &self,
        state: &ServiceState,
        users: Vec<Vec<Partition>>,
        domain: &'a str,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError>;

    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Option<UniqueUser>, UniqueIdProviderError>;

    /// Global id of the user owning the connector local id.
    async fn resolve_user_by_connector_local_id<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError>;

    /// Upsert partitions of the user by the connector id.
    async fn update_user_partitions<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Remove the user record together with its memberships.
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), UniqueIdProviderError>;

    /// List users of the domain.
    async fn list_users<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError>;

    async fn set_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), UniqueIdProviderError>;

    async fn add_group<'a>(
        &self,
        state: &ServiceState,
        partitions: Vec<Partition>,
        domain: &'a str,
    ) -> Result<UniqueGroup, UniqueIdProviderError>;

    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Option<UniqueGroup>, UniqueIdProviderError>;

    async fn resolve_group_by_connector_local_id<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError>;

    async fn update_group_partitions<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError>;

    async fn delete_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), UniqueIdProviderError>;

    async fn list_groups<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueGroup>, UniqueIdProviderError>;

    async fn is_user_in_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_id: &'a str,
    ) -> Result<bool, UniqueIdProviderError>;

    async fn get_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<BTreeSet<String>, UniqueIdProviderError>;

    async fn get_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<BTreeSet<String>, UniqueIdProviderError>;

    /// Replace the groups of the user.
    async fn set_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_ids: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Remove the user from the `remove` groups, then add it to the `add`
    /// ones. Existing memberships are not added again and absent ones are
    /// not removed.
    async fn update_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Replace the members of the group.
    async fn set_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        user_ids: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Remove the `remove` members, then add the `add` ones.
    async fn update_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), UniqueIdProviderError>;
}
