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
//! Unique id resolver backends.
use async_trait::async_trait;

pub mod memory;
pub mod sql;

use crate::common::UserState;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdProviderError;
use crate::unique_id::types::*;

/// Unique id resolver backend interface.
///
/// Every write method is atomic: it either persists all rows or none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UniqueIdBackend: Send + Sync {
    /// Persist new users with their partitions.
    async fn create_users(
        &self,
        state: &ServiceState,
        users: Vec<UniqueUser>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Get single user by the global id.
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Option<UniqueUser>, UniqueIdProviderError>;

    /// Find the global id of the user by the partition.
    async fn find_user_by_partition<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError>;

    /// Insert missing and update existing partitions of the user.
    async fn upsert_user_partitions<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Delete the user, its partitions and memberships.
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), UniqueIdProviderError>;

    /// List users of the domain ordered by the global id.
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

    /// Persist new group with the partitions.
    async fn create_group(
        &self,
        state: &ServiceState,
        group: UniqueGroup,
    ) -> Result<(), UniqueIdProviderError>;

    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Option<UniqueGroup>, UniqueIdProviderError>;

    async fn find_group_by_partition<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError>;

    async fn upsert_group_partitions<'a>(
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

    /// Global ids of the groups the user is member of.
    async fn list_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError>;

    /// Global ids of the group members.
    async fn list_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError>;

    /// Add (user id, group id) memberships.
    async fn add_memberships(
        &self,
        state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError>;

    /// Remove (user id, group id) memberships.
    async fn remove_memberships(
        &self,
        state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError>;
}
