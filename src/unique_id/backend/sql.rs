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

mod group;
mod membership;
mod user;

use crate::common::UserState;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdProviderError;
use crate::unique_id::backend::UniqueIdBackend;
use crate::unique_id::types::*;

#[derive(Default)]
pub struct SqlBackend {}

#[async_trait]
impl UniqueIdBackend for SqlBackend {
    /// Persist new users.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn create_users(
        &self,
        state: &ServiceState,
        users: Vec<UniqueUser>,
    ) -> Result<(), UniqueIdProviderError> {
        user::create(&state.db, users).await
    }

    /// Get single user by ID.
    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Option<UniqueUser>, UniqueIdProviderError> {
        user::get(&state.db, user_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn find_user_by_partition<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        user::find_by_partition(&state.db, connector_id, connector_local_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn upsert_user_partitions<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        user::upsert_partitions(&state.db, user_id, partitions).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        user::delete(&state.db, user_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_users<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueUser>, UniqueIdProviderError> {
        user::list(&state.db, domain, offset, length).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn set_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), UniqueIdProviderError> {
        user::set_state(&state.db, user_id, user_state).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn create_group(
        &self,
        state: &ServiceState,
        group: UniqueGroup,
    ) -> Result<(), UniqueIdProviderError> {
        group::create(&state.db, group).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Option<UniqueGroup>, UniqueIdProviderError> {
        group::get(&state.db, group_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn find_group_by_partition<'a>(
        &self,
        state: &ServiceState,
        connector_id: &'a str,
        connector_local_id: &'a str,
    ) -> Result<Option<String>, UniqueIdProviderError> {
        group::find_by_partition(&state.db, connector_id, connector_local_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn upsert_group_partitions<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        partitions: Vec<Partition>,
    ) -> Result<(), UniqueIdProviderError> {
        group::upsert_partitions(&state.db, group_id, partitions).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn delete_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), UniqueIdProviderError> {
        group::delete(&state.db, group_id).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_groups<'a>(
        &self,
        state: &ServiceState,
        domain: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<UniqueGroup>, UniqueIdProviderError> {
        group::list(&state.db, domain, offset, length).await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError> {
        Ok(membership::list_groups_of_user(&state.db, user_id).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Vec<String>, UniqueIdProviderError> {
        Ok(membership::list_users_of_group(&state.db, group_id).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn add_memberships(
        &self,
        state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError> {
        Ok(membership::add(&state.db, memberships).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn remove_memberships(
        &self,
        state: &ServiceState,
        memberships: Vec<(String, String)>,
    ) -> Result<(), UniqueIdProviderError> {
        Ok(membership::remove(&state.db, memberships).await?)
    }
}
