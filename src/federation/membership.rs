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
//! Group membership operations of the federation coordinator.
//!
//! Memberships are resolver level metadata and are never pushed to the
//! connectors. Every referenced user and group must exist.
use std::collections::BTreeSet;

use crate::federation::error::FederationProviderError;
use crate::federation::group::load_group;
use crate::federation::types::{Group, User};
use crate::federation::user::load_user;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdResolverApi;

async fn check_groups(
    state: &ServiceState,
    group_ids: &BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    for group_id in group_ids {
        load_group(state, group_id).await?;
    }
    Ok(())
}

async fn check_users(
    state: &ServiceState,
    user_ids: &BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    for user_id in user_ids {
        load_user(state, user_id).await?;
    }
    Ok(())
}

pub async fn is_user_in_group(
    state: &ServiceState,
    user_id: &str,
    group_id: &str,
) -> Result<bool, FederationProviderError> {
    load_user(state, user_id).await?;
    load_group(state, group_id).await?;
    Ok(state
        .provider
        .get_unique_id_provider()
        .is_user_in_group(state, user_id, group_id)
        .await?)
}

pub async fn get_groups_of_user(
    state: &ServiceState,
    user_id: &str,
) -> Result<Vec<Group>, FederationProviderError> {
    load_user(state, user_id).await?;
    let group_ids = state
        .provider
        .get_unique_id_provider()
        .get_groups_of_user(state, user_id)
        .await?;
    let mut groups = Vec::with_capacity(group_ids.len());
    for group_id in group_ids {
        groups.push(load_group(state, &group_id).await?.into());
    }
    Ok(groups)
}

pub async fn get_users_of_group(
    state: &ServiceState,
    group_id: &str,
) -> Result<Vec<User>, FederationProviderError> {
    load_group(state, group_id).await?;
    let user_ids = state
        .provider
        .get_unique_id_provider()
        .get_users_of_group(state, group_id)
        .await?;
    let mut users = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        users.push(load_user(state, &user_id).await?.into());
    }
    Ok(users)
}

pub async fn update_groups_of_user_put(
    state: &ServiceState,
    user_id: &str,
    group_ids: BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    load_user(state, user_id).await?;
    check_groups(state, &group_ids).await?;
    state
        .provider
        .get_unique_id_provider()
        .set_groups_of_user(state, user_id, group_ids)
        .await?;
    Ok(())
}

pub async fn update_groups_of_user_patch(
    state: &ServiceState,
    user_id: &str,
    add: BTreeSet<String>,
    remove: BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    load_user(state, user_id).await?;
    check_groups(state, &add).await?;
    state
        .provider
        .get_unique_id_provider()
        .update_groups_of_user(state, user_id, add, remove)
        .await?;
    Ok(())
}

pub async fn update_users_of_group_put(
    state: &ServiceState,
    group_id: &str,
    user_ids: BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    load_group(state, group_id).await?;
    check_users(state, &user_ids).await?;
    state
        .provider
        .get_unique_id_provider()
        .set_users_of_group(state, group_id, user_ids)
        .await?;
    Ok(())
}

pub async fn update_users_of_group_patch(
    state: &ServiceState,
    group_id: &str,
    add: BTreeSet<String>,
    remove: BTreeSet<String>,
) -> Result<(), FederationProviderError> {
    load_group(state, group_id).await?;
    check_users(state, &add).await?;
    state
        .provider
        .get_unique_id_provider()
        .update_users_of_group(state, group_id, add, remove)
        .await?;
    Ok(())
}
