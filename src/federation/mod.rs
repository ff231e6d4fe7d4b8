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
//! # Federation coordinator
//!
//! Orchestrates the user and group operations over the connectors of a
//! domain and records the resulting partitions in the unique id resolver.
//!
//! Connectors are not transactional. When one step of a multi-connector
//! write fails, the connectors which already succeeded are compensated
//! through their `remove_added_*_in_a_failure` operations. The resolver write
//! always happens last, so the resolver never references data which failed
//! to land in a connector.
//!
//! Every public operation is wrapped by the interceptor chain.
use async_trait::async_trait;
use std::collections::BTreeSet;

pub mod error;
pub(crate) mod group;
pub(crate) mod membership;
pub mod types;
pub(crate) mod user;

use crate::claim::{Claim, MetaClaim};
use crate::common::UserState;
use crate::connector::Credential;
use crate::interceptor::Operation;
use crate::service::ServiceState;

pub use error::FederationProviderError;
pub use types::*;

#[derive(Clone, Debug, Default)]
pub struct FederationCoordinator {}

#[async_trait]
impl FederationApi for FederationCoordinator {
    #[tracing::instrument(level = "info", skip(self, state, user))]
    async fn add_user<'a>(
        &self,
        state: &ServiceState,
        user: UserCreate,
        domain: Option<&'a str>,
    ) -> Result<User, FederationProviderError> {
        let claims = user.claims.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::AddUser {
                    claims: &claims,
                    domain,
                },
                user::add_user(state, user, domain),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, users))]
    async fn add_users<'a>(
        &self,
        state: &ServiceState,
        users: Vec<UserCreate>,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::AddUsers {
                    count: users.len(),
                    domain,
                },
                user::add_users(state, users, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<User, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetUser { user_id },
                user::get_user(state, user_id),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user_by_claim<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        domain: Option<&'a str>,
    ) -> Result<User, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetUserByClaim { claim, domain },
                user::get_user_by_claim(state, claim, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_users<'a>(
        &self,
        state: &ServiceState,
        claim: Option<&'a Claim>,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::ListUsers {
                    claim,
                    offset,
                    length,
                    domain,
                },
                user::list_users(state, claim, offset, length, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_users_by_pattern<'a>(
        &self,
        state: &ServiceState,
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::ListUsersByPattern {
                    meta_claim,
                    pattern,
                    offset,
                    length,
                    domain,
                },
                user::list_users_by_pattern(state, meta_claim, pattern, offset, length, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_claims_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    ) -> Result<Vec<Claim>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetClaimsOfUser {
                    user_id,
                    meta_claims,
                },
                user::get_claims_of_user(state, user_id, meta_claims),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, claims))]
    async fn update_user_claims_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        claims: Vec<Claim>,
    ) -> Result<(), FederationProviderError> {
        let operation_claims = claims.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUserClaimsPut {
                    user_id,
                    claims: &operation_claims,
                },
                user::update_user_claims_put(state, user_id, claims),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, add, remove))]
    async fn update_user_claims_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: Vec<Claim>,
        remove: Vec<Claim>,
    ) -> Result<(), FederationProviderError> {
        let (operation_add, operation_remove) = (add.clone(), remove.clone());
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUserClaimsPatch {
                    user_id,
                    add: &operation_add,
                    remove: &operation_remove,
                },
                user::update_user_claims_patch(state, user_id, add, remove),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, credentials))]
    async fn update_user_credentials_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        credentials: Vec<Credential>,
    ) -> Result<(), FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUserCredentialsPut { user_id },
                user::update_user_credentials_put(state, user_id, credentials),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, add, remove))]
    async fn update_user_credentials_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: Vec<Credential>,
        remove: Vec<Credential>,
    ) -> Result<(), FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUserCredentialsPatch { user_id },
                user::update_user_credentials_patch(state, user_id, add, remove),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::DeleteUser { user_id },
                user::delete_user(state, user_id),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, group))]
    async fn add_group<'a>(
        &self,
        state: &ServiceState,
        group: GroupCreate,
        domain: Option<&'a str>,
    ) -> Result<Group, FederationProviderError> {
        let claims = group.claims.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::AddGroup {
                    claims: &claims,
                    domain,
                },
                group::add_group(state, group, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Group, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetGroup { group_id },
                group::get_group(state, group_id),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_group_by_claim<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        domain: Option<&'a str>,
    ) -> Result<Group, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetGroupByClaim { claim, domain },
                group::get_group_by_claim(state, claim, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn list_groups<'a>(
        &self,
        state: &ServiceState,
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<Group>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::ListGroups {
                    meta_claim,
                    pattern,
                    offset,
                    length,
                    domain,
                },
                group::list_groups(state, meta_claim, pattern, offset, length, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_claims_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    ) -> Result<Vec<Claim>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetClaimsOfGroup {
                    group_id,
                    meta_claims,
                },
                group::get_claims_of_group(state, group_id, meta_claims),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, claims))]
    async fn update_group_claims_put<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        claims: Vec<Claim>,
    ) -> Result<(), FederationProviderError> {
        let operation_claims = claims.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateGroupClaimsPut {
                    group_id,
                    claims: &operation_claims,
                },
                group::update_group_claims_put(state, group_id, claims),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state, add, remove))]
    async fn update_group_claims_patch<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: Vec<Claim>,
        remove: Vec<Claim>,
    ) -> Result<(), FederationProviderError> {
        let (operation_add, operation_remove) = (add.clone(), remove.clone());
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateGroupClaimsPatch {
                    group_id,
                    add: &operation_add,
                    remove: &operation_remove,
                },
                group::update_group_claims_patch(state, group_id, add, remove),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn delete_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::DeleteGroup { group_id },
                group::delete_group(state, group_id),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn is_user_in_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_id: &'a str,
    ) -> Result<bool, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::IsUserInGroup { user_id, group_id },
                membership::is_user_in_group(state, user_id, group_id),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Vec<Group>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetGroupsOfUser { user_id },
                membership::get_groups_of_user(state, user_id),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Vec<User>, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetUsersOfGroup { group_id },
                membership::get_users_of_group(state, group_id),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_groups_of_user_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_ids: BTreeSet<String>,
    ) -> Result<(), FederationProviderError> {
        let operation_ids = group_ids.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateGroupsOfUserPut {
                    user_id,
                    group_ids: &operation_ids,
                },
                membership::update_groups_of_user_put(state, user_id, group_ids),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_groups_of_user_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), FederationProviderError> {
        let (operation_add, operation_remove) = (add.clone(), remove.clone());
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateGroupsOfUserPatch {
                    user_id,
                    add: &operation_add,
                    remove: &operation_remove,
                },
                membership::update_groups_of_user_patch(state, user_id, add, remove),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_users_of_group_put<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        user_ids: BTreeSet<String>,
    ) -> Result<(), FederationProviderError> {
        let operation_ids = user_ids.clone();
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUsersOfGroupPut {
                    group_id,
                    user_ids: &operation_ids,
                },
                membership::update_users_of_group_put(state, group_id, user_ids),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn update_users_of_group_patch<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), FederationProviderError> {
        let (operation_add, operation_remove) = (add.clone(), remove.clone());
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::UpdateUsersOfGroupPatch {
                    group_id,
                    add: &operation_add,
                    remove: &operation_remove,
                },
                membership::update_users_of_group_patch(state, group_id, add, remove),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<UserState, FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::GetUserState { user_id },
                user::get_user_state(state, user_id),
            )
            .await
    }

    #[tracing::instrument(level = "info", skip(self, state))]
    async fn set_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), FederationProviderError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::SetUserState {
                    user_id,
                    state: user_state,
                },
                user::set_user_state(state, user_id, user_state),
            )
            .await
    }
}
