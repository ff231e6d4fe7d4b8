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
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use crate::claim::{Claim, MetaClaim};
use crate::common::UserState;
use crate::connector::Credential;
use crate::error::BuilderError;
use crate::federation::error::FederationProviderError;
use crate::service::ServiceState;
use crate::unique_id::{UniqueGroup, UniqueUser};

/// Federated user.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    /// Global id.
    pub id: String,
    /// Domain of the user.
    pub domain: String,
    /// Account state.
    pub state: UserState,
}

impl From<UniqueUser> for User {
    fn from(value: UniqueUser) -> Self {
        Self {
            id: value.id,
            domain: value.domain,
            state: value.state,
        }
    }
}

/// Federated group.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Group {
    /// Global id.
    pub id: String,
    /// Domain of the group.
    pub domain: String,
}

impl From<UniqueGroup> for Group {
    fn from(value: UniqueGroup) -> Self {
        Self {
            id: value.id,
            domain: value.domain,
        }
    }
}

/// New user.
#[derive(Builder, Clone, Debug, Validate)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(into))]
pub struct UserCreate {
    /// Claims of the user. At least one is required.
    #[validate(length(min = 1), nested)]
    pub claims: Vec<Claim>,

    /// Credentials stored in the credential store connectors.
    #[builder(default)]
    pub credentials: Vec<Credential>,
}

impl UserCreate {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self {
            claims,
            credentials: Vec::new(),
        }
    }

    pub fn with_credentials(mut self, credentials: Vec<Credential>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// New group.
#[derive(Builder, Clone, Debug, Deserialize, Serialize, Validate)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(into))]
pub struct GroupCreate {
    #[validate(length(min = 1), nested)]
    pub claims: Vec<Claim>,
}

impl GroupCreate {
    pub fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }
}

/// Federation coordinator interface.
///
/// Operations taking an optional domain run in the primary domain (writes)
/// or search the domains in the priority order (lookups) when none is given.
#[async_trait]
pub trait FederationApi: Send + Sync {
    /// Add the user to the identity and credential store connectors of the
    /// domain and register it in the resolver.
    async fn add_user<'a>(
        &self,
        state: &ServiceState,
        user: UserCreate,
        domain: Option<&'a str>,
    ) -> Result<User, FederationProviderError>;

    /// Add users one by one, stopping at the first failure.
    async fn add_users<'a>(
        &self,
        state: &ServiceState,
        users: Vec<UserCreate>,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError>;

    async fn get_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<User, FederationProviderError>;

    /// Find the user by the unique claim.
    async fn get_user_by_claim<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        domain: Option<&'a str>,
    ) -> Result<User, FederationProviderError>;

    /// List users with the exact claim value, or all users of the domains
    /// when no claim is given.
    async fn list_users<'a>(
        &self,
        state: &ServiceState,
        claim: Option<&'a Claim>,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError>;

    /// List users with the claim value matching the `*` pattern.
    async fn list_users_by_pattern<'a>(
        &self,
        state: &ServiceState,
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<User>, FederationProviderError>;

    /// Claims of the user assembled from all its identity partitions.
    async fn get_claims_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    ) -> Result<Vec<Claim>, FederationProviderError>;

    /// Replace the claims of the user.
    async fn update_user_claims_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        claims: Vec<Claim>,
    ) -> Result<(), FederationProviderError>;

    /// Remove the `remove` claims, then add the `add` ones.
    async fn update_user_claims_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: Vec<Claim>,
        remove: Vec<Claim>,
    ) -> Result<(), FederationProviderError>;

    /// Replace the credentials of the user.
    async fn update_user_credentials_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        credentials: Vec<Credential>,
    ) -> Result<(), FederationProviderError>;

    async fn update_user_credentials_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: Vec<Credential>,
        remove: Vec<Credential>,
    ) -> Result<(), FederationProviderError>;

    /// Delete the user from the connectors, then from the resolver.
    async fn delete_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<(), FederationProviderError>;

    async fn add_group<'a>(
        &self,
        state: &ServiceState,
        group: GroupCreate,
        domain: Option<&'a str>,
    ) -> Result<Group, FederationProviderError>;

    async fn get_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Group, FederationProviderError>;

    async fn get_group_by_claim<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        domain: Option<&'a str>,
    ) -> Result<Group, FederationProviderError>;

    async fn list_groups<'a>(
        &self,
        state: &ServiceState,
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    ) -> Result<Vec<Group>, FederationProviderError>;

    async fn get_claims_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    ) -> Result<Vec<Claim>, FederationProviderError>;

    async fn update_group_claims_put<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        claims: Vec<Claim>,
    ) -> Result<(), FederationProviderError>;

    async fn update_group_claims_patch<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: Vec<Claim>,
        remove: Vec<Claim>,
    ) -> Result<(), FederationProviderError>;

    async fn delete_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<(), FederationProviderError>;

    async fn is_user_in_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_id: &'a str,
    ) -> Result<bool, FederationProviderError>;

    async fn get_groups_of_user<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<Vec<Group>, FederationProviderError>;

    async fn get_users_of_group<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
    ) -> Result<Vec<User>, FederationProviderError>;

    /// Replace the groups of the user.
    async fn update_groups_of_user_put<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        group_ids: BTreeSet<String>,
    ) -> Result<(), FederationProviderError>;

    async fn update_groups_of_user_patch<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), FederationProviderError>;

    /// Replace the members of the group.
    async fn update_users_of_group_put<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        user_ids: BTreeSet<String>,
    ) -> Result<(), FederationProviderError>;

    async fn update_users_of_group_patch<'a>(
        &self,
        state: &ServiceState,
        group_id: &'a str,
        add: BTreeSet<String>,
        remove: BTreeSet<String>,
    ) -> Result<(), FederationProviderError>;

    async fn get_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<UserState, FederationProviderError>;

    /// Set the account state. Transitions are not validated.
    async fn set_user_state<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
        user_state: UserState,
    ) -> Result<(), FederationProviderError>;
}
