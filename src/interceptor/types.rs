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
use std::collections::BTreeSet;

use crate::auth::AuthenticationContext;
use crate::claim::{Claim, MetaClaim};
use crate::common::UserState;
use crate::federation::{Group, User};

/// Public operation of the coordinator or the authentication engine.
///
/// Credentials never appear in the operation.
#[derive(Clone, Debug)]
pub enum Operation<'a> {
    AddUser {
        claims: &'a [Claim],
        domain: Option<&'a str>,
    },
    AddUsers {
        count: usize,
        domain: Option<&'a str>,
    },
    GetUser {
        user_id: &'a str,
    },
    GetUserByClaim {
        claim: &'a Claim,
        domain: Option<&'a str>,
    },
    ListUsers {
        claim: Option<&'a Claim>,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    },
    ListUsersByPattern {
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    },
    GetClaimsOfUser {
        user_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    },
    UpdateUserClaimsPut {
        user_id: &'a str,
        claims: &'a [Claim],
    },
    UpdateUserClaimsPatch {
        user_id: &'a str,
        add: &'a [Claim],
        remove: &'a [Claim],
    },
    UpdateUserCredentialsPut {
        user_id: &'a str,
    },
    UpdateUserCredentialsPatch {
        user_id: &'a str,
    },
    DeleteUser {
        user_id: &'a str,
    },
    AddGroup {
        claims: &'a [Claim],
        domain: Option<&'a str>,
    },
    GetGroup {
        group_id: &'a str,
    },
    GetGroupByClaim {
        claim: &'a Claim,
        domain: Option<&'a str>,
    },
    ListGroups {
        meta_claim: &'a MetaClaim,
        pattern: &'a str,
        offset: usize,
        length: usize,
        domain: Option<&'a str>,
    },
    GetClaimsOfGroup {
        group_id: &'a str,
        meta_claims: Option<&'a [MetaClaim]>,
    },
    UpdateGroupClaimsPut {
        group_id: &'a str,
        claims: &'a [Claim],
    },
    UpdateGroupClaimsPatch {
        group_id: &'a str,
        add: &'a [Claim],
        remove: &'a [Claim],
    },
    DeleteGroup {
        group_id: &'a str,
    },
    IsUserInGroup {
        user_id: &'a str,
        group_id: &'a str,
    },
    GetGroupsOfUser {
        user_id: &'a str,
    },
    GetUsersOfGroup {
        group_id: &'a str,
    },
    UpdateGroupsOfUserPut {
        user_id: &'a str,
        group_ids: &'a BTreeSet<String>,
    },
    UpdateGroupsOfUserPatch {
        user_id: &'a str,
        add: &'a BTreeSet<String>,
        remove: &'a BTreeSet<String>,
    },
    UpdateUsersOfGroupPut {
        group_id: &'a str,
        user_ids: &'a BTreeSet<String>,
    },
    UpdateUsersOfGroupPatch {
        group_id: &'a str,
        add: &'a BTreeSet<String>,
        remove: &'a BTreeSet<String>,
    },
    GetUserState {
        user_id: &'a str,
    },
    SetUserState {
        user_id: &'a str,
        state: UserState,
    },
    Authenticate {
        claim: &'a Claim,
        domain: Option<&'a str>,
    },
}

impl Operation<'_> {
    /// Name of the operation used in the logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddUser { .. } => "add_user",
            Self::AddUsers { .. } => "add_users",
            Self::GetUser { .. } => "get_user",
            Self::GetUserByClaim { .. } => "get_user_by_claim",
            Self::ListUsers { .. } => "list_users",
            Self::ListUsersByPattern { .. } => "list_users_by_pattern",
            Self::GetClaimsOfUser { .. } => "get_claims_of_user",
            Self::UpdateUserClaimsPut { .. } => "update_user_claims_put",
            Self::UpdateUserClaimsPatch { .. } => "update_user_claims_patch",
            Self::UpdateUserCredentialsPut { .. } => "update_user_credentials_put",
            Self::UpdateUserCredentialsPatch { .. } => "update_user_credentials_patch",
            Self::DeleteUser { .. } => "delete_user",
            Self::AddGroup { .. } => "add_group",
            Self::GetGroup { .. } => "get_group",
            Self::GetGroupByClaim { .. } => "get_group_by_claim",
            Self::ListGroups { .. } => "list_groups",
            Self::GetClaimsOfGroup { .. } => "get_claims_of_group",
            Self::UpdateGroupClaimsPut { .. } => "update_group_claims_put",
            Self::UpdateGroupClaimsPatch { .. } => "update_group_claims_patch",
            Self::DeleteGroup { .. } => "delete_group",
            Self::IsUserInGroup { .. } => "is_user_in_group",
            Self::GetGroupsOfUser { .. } => "get_groups_of_user",
            Self::GetUsersOfGroup { .. } => "get_users_of_group",
            Self::UpdateGroupsOfUserPut { .. } => "update_groups_of_user_put",
            Self::UpdateGroupsOfUserPatch { .. } => "update_groups_of_user_patch",
            Self::UpdateUsersOfGroupPut { .. } => "update_users_of_group_put",
            Self::UpdateUsersOfGroupPatch { .. } => "update_users_of_group_patch",
            Self::GetUserState { .. } => "get_user_state",
            Self::SetUserState { .. } => "set_user_state",
            Self::Authenticate { .. } => "authenticate",
        }
    }

    /// Global id of the user the operation modifies.
    pub fn modified_user(&self) -> Option<&str> {
        match self {
            Self::UpdateUserClaimsPut { user_id, .. }
            | Self::UpdateUserClaimsPatch { user_id, .. }
            | Self::UpdateUserCredentialsPut { user_id }
            | Self::UpdateUserCredentialsPatch { user_id }
            | Self::UpdateGroupsOfUserPut { user_id, .. }
            | Self::UpdateGroupsOfUserPatch { user_id, .. } => Some(user_id),
            _ => None,
        }
    }
}

/// Result of a successful operation as seen by the post-hooks.
#[derive(Clone, Debug)]
pub enum OperationOutcome<'a> {
    User(&'a User),
    Users(&'a [User]),
    Group(&'a Group),
    Groups(&'a [Group]),
    Claims(&'a [Claim]),
    Bool(bool),
    State(UserState),
    Authentication(&'a AuthenticationContext),
    Done,
}

/// Expose the operation result to the post-hooks.
pub trait AsOutcome {
    fn as_outcome(&self) -> OperationOutcome<'_>;
}

impl AsOutcome for User {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::User(self)
    }
}

impl AsOutcome for Vec<User> {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Users(self)
    }
}

impl AsOutcome for Group {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Group(self)
    }
}

impl AsOutcome for Vec<Group> {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Groups(self)
    }
}

impl AsOutcome for Vec<Claim> {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Claims(self)
    }
}

impl AsOutcome for bool {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Bool(*self)
    }
}

impl AsOutcome for UserState {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::State(*self)
    }
}

impl AsOutcome for AuthenticationContext {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Authentication(self)
    }
}

impl AsOutcome for () {
    fn as_outcome(&self) -> OperationOutcome<'_> {
        OperationOutcome::Done
    }
}
