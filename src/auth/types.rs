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
use serde::Serialize;
use std::collections::BTreeMap;

use crate::auth::error::AuthenticationError;
use crate::claim::Claim;
use crate::common::UserStateGroup;
use crate::connector::Credential;
use crate::service::ServiceState;

/// Result of a successful authentication.
#[derive(Clone, Debug, Serialize)]
pub struct AuthenticationContext {
    authenticated: bool,
    user_id: String,
    domain: String,
    parameters: BTreeMap<String, String>,
}

impl AuthenticationContext {
    pub fn new<U: Into<String>, D: Into<String>>(user_id: U, domain: D) -> Self {
        Self {
            authenticated: true,
            user_id: user_id.into(),
            domain: domain.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    /// Global id of the authenticated user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Add the parameter. Existing parameters are never overwritten.
    pub fn add_parameter<K: Into<String>, V: Into<String>>(
        &mut self,
        key: K,
        value: V,
    ) -> Result<(), AuthenticationError> {
        let key = key.into();
        if self.parameters.contains_key(&key) {
            return Err(AuthenticationError::DuplicateParameter(key));
        }
        self.parameters.insert(key, value.into());
        Ok(())
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}

/// Authentication engine interface.
#[async_trait]
pub trait AuthenticationApi: Send + Sync {
    /// Authenticate the subject identified by the claim.
    async fn authenticate<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        credentials: &'a [Credential],
        domain: Option<&'a str>,
    ) -> Result<AuthenticationContext, AuthenticationError>;

    /// Group of the current account state of the user.
    async fn get_state_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<UserStateGroup, AuthenticationError>;
}
