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
//! # Authentication engine
//!
//! Resolves the subject of the claim, refuses accounts whose state blocks the
//! authentication and verifies the credentials against the credential store
//! partitions of the user.
//!
//! A subject which does not exist fails exactly like a wrong credential so
//! the existence of accounts does not leak. Counting the failures is left to
//! the interceptors.
use async_trait::async_trait;
use tracing::{debug, warn};

pub mod error;
pub mod types;

use crate::claim::Claim;
use crate::common::UserStateGroup;
use crate::connector::{ConnectorError, Credential};
use crate::federation::{self, FederationProviderError};
use crate::interceptor::Operation;
use crate::service::ServiceState;

pub use error::AuthenticationError;
pub use types::*;

#[derive(Clone, Debug, Default)]
pub struct AuthenticationEngine {}

async fn authenticate(
    state: &ServiceState,
    claim: &Claim,
    credentials: &[Credential],
    domain: Option<&str>,
) -> Result<AuthenticationContext, AuthenticationError> {
    let user = match federation::user::get_user_by_claim(state, claim, domain).await {
        Ok(user) => user,
        Err(FederationProviderError::UserNotFound(_)) => {
            debug!("no subject for the claim {}", claim.claim_uri);
            return Err(AuthenticationError::AuthenticationFailure);
        }
        Err(err) => return Err(err.into()),
    };
    // The state is evaluated before any credential store is contacted.
    if user.state.group().blocks_authentication() {
        return Err(AuthenticationError::AccountStateBlocked { state: user.state });
    }

    let unique = federation::user::load_user(state, &user.id).await?;
    let domain = state
        .provider
        .get_domain_registry()
        .resolve_domain(&unique.domain)
        .map_err(FederationProviderError::from)?;
    for connector in domain.credential_connectors() {
        let Some(partition) = unique.partition(connector.connector_id()) else {
            continue;
        };
        if !connector.can_handle(credentials) {
            continue;
        }
        match connector
            .authenticate(&partition.connector_local_id, credentials)
            .await
        {
            Ok(()) => {
                debug!(
                    "user {} authenticated by {}",
                    unique.id,
                    connector.connector_id()
                );
                return Ok(AuthenticationContext::new(unique.id, unique.domain));
            }
            Err(ConnectorError::AuthenticationFailure) => {}
            Err(err) => {
                warn!(
                    "credential store {} failed to authenticate {}: {}",
                    connector.connector_id(),
                    unique.id,
                    err
                );
            }
        }
    }
    Err(AuthenticationError::AuthenticationFailure)
}

#[async_trait]
impl AuthenticationApi for AuthenticationEngine {
    #[tracing::instrument(level = "info", skip(self, state, credentials))]
    async fn authenticate<'a>(
        &self,
        state: &ServiceState,
        claim: &'a Claim,
        credentials: &'a [Credential],
        domain: Option<&'a str>,
    ) -> Result<AuthenticationContext, AuthenticationError> {
        state
            .provider
            .get_interceptor_chain()
            .intercept(
                state,
                Operation::Authenticate { claim, domain },
                authenticate(state, claim, credentials, domain),
            )
            .await
    }

    #[tracing::instrument(level = "debug", skip(self, state))]
    async fn get_state_group<'a>(
        &self,
        state: &ServiceState,
        user_id: &'a str,
    ) -> Result<UserStateGroup, AuthenticationError> {
        Ok(federation::user::get_user_state(state, user_id)
            .await?
            .group())
    }
}
