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
use thiserror::Error;

use crate::claim::ClaimError;
use crate::connector::ConnectorError;
use crate::domain::error::DomainError;
use crate::interceptor::InterceptorError;
use crate::unique_id::error::UniqueIdProviderError;

#[derive(Error, Debug)]
pub enum FederationProviderError {
    /// Claim is not supported in the domain.
    #[error(transparent)]
    Claim {
        #[from]
        source: ClaimError,
    },

    /// Connector failed the operation.
    #[error("{operation} of {entity} failed in the domain {domain}: {source}")]
    Connector {
        /// Operation name.
        operation: String,
        /// Domain name.
        domain: String,
        /// Global id of the entity or a description of the new one.
        entity: String,
        /// The source of the error.
        source: ConnectorError,
    },

    /// No credential store connector of the domain takes the credentials.
    #[error("no credential store connector of the domain {0} handles the credentials")]
    CredentialNotSupported(String),

    #[error(transparent)]
    Domain {
        #[from]
        source: DomainError,
    },

    #[error("group {0} not found")]
    GroupNotFound(String),

    /// Operation rejected by the interceptor chain.
    #[error(transparent)]
    Interceptor {
        #[from]
        source: InterceptorError,
    },

    /// Unique id resolver error.
    #[error(transparent)]
    UniqueId { source: UniqueIdProviderError },

    #[error("user {0} not found")]
    UserNotFound(String),

    /// Request validation error.
    #[error("request validation failed: {source}")]
    Validation {
        #[from]
        source: validator::ValidationErrors,
    },
}

impl From<UniqueIdProviderError> for FederationProviderError {
    fn from(source: UniqueIdProviderError) -> Self {
        match source {
            UniqueIdProviderError::UserNotFound(id) => Self::UserNotFound(id),
            UniqueIdProviderError::GroupNotFound(id) => Self::GroupNotFound(id),
            other => Self::UniqueId { source: other },
        }
    }
}

impl FederationProviderError {
    /// Wrap the connector error with the operation context.
    pub fn connector<O, D, E>(operation: O, domain: D, entity: E) -> impl FnOnce(ConnectorError) -> Self
    where
        O: Into<String>,
        D: Into<String>,
        E: Into<String>,
    {
        move |source| Self::Connector {
            operation: operation.into(),
            domain: domain.into(),
            entity: entity.into(),
            source,
        }
    }

    /// The claim is not mapped in the searched domain(s).
    pub fn claim_not_supported(claim_uri: &str, domain: Option<&str>) -> Self {
        ClaimError::ClaimNotSupported {
            claim_uri: claim_uri.into(),
            domain: domain.unwrap_or("*").into(),
        }
        .into()
    }
}
