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

/// Connector error.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Supplied credentials were not accepted.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// Backend failure.
    #[error("connector {connector_id} failure: {message}")]
    Backend {
        /// Connector id.
        connector_id: String,
        /// Description of the failure.
        message: String,
    },

    /// Entity with the same unique attribute exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The connector local entity does not exist.
    #[error("entity {0} does not exist in the connector")]
    EntityNotFound(String),

    /// A partition references a connector of another domain than the one of
    /// the entity.
    #[error("partition references connector {connector_id} of the domain {domain}")]
    ResolverInconsistency {
        /// Connector id found in the partition.
        connector_id: String,
        /// Domain the connector is registered in.
        domain: String,
    },

    /// A partition references a connector no domain knows about.
    #[error("partition references unknown connector {connector_id}")]
    UnknownConnector {
        /// Connector id found in the partition.
        connector_id: String,
    },

    /// Write operation on a read-only connector.
    #[error("connector {connector_id} is read-only and does not support {operation}")]
    UnsupportedOperation {
        /// Connector id.
        connector_id: String,
        /// Operation name.
        operation: String,
    },
}

impl ConnectorError {
    /// Build backend error.
    pub fn backend<I: Into<String>, M: Into<String>>(connector_id: I, message: M) -> Self {
        Self::Backend {
            connector_id: connector_id.into(),
            message: message.into(),
        }
    }
}
