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
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::BuilderError;

/// Dialect of the claims when none is given.
pub const DEFAULT_DIALECT: &str = "urn:identity:claims";

/// Claim with the value.
#[derive(Builder, Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, Validate)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(into))]
pub struct Claim {
    #[builder(default = "DEFAULT_DIALECT.into()")]
    #[validate(length(min = 1))]
    pub dialect_uri: String,

    #[validate(length(min = 1))]
    pub claim_uri: String,

    pub value: String,
}

impl Claim {
    /// Claim of the default dialect.
    pub fn new<U: Into<String>, V: Into<String>>(claim_uri: U, value: V) -> Self {
        Self {
            dialect_uri: DEFAULT_DIALECT.into(),
            claim_uri: claim_uri.into(),
            value: value.into(),
        }
    }

    /// Type of the claim.
    pub fn meta_claim(&self) -> MetaClaim {
        MetaClaim {
            dialect_uri: self.dialect_uri.clone(),
            claim_uri: self.claim_uri.clone(),
        }
    }
}

/// Claim type (claim without the value).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct MetaClaim {
    pub dialect_uri: String,
    pub claim_uri: String,
}

impl MetaClaim {
    /// Meta claim of the default dialect.
    pub fn new<U: Into<String>>(claim_uri: U) -> Self {
        Self {
            dialect_uri: DEFAULT_DIALECT.into(),
            claim_uri: claim_uri.into(),
        }
    }
}

/// Storage location of a claim in a domain.
#[derive(Builder, Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(into))]
pub struct MetaClaimMapping {
    /// The claim.
    pub meta_claim: MetaClaim,

    /// Identity store connector holding the claim.
    pub identity_store_connector_id: String,

    /// Attribute name of the claim in the connector.
    pub attribute_name: String,

    /// Whether the claim value identifies the entity.
    #[builder(default)]
    pub unique: bool,
}

impl MetaClaimMapping {
    pub fn new<U, C, A>(claim_uri: U, connector_id: C, attribute_name: A) -> Self
    where
        U: Into<String>,
        C: Into<String>,
        A: Into<String>,
    {
        Self {
            meta_claim: MetaClaim::new(claim_uri),
            identity_store_connector_id: connector_id.into(),
            attribute_name: attribute_name.into(),
            unique: false,
        }
    }

    /// Mark the claim as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
