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
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BuilderError;

/// Connector native representation of a claim value.
#[derive(Builder, Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(into))]
pub struct Attribute {
    /// Attribute name in the connector.
    pub attribute_name: String,
    /// Attribute value.
    pub value: String,
}

impl Attribute {
    pub fn new<N: Into<String>, V: Into<String>>(attribute_name: N, value: V) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            value: value.into(),
        }
    }
}

/// Kind of the connector.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ConnectorKind {
    /// Stores user and group attributes.
    Identity,
    /// Stores credentials.
    Credential,
}

/// Proof of the identity (password, OTP secret, ...).
///
/// The value never appears in the `Debug` output.
#[derive(Clone)]
pub struct Credential {
    /// Kind of the proof (i.e. `password`).
    pub kind: String,
    /// Secret value.
    pub value: SecretString,
}

impl Credential {
    pub fn new<K: Into<String>, V: Into<String>>(kind: K, value: V) -> Self {
        Self {
            kind: kind.into(),
            value: SecretString::from(value.into()),
        }
    }

    /// Password credential.
    pub fn password<V: Into<String>>(value: V) -> Self {
        Self::new("password", value)
    }

    /// Compare the secret value with another credential of the same kind.
    pub fn matches(&self, other: &Credential) -> bool {
        self.kind == other.kind && self.value.expose_secret() == other.value.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("value", &"[REDACTED]")
            .finish()
    }
}
