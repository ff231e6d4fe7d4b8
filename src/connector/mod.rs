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

//! # Connectors
//!
//! Connectors are the backends physically holding the federated data. They
//! are owned by external systems, are not transactional and are supplied
//! fully constructed when the domains are assembled.
//!
//! ## Identity store connector
//!
//! Holds the attributes of users and groups. Each entity is known to the
//! connector under its own *connector local id*.
//!
//! ## Credential store connector
//!
//! Holds the credentials (passwords, OTP secrets, ...) of the users and
//! verifies the proofs supplied during the authentication.
//!
//! Write operations on a read-only connector must fail with
//! [`ConnectorError::UnsupportedOperation`]. The `check_writable` helper of
//! both traits produces that error.

use async_trait::async_trait;

pub mod error;
pub mod memory;
pub mod types;

pub use error::ConnectorError;
pub use memory::{InMemoryCredentialStoreConnector, InMemoryIdentityStoreConnector};
pub use types::*;

/// Identity store connector API.
#[async_trait]
pub trait IdentityStoreConnector: Send + Sync + std::fmt::Debug {
    /// Unique connector id.
    fn connector_id(&self) -> &str;

    /// Priority of the connector within its domain (lower goes first).
    fn priority(&self) -> u32;

    /// Whether the connector rejects modifications.
    fn is_read_only(&self) -> bool;

    /// Fail with [`ConnectorError::UnsupportedOperation`] for read-only
    /// connectors.
    fn check_writable(&self, operation: &str) -> Result<(), ConnectorError> {
        if self.is_read_only() {
            return Err(ConnectorError::UnsupportedOperation {
                connector_id: self.connector_id().into(),
                operation: operation.into(),
            });
        }
        Ok(())
    }

    /// Find the local id of the user with the attribute value.
    async fn get_connector_user_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError>;

    /// List local ids of the users with the exact attribute value.
    async fn list_connector_user_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// List local ids of the users with the attribute matching the pattern.
    ///
    /// `*` matches any sequence of characters.
    async fn list_connector_user_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Get attributes of the user. All attributes are returned when no names
    /// are given.
    async fn get_user_attribute_values<'a>(
        &self,
        user_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError>;

    /// Add the user returning its connector local id.
    async fn add_user(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError>;

    /// Add multiple users returning their local ids in the input order.
    async fn add_users(
        &self,
        users: Vec<Vec<Attribute>>,
    ) -> Result<Vec<String>, ConnectorError> {
        let mut ids = Vec::with_capacity(users.len());
        for attributes in users {
            match self.add_user(attributes).await {
                Ok(id) => ids.push(id),
                Err(err) => {
                    if !ids.is_empty() {
                        self.remove_added_users_in_a_failure(&ids).await?;
                    }
                    return Err(err);
                }
            }
        }
        Ok(ids)
    }

    /// Replace all attributes of the user.
    ///
    /// Returns the local id of the user which may change with the update.
    async fn update_user_attributes_put<'a>(
        &self,
        user_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError>;

    /// Remove the `remove` attributes, then add the `add` ones.
    ///
    /// Returns the local id of the user which may change with the update.
    async fn update_user_attributes_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError>;

    /// Delete the user.
    async fn delete_user<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError>;

    /// Remove users added as part of a federated operation which failed
    /// afterwards.
    async fn remove_added_users_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError>;

    /// Find the local id of the group with the attribute value.
    async fn get_connector_group_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError>;

    /// List local ids of the groups with the exact attribute value.
    async fn list_connector_group_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// List local ids of the groups with the attribute matching the pattern.
    async fn list_connector_group_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError>;

    /// Get attributes of the group.
    async fn get_group_attribute_values<'a>(
        &self,
        group_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError>;

    /// Add the group returning its connector local id.
    async fn add_group(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError>;

    /// Replace all attributes of the group.
    async fn update_group_attributes_put<'a>(
        &self,
        group_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError>;

    /// Remove the `remove` attributes, then add the `add` ones.
    async fn update_group_attributes_patch<'a>(
        &self,
        group_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError>;

    /// Delete the group.
    async fn delete_group<'a>(&self, group_id: &'a str) -> Result<(), ConnectorError>;

    /// Remove groups added as part of a federated operation which failed
    /// afterwards.
    async fn remove_added_groups_in_a_failure<'a>(
        &self,
        group_ids: &'a [String],
    ) -> Result<(), ConnectorError>;

    /// Whether the connector itself records the membership.
    ///
    /// Memberships of the federated entities are kept by the unique id
    /// resolver, connectors modelling them natively may expose them here.
    async fn is_user_in_group<'a>(
        &self,
        _user_id: &'a str,
        _group_id: &'a str,
    ) -> Result<bool, ConnectorError> {
        Err(ConnectorError::UnsupportedOperation {
            connector_id: self.connector_id().into(),
            operation: "group membership query".into(),
        })
    }
}

/// Credential store connector API.
#[async_trait]
pub trait CredentialStoreConnector: Send + Sync + std::fmt::Debug {
    /// Unique connector id.
    fn connector_id(&self) -> &str;

    /// Priority of the connector within its domain (lower goes first).
    fn priority(&self) -> u32;

    /// Whether the connector rejects modifications.
    fn is_read_only(&self) -> bool;

    /// Fail with [`ConnectorError::UnsupportedOperation`] for read-only
    /// connectors.
    fn check_writable(&self, operation: &str) -> Result<(), ConnectorError> {
        if self.is_read_only() {
            return Err(ConnectorError::UnsupportedOperation {
                connector_id: self.connector_id().into(),
                operation: operation.into(),
            });
        }
        Ok(())
    }

    /// Whether the connector is able to verify the credentials.
    fn can_handle(&self, credentials: &[Credential]) -> bool;

    /// Whether the connector accepts the credentials of a new user.
    fn can_store(&self, credentials: &[Credential]) -> bool {
        !self.is_read_only() && self.can_handle(credentials)
    }

    /// Verify the credentials of the user.
    ///
    /// Returns [`ConnectorError::AuthenticationFailure`] when they are not
    /// accepted.
    async fn authenticate<'a>(
        &self,
        user_id: &'a str,
        credentials: &'a [Credential],
    ) -> Result<(), ConnectorError>;

    /// Store the credentials returning the connector local id.
    async fn add_credential(&self, credentials: Vec<Credential>) -> Result<String, ConnectorError>;

    /// Replace the credentials of the user.
    async fn update_credentials_put<'a>(
        &self,
        user_id: &'a str,
        credentials: Vec<Credential>,
    ) -> Result<String, ConnectorError>;

    /// Remove the `remove` credentials, then add the `add` ones.
    async fn update_credentials_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Credential>,
        remove: Vec<Credential>,
    ) -> Result<String, ConnectorError>;

    /// Delete all credentials of the user.
    async fn delete_credential<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError>;

    /// Remove credentials stored as part of a federated operation which failed
    /// afterwards.
    async fn remove_added_credentials_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError>;
}
