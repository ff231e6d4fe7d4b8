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
//! # In-memory connectors
//!
//! Connectors keeping the data in the process memory. They are meant for
//! tests, demos and as a scratch store of embedding applications. Attributes
//! are single valued: adding an attribute replaces the value of the attribute
//! with the same name.
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::connector::{
    Attribute, ConnectorError, Credential, CredentialStoreConnector, IdentityStoreConnector,
};

type Entities = BTreeMap<String, Vec<Attribute>>;

/// In-memory identity store connector.
#[derive(Debug)]
pub struct InMemoryIdentityStoreConnector {
    connector_id: String,
    priority: u32,
    read_only: bool,
    /// Attributes which must be unique among the entities of the connector.
    unique_attributes: Vec<String>,
    users: RwLock<Entities>,
    groups: RwLock<Entities>,
}

impl InMemoryIdentityStoreConnector {
    pub fn new<S: Into<String>>(connector_id: S, priority: u32) -> Self {
        Self {
            connector_id: connector_id.into(),
            priority,
            read_only: false,
            unique_attributes: Vec::new(),
            users: RwLock::default(),
            groups: RwLock::default(),
        }
    }

    /// Mark the connector read-only.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Reject entities duplicating the value of the attribute.
    pub fn with_unique_attribute<S: Into<String>>(mut self, attribute_name: S) -> Self {
        self.unique_attributes.push(attribute_name.into());
        self
    }

    /// Preload a user, bypassing the read-only flag.
    ///
    /// Simulates data existing in the backend before it got federated.
    pub async fn seed_user<S: Into<String>>(&self, user_id: S, attributes: Vec<Attribute>) {
        self.users
            .write()
            .await
            .insert(user_id.into(), normalize(attributes));
    }

    /// Number of users stored.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    fn check_unique(
        &self,
        entities: &Entities,
        own_id: Option<&str>,
        attributes: &[Attribute],
    ) -> Result<(), ConnectorError> {
        for attr in attributes
            .iter()
            .filter(|attr| self.unique_attributes.contains(&attr.attribute_name))
        {
            let taken = entities
                .iter()
                .filter(|(id, _)| Some(id.as_str()) != own_id)
                .any(|(_, attrs)| attrs.contains(attr));
            if taken {
                return Err(ConnectorError::Conflict(format!(
                    "{} `{}` is already used in {}",
                    attr.attribute_name, attr.value, self.connector_id
                )));
            }
        }
        Ok(())
    }

    async fn find_one(
        &self,
        entities: &RwLock<Entities>,
        attribute_name: &str,
        value: &str,
    ) -> Option<String> {
        entities
            .read()
            .await
            .iter()
            .find(|(_, attrs)| has_value(attrs, attribute_name, value))
            .map(|(id, _)| id.clone())
    }

    async fn find_matching(
        &self,
        entities: &RwLock<Entities>,
        attribute_name: &str,
        pattern: &str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        let re = pattern_regex(&self.connector_id, pattern)?;
        Ok(entities
            .read()
            .await
            .iter()
            .filter(|(_, attrs)| {
                attrs
                    .iter()
                    .any(|attr| attr.attribute_name == attribute_name && re.is_match(&attr.value))
            })
            .skip(offset)
            .take(length)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn read_attributes(
        &self,
        entities: &RwLock<Entities>,
        id: &str,
        attribute_names: Option<&[String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        let guard = entities.read().await;
        let attrs = guard
            .get(id)
            .ok_or_else(|| ConnectorError::EntityNotFound(id.into()))?;
        Ok(attrs
            .iter()
            .filter(|attr| attribute_names.is_none_or(|names| names.contains(&attr.attribute_name)))
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        entities: &RwLock<Entities>,
        attributes: Vec<Attribute>,
        operation: &str,
    ) -> Result<String, ConnectorError> {
        self.check_writable(operation)?;
        let mut guard = entities.write().await;
        let attributes = normalize(attributes);
        self.check_unique(&guard, None, &attributes)?;
        let id = Uuid::new_v4().simple().to_string();
        debug!("{} stored entity {}", self.connector_id, id);
        guard.insert(id.clone(), attributes);
        Ok(id)
    }

    async fn replace(
        &self,
        entities: &RwLock<Entities>,
        id: &str,
        attributes: Vec<Attribute>,
        operation: &str,
    ) -> Result<String, ConnectorError> {
        self.check_writable(operation)?;
        let mut guard = entities.write().await;
        let attributes = normalize(attributes);
        self.check_unique(&guard, Some(id), &attributes)?;
        let current = guard
            .get_mut(id)
            .ok_or_else(|| ConnectorError::EntityNotFound(id.into()))?;
        *current = attributes;
        Ok(id.into())
    }

    async fn patch(
        &self,
        entities: &RwLock<Entities>,
        id: &str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
        operation: &str,
    ) -> Result<String, ConnectorError> {
        self.check_writable(operation)?;
        let mut guard = entities.write().await;
        let mut attributes = guard
            .get(id)
            .cloned()
            .ok_or_else(|| ConnectorError::EntityNotFound(id.into()))?;
        attributes.retain(|attr| {
            !remove.iter().any(|rm| {
                rm.attribute_name == attr.attribute_name
                    && (rm.value.is_empty() || rm.value == attr.value)
            })
        });
        attributes.extend(add);
        let attributes = normalize(attributes);
        self.check_unique(&guard, Some(id), &attributes)?;
        guard.insert(id.into(), attributes);
        Ok(id.into())
    }

    async fn remove(
        &self,
        entities: &RwLock<Entities>,
        id: &str,
        operation: &str,
    ) -> Result<(), ConnectorError> {
        self.check_writable(operation)?;
        entities
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ConnectorError::EntityNotFound(id.into()))
    }

    async fn remove_many(&self, entities: &RwLock<Entities>, ids: &[String]) {
        let mut guard = entities.write().await;
        for id in ids {
            guard.remove(id);
        }
    }
}

#[async_trait]
impl IdentityStoreConnector for InMemoryIdentityStoreConnector {
    fn connector_id(&self) -> &str {
        &self.connector_id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn get_connector_user_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError> {
        Ok(self.find_one(&self.users, attribute_name, value).await)
    }

    async fn list_connector_user_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(find_exact(&*self.users.read().await, attribute_name, value, offset, length))
    }

    async fn list_connector_user_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.find_matching(&self.users, attribute_name, pattern, offset, length)
            .await
    }

    async fn get_user_attribute_values<'a>(
        &self,
        user_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.read_attributes(&self.users, user_id, attribute_names)
            .await
    }

    async fn add_user(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError> {
        self.insert(&self.users, attributes, "add user").await
    }

    async fn update_user_attributes_put<'a>(
        &self,
        user_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.replace(&self.users, user_id, attributes, "update user")
            .await
    }

    async fn update_user_attributes_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.patch(&self.users, user_id, add, remove, "update user")
            .await
    }

    async fn delete_user<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError> {
        self.remove(&self.users, user_id, "delete user").await
    }

    async fn remove_added_users_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        self.remove_many(&self.users, user_ids).await;
        Ok(())
    }

    async fn get_connector_group_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError> {
        Ok(self.find_one(&self.groups, attribute_name, value).await)
    }

    async fn list_connector_group_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        Ok(find_exact(&*self.groups.read().await, attribute_name, value, offset, length))
    }

    async fn list_connector_group_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.find_matching(&self.groups, attribute_name, pattern, offset, length)
            .await
    }

    async fn get_group_attribute_values<'a>(
        &self,
        group_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.read_attributes(&self.groups, group_id, attribute_names)
            .await
    }

    async fn add_group(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError> {
        self.insert(&self.groups, attributes, "add group").await
    }

    async fn update_group_attributes_put<'a>(
        &self,
        group_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.replace(&self.groups, group_id, attributes, "update group")
            .await
    }

    async fn update_group_attributes_patch<'a>(
        &self,
        group_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.patch(&self.groups, group_id, add, remove, "update group")
            .await
    }

    async fn delete_group<'a>(&self, group_id: &'a str) -> Result<(), ConnectorError> {
        self.remove(&self.groups, group_id, "delete group").await
    }

    async fn remove_added_groups_in_a_failure<'a>(
        &self,
        group_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        self.remove_many(&self.groups, group_ids).await;
        Ok(())
    }
}

/// In-memory credential store connector.
#[derive(Debug)]
pub struct InMemoryCredentialStoreConnector {
    connector_id: String,
    priority: u32,
    read_only: bool,
    /// Credential kinds the connector accepts.
    kinds: Vec<String>,
    credentials: RwLock<BTreeMap<String, Vec<Credential>>>,
}

impl InMemoryCredentialStoreConnector {
    /// Connector handling `password` credentials.
    pub fn new<S: Into<String>>(connector_id: S, priority: u32) -> Self {
        Self {
            connector_id: connector_id.into(),
            priority,
            read_only: false,
            kinds: vec!["password".into()],
            credentials: RwLock::default(),
        }
    }

    /// Replace the credential kinds the connector accepts.
    pub fn with_kinds<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the connector read-only.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Number of users having credentials stored.
    pub async fn credential_count(&self) -> usize {
        self.credentials.read().await.len()
    }
}

#[async_trait]
impl CredentialStoreConnector for InMemoryCredentialStoreConnector {
    fn connector_id(&self) -> &str {
        &self.connector_id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn can_handle(&self, credentials: &[Credential]) -> bool {
        !credentials.is_empty() && credentials.iter().all(|cred| self.kinds.contains(&cred.kind))
    }

    async fn authenticate<'a>(
        &self,
        user_id: &'a str,
        credentials: &'a [Credential],
    ) -> Result<(), ConnectorError> {
        let guard = self.credentials.read().await;
        let stored = guard
            .get(user_id)
            .ok_or(ConnectorError::AuthenticationFailure)?;
        let accepted = !credentials.is_empty()
            && credentials
                .iter()
                .all(|cred| stored.iter().any(|known| known.matches(cred)));
        if !accepted {
            return Err(ConnectorError::AuthenticationFailure);
        }
        Ok(())
    }

    async fn add_credential(&self, credentials: Vec<Credential>) -> Result<String, ConnectorError> {
        self.check_writable("add credential")?;
        let id = Uuid::new_v4().simple().to_string();
        self.credentials
            .write()
            .await
            .insert(id.clone(), credentials);
        Ok(id)
    }

    async fn update_credentials_put<'a>(
        &self,
        user_id: &'a str,
        credentials: Vec<Credential>,
    ) -> Result<String, ConnectorError> {
        self.check_writable("update credential")?;
        let mut guard = self.credentials.write().await;
        let current = guard
            .get_mut(user_id)
            .ok_or_else(|| ConnectorError::EntityNotFound(user_id.into()))?;
        *current = credentials;
        Ok(user_id.into())
    }

    async fn update_credentials_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Credential>,
        remove: Vec<Credential>,
    ) -> Result<String, ConnectorError> {
        self.check_writable("update credential")?;
        let mut guard = self.credentials.write().await;
        let current = guard
            .get_mut(user_id)
            .ok_or_else(|| ConnectorError::EntityNotFound(user_id.into()))?;
        current.retain(|cred| !remove.iter().any(|rm| rm.kind == cred.kind));
        current.retain(|cred| !add.iter().any(|new| new.kind == cred.kind));
        current.extend(add);
        Ok(user_id.into())
    }

    async fn delete_credential<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError> {
        self.check_writable("delete credential")?;
        self.credentials
            .write()
            .await
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| ConnectorError::EntityNotFound(user_id.into()))
    }

    async fn remove_added_credentials_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        let mut guard = self.credentials.write().await;
        for id in user_ids {
            guard.remove(id);
        }
        Ok(())
    }
}

fn has_value(attributes: &[Attribute], attribute_name: &str, value: &str) -> bool {
    attributes
        .iter()
        .any(|attr| attr.attribute_name == attribute_name && attr.value == value)
}

fn find_exact(
    entities: &Entities,
    attribute_name: &str,
    value: &str,
    offset: usize,
    length: usize,
) -> Vec<String> {
    entities
        .iter()
        .filter(|(_, attrs)| has_value(attrs, attribute_name, value))
        .skip(offset)
        .take(length)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Keep only the last value of every attribute name.
fn normalize(attributes: Vec<Attribute>) -> Vec<Attribute> {
    let mut res: BTreeMap<String, Attribute> = BTreeMap::new();
    for attr in attributes {
        res.insert(attr.attribute_name.clone(), attr);
    }
    res.into_values().collect()
}

fn pattern_regex(connector_id: &str, pattern: &str) -> Result<Regex, ConnectorError> {
    let expr = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{expr}$"))
        .map_err(|err| ConnectorError::backend(connector_id, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(values: &[(&str, &str)]) -> Vec<Attribute> {
        values
            .iter()
            .map(|(name, value)| Attribute::new(*name, *value))
            .collect()
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let connector = InMemoryIdentityStoreConnector::new("c1", 1);
        let alice = connector
            .add_user(attrs(&[("uid", "alice"), ("mail", "alice@x.com")]))
            .await
            .unwrap();
        connector
            .add_user(attrs(&[("uid", "bob"), ("mail", "bob@x.com")]))
            .await
            .unwrap();

        assert_eq!(
            Some(alice.clone()),
            connector.get_connector_user_id("uid", "alice").await.unwrap()
        );
        assert!(
            connector
                .get_connector_user_id("uid", "carol")
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            2,
            connector
                .list_connector_user_ids_by_pattern("mail", "*@x.com", 0, 10)
                .await
                .unwrap()
                .len()
        );
        assert_eq!(
            1,
            connector
                .list_connector_user_ids_by_pattern("mail", "*@x.com", 1, 10)
                .await
                .unwrap()
                .len()
        );
        assert_eq!(
            vec![Attribute::new("mail", "alice@x.com")],
            connector
                .get_user_attribute_values(&alice, Some(&["mail".to_string()]))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_patch_removes_before_adding() {
        let connector = InMemoryIdentityStoreConnector::new("c1", 1);
        let id = connector
            .add_user(attrs(&[("uid", "alice"), ("mail", "old@x.com")]))
            .await
            .unwrap();
        connector
            .update_user_attributes_patch(
                &id,
                attrs(&[("mail", "new@x.com")]),
                attrs(&[("mail", "new@x.com")]),
            )
            .await
            .unwrap();
        assert_eq!(
            attrs(&[("mail", "new@x.com"), ("uid", "alice")]),
            connector.get_user_attribute_values(&id, None).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_read_only() {
        let connector = InMemoryIdentityStoreConnector::new("c1", 1).with_read_only(true);
        match connector.add_user(attrs(&[("uid", "alice")])).await {
            Err(ConnectorError::UnsupportedOperation { connector_id, .. }) => {
                assert_eq!("c1", connector_id)
            }
            other => panic!("read-only connector accepted the write: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unique_attribute() {
        let connector = InMemoryIdentityStoreConnector::new("c1", 1).with_unique_attribute("uid");
        connector
            .add_user(attrs(&[("uid", "alice")]))
            .await
            .unwrap();
        assert!(matches!(
            connector.add_user(attrs(&[("uid", "alice")])).await,
            Err(ConnectorError::Conflict(..))
        ));
    }

    #[tokio::test]
    async fn test_credentials() {
        let connector = InMemoryCredentialStoreConnector::new("k1", 1);
        assert!(connector.can_handle(&[Credential::password("x")]));
        assert!(!connector.can_handle(&[Credential::new("otp", "x")]));
        assert!(!connector.can_handle(&[]));

        let id = connector
            .add_credential(vec![Credential::password("secret1")])
            .await
            .unwrap();
        connector
            .authenticate(&id, &[Credential::password("secret1")])
            .await
            .unwrap();
        assert!(matches!(
            connector
                .authenticate(&id, &[Credential::password("wrong")])
                .await,
            Err(ConnectorError::AuthenticationFailure)
        ));
        assert!(matches!(
            connector
                .authenticate("unknown", &[Credential::password("secret1")])
                .await,
            Err(ConnectorError::AuthenticationFailure)
        ));

        connector
            .update_credentials_put(&id, vec![Credential::password("secret2")])
            .await
            .unwrap();
        connector
            .authenticate(&id, &[Credential::password("secret2")])
            .await
            .unwrap();
    }
}
