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
//! Scenario tests running the coordinator, the authentication engine and the
//! interceptors over in-memory connectors and the in-memory resolver.
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::claim::MetaClaimMapping;
use crate::config::Config;
use crate::connector::*;
use crate::domain::{Domain, DomainRegistry};
use crate::plugin_manager::PluginManager;
use crate::provider::Provider;
use crate::service::{Service, ServiceState};

mod federation;

/// Identity connector wrapper counting the calls and failing on demand.
#[derive(Debug)]
pub(crate) struct RecordingIdentityConnector {
    inner: InMemoryIdentityStoreConnector,
    pub fail_add: AtomicBool,
    pub fail_delete: AtomicBool,
    pub add_calls: AtomicUsize,
    pub compensations: AtomicUsize,
}

impl RecordingIdentityConnector {
    pub fn new(inner: InMemoryIdentityStoreConnector) -> Self {
        Self {
            inner,
            fail_add: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            add_calls: AtomicUsize::new(0),
            compensations: AtomicUsize::new(0),
        }
    }

    pub async fn user_count(&self) -> usize {
        self.inner.user_count().await
    }

    pub async fn seed_user(&self, user_id: &str, attributes: Vec<Attribute>) {
        self.inner.seed_user(user_id, attributes).await
    }
}

#[async_trait]
impl IdentityStoreConnector for RecordingIdentityConnector {
    fn connector_id(&self) -> &str {
        self.inner.connector_id()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    async fn get_connector_user_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError> {
        self.inner.get_connector_user_id(attribute_name, value).await
    }

    async fn list_connector_user_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_user_ids(attribute_name, value, offset, length)
            .await
    }

    async fn list_connector_user_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_user_ids_by_pattern(attribute_name, pattern, offset, length)
            .await
    }

    async fn get_user_attribute_values<'a>(
        &self,
        user_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.inner
            .get_user_attribute_values(user_id, attribute_names)
            .await
    }

    async fn add_user(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_add.load(Ordering::SeqCst) {
            return Err(ConnectorError::backend(self.connector_id(), "add refused"));
        }
        self.inner.add_user(attributes).await
    }

    async fn update_user_attributes_put<'a>(
        &self,
        user_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_user_attributes_put(user_id, attributes)
            .await
    }

    async fn update_user_attributes_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_user_attributes_patch(user_id, add, remove)
            .await
    }

    async fn delete_user<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ConnectorError::backend(self.connector_id(), "delete refused"));
        }
        self.inner.delete_user(user_id).await
    }

    async fn remove_added_users_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        self.compensations.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_added_users_in_a_failure(user_ids).await
    }

    async fn get_connector_group_id<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
    ) -> Result<Option<String>, ConnectorError> {
        self.inner.get_connector_group_id(attribute_name, value).await
    }

    async fn list_connector_group_ids<'a>(
        &self,
        attribute_name: &'a str,
        value: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_group_ids(attribute_name, value, offset, length)
            .await
    }

    async fn list_connector_group_ids_by_pattern<'a>(
        &self,
        attribute_name: &'a str,
        pattern: &'a str,
        offset: usize,
        length: usize,
    ) -> Result<Vec<String>, ConnectorError> {
        self.inner
            .list_connector_group_ids_by_pattern(attribute_name, pattern, offset, length)
            .await
    }

    async fn get_group_attribute_values<'a>(
        &self,
        group_id: &'a str,
        attribute_names: Option<&'a [String]>,
    ) -> Result<Vec<Attribute>, ConnectorError> {
        self.inner
            .get_group_attribute_values(group_id, attribute_names)
            .await
    }

    async fn add_group(&self, attributes: Vec<Attribute>) -> Result<String, ConnectorError> {
        self.inner.add_group(attributes).await
    }

    async fn update_group_attributes_put<'a>(
        &self,
        group_id: &'a str,
        attributes: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_group_attributes_put(group_id, attributes)
            .await
    }

    async fn update_group_attributes_patch<'a>(
        &self,
        group_id: &'a str,
        add: Vec<Attribute>,
        remove: Vec<Attribute>,
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_group_attributes_patch(group_id, add, remove)
            .await
    }

    async fn delete_group<'a>(&self, group_id: &'a str) -> Result<(), ConnectorError> {
        self.inner.delete_group(group_id).await
    }

    async fn remove_added_groups_in_a_failure<'a>(
        &self,
        group_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        self.inner.remove_added_groups_in_a_failure(group_ids).await
    }
}

/// Credential connector wrapper counting the verifications.
#[derive(Debug)]
pub(crate) struct RecordingCredentialConnector {
    inner: InMemoryCredentialStoreConnector,
    pub authenticate_calls: AtomicUsize,
    pub compensations: AtomicUsize,
}

impl RecordingCredentialConnector {
    pub fn new(inner: InMemoryCredentialStoreConnector) -> Self {
        Self {
            inner,
            authenticate_calls: AtomicUsize::new(0),
            compensations: AtomicUsize::new(0),
        }
    }

    pub async fn credential_count(&self) -> usize {
        self.inner.credential_count().await
    }
}

#[async_trait]
impl CredentialStoreConnector for RecordingCredentialConnector {
    fn connector_id(&self) -> &str {
        self.inner.connector_id()
    }

    fn priority(&self) -> u32 {
        self.inner.priority()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn can_handle(&self, credentials: &[Credential]) -> bool {
        self.inner.can_handle(credentials)
    }

    async fn authenticate<'a>(
        &self,
        user_id: &'a str,
        credentials: &'a [Credential],
    ) -> Result<(), ConnectorError> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.authenticate(user_id, credentials).await
    }

    async fn add_credential(&self, credentials: Vec<Credential>) -> Result<String, ConnectorError> {
        self.inner.add_credential(credentials).await
    }

    async fn update_credentials_put<'a>(
        &self,
        user_id: &'a str,
        credentials: Vec<Credential>,
    ) -> Result<String, ConnectorError> {
        self.inner.update_credentials_put(user_id, credentials).await
    }

    async fn update_credentials_patch<'a>(
        &self,
        user_id: &'a str,
        add: Vec<Credential>,
        remove: Vec<Credential>,
    ) -> Result<String, ConnectorError> {
        self.inner
            .update_credentials_patch(user_id, add, remove)
            .await
    }

    async fn delete_credential<'a>(&self, user_id: &'a str) -> Result<(), ConnectorError> {
        self.inner.delete_credential(user_id).await
    }

    async fn remove_added_credentials_in_a_failure<'a>(
        &self,
        user_ids: &'a [String],
    ) -> Result<(), ConnectorError> {
        self.compensations.fetch_add(1, Ordering::SeqCst);
        self.inner
            .remove_added_credentials_in_a_failure(user_ids)
            .await
    }
}

/// Two domains over in-memory connectors.
///
/// `PRIMARY` (1): `ldap` holds `username` (unique) and `email`, `hr` holds
/// `phone`, `vault` stores passwords.
/// `PARTNER` (2): `partner` holds `username` and `email`, `partner-vault`
/// stores passwords.
pub(crate) struct Fixture {
    pub state: ServiceState,
    pub ldap: Arc<RecordingIdentityConnector>,
    pub hr: Arc<RecordingIdentityConnector>,
    pub vault: Arc<RecordingCredentialConnector>,
    pub partner: Arc<RecordingIdentityConnector>,
    pub partner_vault: Arc<RecordingCredentialConnector>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(mut config: Config) -> Self {
        config.unique_id.driver = "memory".into();
        Self::with_plugins(config, PluginManager::default())
    }

    pub fn with_plugins(config: Config, plugin_manager: PluginManager) -> Self {
        let ldap = Arc::new(RecordingIdentityConnector::new(
            InMemoryIdentityStoreConnector::new("ldap", 1).with_unique_attribute("uid"),
        ));
        let hr = Arc::new(RecordingIdentityConnector::new(
            InMemoryIdentityStoreConnector::new("hr", 2),
        ));
        let vault = Arc::new(RecordingCredentialConnector::new(
            InMemoryCredentialStoreConnector::new("vault", 1),
        ));
        let partner = Arc::new(RecordingIdentityConnector::new(
            InMemoryIdentityStoreConnector::new("partner", 1),
        ));
        let partner_vault = Arc::new(RecordingCredentialConnector::new(
            InMemoryCredentialStoreConnector::new("partner-vault", 1),
        ));

        let primary = Domain::builder("PRIMARY", 1)
            .identity_connector(hr.clone())
            .identity_connector(ldap.clone())
            .credential_connector(vault.clone())
            .claim_mapping(MetaClaimMapping::new("username", "ldap", "uid").unique())
            .claim_mapping(MetaClaimMapping::new("email", "ldap", "mail"))
            .claim_mapping(MetaClaimMapping::new("phone", "hr", "mobile"))
            .build()
            .unwrap();
        let secondary = Domain::builder("PARTNER", 2)
            .identity_connector(partner.clone())
            .credential_connector(partner_vault.clone())
            .claim_mapping(MetaClaimMapping::new("username", "partner", "uid").unique())
            .claim_mapping(MetaClaimMapping::new("email", "partner", "mail"))
            .build()
            .unwrap();
        let registry = DomainRegistry::new(vec![secondary, primary]).unwrap();

        let provider = Provider::new(config.clone(), plugin_manager, registry).unwrap();
        let state = Arc::new(
            Service::new(config, DatabaseConnection::Disconnected, provider).unwrap(),
        );
        Self {
            state,
            ldap,
            hr,
            vault,
            partner,
            partner_vault,
        }
    }
}
