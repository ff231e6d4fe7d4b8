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
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::Fixture;
use crate::claim::{Claim, ClaimError, MetaClaim};
use crate::common::UserState;
use crate::config::Config;
use crate::connector::{Attribute, ConnectorError, Credential, IdentityStoreConnector};
use crate::federation::{FederationApi, FederationProviderError, GroupCreate, UserCreate};
use crate::interceptor::InterceptorError;
use crate::plugin_manager::PluginManager;
use crate::unique_id::backend::MockUniqueIdBackend;
use crate::unique_id::{Partition, UniqueIdProviderError, UniqueIdResolverApi, UniqueUser};

fn alice() -> UserCreate {
    UserCreate::new(vec![
        Claim::new("username", "alice"),
        Claim::new("email", "alice@example.com"),
        Claim::new("phone", "555-0100"),
    ])
    .with_credentials(vec![Credential::password("secret1")])
}

fn sorted(mut claims: Vec<Claim>) -> Vec<Claim> {
    claims.sort_by(|a, b| a.claim_uri.cmp(&b.claim_uri));
    claims
}

#[tokio::test]
async fn test_add_user_spreads_over_connectors() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();

    let user = federation.add_user(&fx.state, alice(), None).await.unwrap();
    assert_eq!("PRIMARY", user.domain);
    assert_eq!(1, fx.ldap.user_count().await);
    assert_eq!(1, fx.hr.user_count().await);
    assert_eq!(1, fx.vault.credential_count().await);
    assert_eq!(0, fx.partner.user_count().await);

    let unique = fx
        .state
        .provider
        .get_unique_id_provider()
        .get_user(&fx.state, &user.id)
        .await
        .unwrap()
        .unwrap();
    // Identity partitions in the connector priority order, credentials last.
    let connectors: Vec<&str> = unique
        .partitions
        .iter()
        .map(|p| p.connector_id.as_str())
        .collect();
    assert_eq!(vec!["ldap", "hr", "vault"], connectors);

    let claims = federation
        .get_claims_of_user(&fx.state, &user.id, None)
        .await
        .unwrap();
    assert_eq!(
        vec![
            Claim::new("email", "alice@example.com"),
            Claim::new("phone", "555-0100"),
            Claim::new("username", "alice"),
        ],
        sorted(claims)
    );

    let only_phone = federation
        .get_claims_of_user(&fx.state, &user.id, Some(&[MetaClaim::new("phone")]))
        .await
        .unwrap();
    assert_eq!(vec![Claim::new("phone", "555-0100")], only_phone);
}

#[tokio::test]
async fn test_unsupported_claim_touches_no_connector() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();

    let res = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![
                Claim::new("username", "bob"),
                Claim::new("shoe_size", "44"),
            ]),
            None,
        )
        .await;
    assert!(matches!(
        res,
        Err(FederationProviderError::Claim {
            source: ClaimError::ClaimNotSupported { .. }
        })
    ));
    assert_eq!(0, fx.ldap.add_calls.load(Ordering::SeqCst));
    assert_eq!(0, fx.hr.add_calls.load(Ordering::SeqCst));

    // `phone` exists in PRIMARY only.
    let res = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![Claim::new("phone", "1")]),
            Some("PARTNER"),
        )
        .await;
    assert!(matches!(res, Err(FederationProviderError::Claim { .. })));
    assert_eq!(0, fx.partner.add_calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_add_user_validation() {
    let fx = Fixture::new();
    let res = fx
        .state
        .provider
        .get_federation_provider()
        .add_user(&fx.state, UserCreate::new(Vec::new()), None)
        .await;
    assert!(matches!(
        res,
        Err(FederationProviderError::Validation { .. })
    ));
}

#[tokio::test]
async fn test_failed_add_is_compensated() {
    let fx = Fixture::new();
    fx.hr.fail_add.store(true, Ordering::SeqCst);

    let res = fx
        .state
        .provider
        .get_federation_provider()
        .add_user(&fx.state, alice(), None)
        .await;
    match res {
        Err(FederationProviderError::Connector { source, .. }) => {
            assert!(matches!(source, ConnectorError::Backend { .. }))
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(1, fx.ldap.compensations.load(Ordering::SeqCst));
    assert_eq!(0, fx.ldap.user_count().await);
    // Credentials are stored after the identities, so none were written.
    assert_eq!(0, fx.vault.credential_count().await);
    assert!(
        fx.state
            .provider
            .get_unique_id_provider()
            .list_users(&fx.state, "PRIMARY", 0, 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_resolver_failure_is_compensated() {
    let mut backend = MockUniqueIdBackend::default();
    backend
        .expect_create_users()
        .returning(|_, _| Err(crate::unique_id::UniqueIdProviderError::Driver("down".into())));
    let mut plugin_manager = PluginManager::default();
    plugin_manager.register_unique_id_backend("broken", Arc::new(backend));
    let mut config = Config::default();
    config.unique_id.driver = "broken".into();
    let fx = Fixture::with_plugins(config, plugin_manager);

    let res = fx
        .state
        .provider
        .get_federation_provider()
        .add_user(&fx.state, alice(), None)
        .await;
    assert!(matches!(res, Err(FederationProviderError::UniqueId { .. })));
    assert_eq!(0, fx.ldap.user_count().await);
    assert_eq!(0, fx.hr.user_count().await);
    assert_eq!(0, fx.vault.credential_count().await);
    assert_eq!(1, fx.vault.compensations.load(Ordering::SeqCst));
}

/// Fixture whose resolver knows a single PRIMARY user `u1` held by `ldap`
/// and refuses to store any new partition.
fn fixture_with_failing_partition_update() -> Fixture {
    let mut backend = MockUniqueIdBackend::default();
    backend.expect_get_user().returning(|_, _| {
        Ok(Some(UniqueUser {
            id: "u1".into(),
            domain: "PRIMARY".into(),
            state: UserState::Created,
            partitions: vec![Partition::identity("ldap", "dave")],
        }))
    });
    backend
        .expect_upsert_user_partitions()
        .returning(|_, _, _| Err(UniqueIdProviderError::Driver("down".into())));
    let mut plugin_manager = PluginManager::default();
    plugin_manager.register_unique_id_backend("broken", Arc::new(backend));
    let mut config = Config::default();
    config.unique_id.driver = "broken".into();
    Fixture::with_plugins(config, plugin_manager)
}

#[tokio::test]
async fn test_failed_claim_update_is_compensated() {
    let fx = fixture_with_failing_partition_update();
    let federation = fx.state.provider.get_federation_provider();

    // `hr` holds no partition of the user, the phone creates a new entry.
    let res = federation
        .update_user_claims_patch(
            &fx.state,
            "u1",
            vec![Claim::new("phone", "555-0111")],
            Vec::new(),
        )
        .await;
    assert!(matches!(res, Err(FederationProviderError::UniqueId { .. })));
    assert_eq!(1, fx.hr.add_calls.load(Ordering::SeqCst));
    assert_eq!(1, fx.hr.compensations.load(Ordering::SeqCst));
    assert_eq!(0, fx.hr.user_count().await);

    fx.ldap
        .seed_user("dave", vec![Attribute::new("uid", "dave")])
        .await;
    let res = federation
        .update_user_claims_put(
            &fx.state,
            "u1",
            vec![
                Claim::new("username", "dave"),
                Claim::new("phone", "555-0112"),
            ],
        )
        .await;
    assert!(matches!(res, Err(FederationProviderError::UniqueId { .. })));
    assert_eq!(2, fx.hr.compensations.load(Ordering::SeqCst));
    assert_eq!(0, fx.hr.user_count().await);
}

#[tokio::test]
async fn test_failed_credential_update_is_compensated() {
    let fx = fixture_with_failing_partition_update();
    let federation = fx.state.provider.get_federation_provider();

    let res = federation
        .update_user_credentials_put(&fx.state, "u1", vec![Credential::password("first")])
        .await;
    assert!(matches!(res, Err(FederationProviderError::UniqueId { .. })));
    assert_eq!(1, fx.vault.compensations.load(Ordering::SeqCst));
    assert_eq!(0, fx.vault.credential_count().await);

    let res = federation
        .update_user_credentials_patch(
            &fx.state,
            "u1",
            vec![Credential::password("second")],
            Vec::new(),
        )
        .await;
    assert!(matches!(res, Err(FederationProviderError::UniqueId { .. })));
    assert_eq!(2, fx.vault.compensations.load(Ordering::SeqCst));
    assert_eq!(0, fx.vault.credential_count().await);
}

#[tokio::test]
async fn test_concurrent_first_sight_registration() {
    // The partition is free on the first lookup, a concurrent lookup
    // registers it before this one does.
    let lookups = AtomicUsize::new(0);
    let mut backend = MockUniqueIdBackend::default();
    backend
        .expect_find_user_by_partition()
        .returning(move |_, _, _| {
            if lookups.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(None)
            } else {
                Ok(Some("u7".into()))
            }
        });
    backend
        .expect_create_users()
        .times(1)
        .returning(|_, _| Err(UniqueIdProviderError::Conflict("duplicate partition".into())));
    backend.expect_get_user().returning(|_, user_id| {
        Ok(Some(UniqueUser {
            id: user_id.into(),
            domain: "PARTNER".into(),
            state: UserState::Created,
            partitions: vec![Partition::identity("partner", "cn=carol")],
        }))
    });
    let mut plugin_manager = PluginManager::default();
    plugin_manager.register_unique_id_backend("racing", Arc::new(backend));
    let mut config = Config::default();
    config.unique_id.driver = "racing".into();
    let fx = Fixture::with_plugins(config, plugin_manager);
    fx.partner
        .seed_user("cn=carol", vec![Attribute::new("uid", "carol")])
        .await;

    let user = fx
        .state
        .provider
        .get_federation_provider()
        .get_user_by_claim(&fx.state, &Claim::new("username", "carol"), None)
        .await
        .unwrap();
    assert_eq!("u7", user.id);
    assert_eq!("PARTNER", user.domain);
}

#[tokio::test]
async fn test_inconsistent_partition() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let resolver = fx.state.provider.get_unique_id_provider();
    fx.partner
        .seed_user("cn=ivan", vec![Attribute::new("uid", "ivan")])
        .await;

    // PRIMARY record pointing into the PARTNER connector.
    let foreign = resolver
        .add_user(&fx.state, vec![Partition::identity("partner", "cn=ivan")], "PRIMARY")
        .await
        .unwrap();
    match federation.get_claims_of_user(&fx.state, &foreign.id, None).await {
        Err(FederationProviderError::Connector {
            source: ConnectorError::ResolverInconsistency { connector_id, domain },
            ..
        }) => {
            assert_eq!("partner", connector_id);
            assert_eq!("PARTNER", domain);
        }
        other => panic!("unexpected result {other:?}"),
    }

    let unknown = resolver
        .add_user(&fx.state, vec![Partition::identity("gone", "x")], "PRIMARY")
        .await
        .unwrap();
    assert!(matches!(
        federation.delete_user(&fx.state, &unknown.id).await,
        Err(FederationProviderError::Connector {
            source: ConnectorError::UnknownConnector { .. },
            ..
        })
    ));
    // The record is kept for an operator to repair.
    assert!(federation.get_user(&fx.state, &unknown.id).await.is_ok());
}

#[tokio::test]
async fn test_claim_put_keeps_unmapped_attributes() {
    let fx = Fixture::new();
    fx.partner
        .seed_user(
            "cn=carol",
            vec![
                Attribute::new("uid", "carol"),
                Attribute::new("mail", "carol@partner.example"),
                Attribute::new("objectClass", "person"),
            ],
        )
        .await;
    let federation = fx.state.provider.get_federation_provider();
    let user = federation
        .get_user_by_claim(&fx.state, &Claim::new("username", "carol"), None)
        .await
        .unwrap();

    federation
        .update_user_claims_put(
            &fx.state,
            &user.id,
            vec![
                Claim::new("username", "carol"),
                Claim::new("email", "c2@partner.example"),
            ],
        )
        .await
        .unwrap();
    let attributes = fx
        .partner
        .get_user_attribute_values("cn=carol", None)
        .await
        .unwrap();
    assert!(attributes.contains(&Attribute::new("objectClass", "person")));
    assert!(attributes.contains(&Attribute::new("mail", "c2@partner.example")));
    assert!(!attributes.contains(&Attribute::new("mail", "carol@partner.example")));

    // Omitting a mapped claim removes it but keeps the unmapped attribute.
    federation
        .update_user_claims_put(&fx.state, &user.id, vec![Claim::new("username", "carol")])
        .await
        .unwrap();
    let mut attributes = fx
        .partner
        .get_user_attribute_values("cn=carol", None)
        .await
        .unwrap();
    attributes.sort_by(|a, b| a.attribute_name.cmp(&b.attribute_name));
    assert_eq!(
        vec![
            Attribute::new("objectClass", "person"),
            Attribute::new("uid", "carol"),
        ],
        attributes
    );
}

#[tokio::test]
async fn test_duplicate_unique_claim() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    federation.add_user(&fx.state, alice(), None).await.unwrap();

    let res = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![
                Claim::new("phone", "555-0199"),
                Claim::new("username", "alice"),
            ]),
            None,
        )
        .await;
    assert!(matches!(
        res,
        Err(FederationProviderError::Connector {
            source: ConnectorError::Conflict(_),
            ..
        })
    ));
    // `ldap` failed first, `hr` was never reached.
    assert_eq!(1, fx.hr.user_count().await);
}

#[tokio::test]
async fn test_first_sight_registration_is_stable() {
    let fx = Fixture::new();
    fx.partner
        .seed_user(
            "cn=carol",
            vec![
                Attribute::new("uid", "carol"),
                Attribute::new("mail", "carol@partner.example"),
            ],
        )
        .await;
    let federation = fx.state.provider.get_federation_provider();

    let first = federation
        .get_user_by_claim(&fx.state, &Claim::new("username", "carol"), None)
        .await
        .unwrap();
    assert_eq!("PARTNER", first.domain);
    let second = federation
        .get_user_by_claim(&fx.state, &Claim::new("email", "carol@partner.example"), None)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let unique = fx
        .state
        .provider
        .get_unique_id_provider()
        .get_user(&fx.state, &first.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(1, unique.partitions.len());
    assert_eq!("cn=carol", unique.partitions[0].connector_local_id);
}

#[tokio::test]
async fn test_lookup_respects_domain_priority() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let primary = federation.add_user(&fx.state, alice(), None).await.unwrap();
    let partner = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![Claim::new("username", "alice")]),
            Some("PARTNER"),
        )
        .await
        .unwrap();
    assert_ne!(primary.id, partner.id);

    let found = federation
        .get_user_by_claim(&fx.state, &Claim::new("username", "alice"), None)
        .await
        .unwrap();
    assert_eq!(primary.id, found.id);
    let found = federation
        .get_user_by_claim(&fx.state, &Claim::new("username", "alice"), Some("PARTNER"))
        .await
        .unwrap();
    assert_eq!(partner.id, found.id);

    let res = federation
        .get_user_by_claim(&fx.state, &Claim::new("username", "nobody"), None)
        .await;
    assert!(matches!(res, Err(FederationProviderError::UserNotFound(_))));
}

#[tokio::test]
async fn test_list_users() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    for name in ["anna", "andrew", "bert"] {
        federation
            .add_user(
                &fx.state,
                UserCreate::new(vec![Claim::new("username", name)]),
                None,
            )
            .await
            .unwrap();
    }
    federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![Claim::new("username", "antoine")]),
            Some("PARTNER"),
        )
        .await
        .unwrap();

    let all = federation
        .list_users(&fx.state, None, 0, 10, None)
        .await
        .unwrap();
    assert_eq!(4, all.len());
    let primary = federation
        .list_users(&fx.state, None, 0, 10, Some("PRIMARY"))
        .await
        .unwrap();
    assert_eq!(3, primary.len());

    let an = federation
        .list_users_by_pattern(&fx.state, &MetaClaim::new("username"), "an*", 0, 10, None)
        .await
        .unwrap();
    assert_eq!(3, an.len());
    let bert = federation
        .list_users(
            &fx.state,
            Some(&Claim::new("username", "bert")),
            0,
            10,
            None,
        )
        .await
        .unwrap();
    assert_eq!(1, bert.len());
}

#[tokio::test]
async fn test_update_claims() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let user = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![
                Claim::new("username", "dave"),
                Claim::new("email", "dave@example.com"),
            ]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(0, fx.hr.user_count().await);

    // PATCH: the phone lands in a connector without a partition yet.
    federation
        .update_user_claims_patch(
            &fx.state,
            &user.id,
            vec![Claim::new("phone", "555-0111")],
            vec![Claim::new("email", "")],
        )
        .await
        .unwrap();
    assert_eq!(1, fx.hr.user_count().await);
    assert_eq!(
        vec![
            Claim::new("phone", "555-0111"),
            Claim::new("username", "dave"),
        ],
        sorted(
            federation
                .get_claims_of_user(&fx.state, &user.id, None)
                .await
                .unwrap()
        )
    );

    // PUT: omitted claims are removed.
    federation
        .update_user_claims_put(
            &fx.state,
            &user.id,
            vec![
                Claim::new("username", "dave"),
                Claim::new("email", "d@example.com"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(
        vec![
            Claim::new("email", "d@example.com"),
            Claim::new("username", "dave"),
        ],
        sorted(
            federation
                .get_claims_of_user(&fx.state, &user.id, None)
                .await
                .unwrap()
        )
    );

    // Unsupported claims are rejected before any write.
    let res = federation
        .update_user_claims_put(
            &fx.state,
            &user.id,
            vec![
                Claim::new("username", "david"),
                Claim::new("shoe_size", "44"),
            ],
        )
        .await;
    assert!(matches!(res, Err(FederationProviderError::Claim { .. })));
    assert!(
        federation
            .get_user_by_claim(&fx.state, &Claim::new("username", "dave"), None)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_update_credentials() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let user = federation
        .add_user(
            &fx.state,
            UserCreate::new(vec![Claim::new("username", "erin")]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(0, fx.vault.credential_count().await);

    federation
        .update_user_credentials_put(&fx.state, &user.id, vec![Credential::password("first")])
        .await
        .unwrap();
    assert_eq!(1, fx.vault.credential_count().await);

    federation
        .update_user_credentials_patch(
            &fx.state,
            &user.id,
            vec![Credential::password("second")],
            Vec::new(),
        )
        .await
        .unwrap();
    // Still one credential record, the password got replaced.
    assert_eq!(1, fx.vault.credential_count().await);

    let res = federation
        .update_user_credentials_put(&fx.state, &user.id, vec![Credential::new("otp", "123")])
        .await;
    assert!(matches!(
        res,
        Err(FederationProviderError::CredentialNotSupported(_))
    ));
}

#[tokio::test]
async fn test_delete_user() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let user = federation.add_user(&fx.state, alice(), None).await.unwrap();

    fx.hr.fail_delete.store(true, Ordering::SeqCst);
    let res = federation.delete_user(&fx.state, &user.id).await;
    assert!(matches!(res, Err(FederationProviderError::Connector { .. })));
    // The resolver keeps the record so the deletion can be retried.
    assert!(federation.get_user(&fx.state, &user.id).await.is_ok());

    // `ldap` already lost the user during the first attempt.
    fx.hr.fail_delete.store(false, Ordering::SeqCst);
    federation.delete_user(&fx.state, &user.id).await.unwrap();
    assert_eq!(0, fx.ldap.user_count().await);
    assert_eq!(0, fx.hr.user_count().await);
    assert_eq!(0, fx.vault.credential_count().await);
    assert!(matches!(
        federation.get_user(&fx.state, &user.id).await,
        Err(FederationProviderError::UserNotFound(_))
    ));
    assert!(matches!(
        federation
            .get_user_by_claim(&fx.state, &Claim::new("username", "alice"), None)
            .await,
        Err(FederationProviderError::UserNotFound(_))
    ));
}

#[tokio::test]
async fn test_groups() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let group = federation
        .add_group(
            &fx.state,
            GroupCreate::new(vec![Claim::new("username", "admins")]),
            None,
        )
        .await
        .unwrap();
    assert_eq!("PRIMARY", group.domain);

    let found = federation
        .get_group_by_claim(&fx.state, &Claim::new("username", "admins"), None)
        .await
        .unwrap();
    assert_eq!(group, found);

    federation
        .update_group_claims_patch(
            &fx.state,
            &group.id,
            vec![Claim::new("email", "admins@example.com")],
            Vec::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        vec![
            Claim::new("email", "admins@example.com"),
            Claim::new("username", "admins"),
        ],
        sorted(
            federation
                .get_claims_of_group(&fx.state, &group.id, None)
                .await
                .unwrap()
        )
    );

    let listed = federation
        .list_groups(&fx.state, &MetaClaim::new("username"), "adm*", 0, 10, None)
        .await
        .unwrap();
    assert_eq!(vec![group.clone()], listed);

    federation.delete_group(&fx.state, &group.id).await.unwrap();
    assert!(matches!(
        federation.get_group(&fx.state, &group.id).await,
        Err(FederationProviderError::GroupNotFound(_))
    ));
}

#[tokio::test]
async fn test_disabled_user_is_not_modified() {
    let fx = Fixture::new();
    let federation = fx.state.provider.get_federation_provider();
    let user = federation.add_user(&fx.state, alice(), None).await.unwrap();
    federation
        .set_user_state(&fx.state, &user.id, crate::common::UserState::Disabled)
        .await
        .unwrap();

    let res = federation
        .update_user_claims_patch(
            &fx.state,
            &user.id,
            vec![Claim::new("email", "new@example.com")],
            Vec::new(),
        )
        .await;
    assert!(matches!(
        res,
        Err(FederationProviderError::Interceptor {
            source: InterceptorError::Rejected { .. }
        })
    ));
    let res = federation
        .update_groups_of_user_put(&fx.state, &user.id, BTreeSet::new())
        .await;
    assert!(matches!(res, Err(FederationProviderError::Interceptor { .. })));
}
