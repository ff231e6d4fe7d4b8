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

use sea_orm::entity::*;
use sea_orm::query::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::collections::HashMap;
use std::str::FromStr;

use crate::common::UserState;
use crate::db::entity::{
    prelude::{UniqueUser as DbUniqueUser, UniqueUserGroup, UniqueUserPartition},
    unique_user, unique_user_group, unique_user_partition,
};
use crate::error::DbContextExt;
use crate::unique_id::UniqueIdProviderError;
use crate::unique_id::types::{Partition, UniqueUser};

fn partition_model(user_id: &str, position: i32, partition: &Partition) -> unique_user_partition::ActiveModel {
    unique_user_partition::ActiveModel {
        user_id: Set(user_id.to_string()),
        connector_id: Set(partition.connector_id.clone()),
        connector_local_id: Set(partition.connector_local_id.clone()),
        identity_store: Set(partition.identity_store),
        position: Set(position),
    }
}

fn to_unique_user(
    user: unique_user::Model,
    partitions: Vec<unique_user_partition::Model>,
) -> Result<UniqueUser, UniqueIdProviderError> {
    Ok(UniqueUser {
        state: UserState::from_str(&user.state)?,
        id: user.id,
        domain: user.domain,
        partitions: partitions
            .into_iter()
            .map(|p| Partition {
                connector_id: p.connector_id,
                connector_local_id: p.connector_local_id,
                identity_store: p.identity_store,
            })
            .collect(),
    })
}

/// Persist users with all their partitions in a single transaction.
pub async fn create(
    db: &DatabaseConnection,
    users: Vec<UniqueUser>,
) -> Result<(), UniqueIdProviderError> {
    if users.is_empty() {
        return Ok(());
    }
    let mut rows = Vec::with_capacity(users.len());
    let mut partitions = Vec::new();
    for user in users {
        partitions.extend(
            user.partitions
                .iter()
                .enumerate()
                .map(|(pos, partition)| partition_model(&user.id, pos as i32, partition)),
        );
        rows.push(unique_user::ActiveModel {
            id: Set(user.id),
            domain: Set(user.domain),
            state: Set(user.state.to_string()),
        });
    }

    let txn = db
        .begin()
        .await
        .context("starting transaction for persisting users")?;
    DbUniqueUser::insert_many(rows)
        .exec_without_returning(&txn)
        .await
        .context("persisting users")?;
    if !partitions.is_empty() {
        UniqueUserPartition::insert_many(partitions)
            .exec_without_returning(&txn)
            .await
            .context("persisting user partitions")?;
    }
    txn.commit().await.context("committing new users")?;
    Ok(())
}

pub async fn get<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Option<UniqueUser>, UniqueIdProviderError> {
    let Some(user) = DbUniqueUser::find_by_id(user_id)
        .one(db)
        .await
        .context("fetching the user")?
    else {
        return Ok(None);
    };
    let partitions = UniqueUserPartition::find()
        .filter(unique_user_partition::Column::UserId.eq(user_id))
        .order_by_asc(unique_user_partition::Column::Position)
        .all(db)
        .await
        .context("fetching partitions of the user")?;
    Ok(Some(to_unique_user(user, partitions)?))
}

pub async fn find_by_partition<C: ConnectionTrait>(
    db: &C,
    connector_id: &str,
    connector_local_id: &str,
) -> Result<Option<String>, UniqueIdProviderError> {
    Ok(UniqueUserPartition::find()
        .filter(unique_user_partition::Column::ConnectorId.eq(connector_id))
        .filter(unique_user_partition::Column::ConnectorLocalId.eq(connector_local_id))
        .one(db)
        .await
        .context("looking up the user by the partition")?
        .map(|partition| partition.user_id))
}

/// Insert missing partitions and point existing ones to the new local ids.
pub async fn upsert_partitions(
    db: &DatabaseConnection,
    user_id: &str,
    partitions: Vec<Partition>,
) -> Result<(), UniqueIdProviderError> {
    let txn = db
        .begin()
        .await
        .context("starting transaction for updating user partitions")?;
    if DbUniqueUser::find_by_id(user_id)
        .one(&txn)
        .await
        .context("fetching the user")?
        .is_none()
    {
        return Err(UniqueIdProviderError::UserNotFound(user_id.into()));
    }
    let current = UniqueUserPartition::find()
        .filter(unique_user_partition::Column::UserId.eq(user_id))
        .all(&txn)
        .await
        .context("fetching partitions of the user")?;
    let mut position = current
        .iter()
        .map(|row| row.position + 1)
        .max()
        .unwrap_or(0);

    for partition in partitions {
        match current
            .iter()
            .find(|row| row.connector_id == partition.connector_id)
        {
            Some(row) if row.connector_local_id == partition.connector_local_id => {}
            Some(_) => {
                UniqueUserPartition::update_many()
                    .col_expr(
                        unique_user_partition::Column::ConnectorLocalId,
                        Expr::value(partition.connector_local_id.clone()),
                    )
                    .filter(unique_user_partition::Column::UserId.eq(user_id))
                    .filter(
                        unique_user_partition::Column::ConnectorId
                            .eq(partition.connector_id.as_str()),
                    )
                    .exec(&txn)
                    .await
                    .context("updating the user partition")?;
            }
            None => {
                UniqueUserPartition::insert(partition_model(user_id, position, &partition))
                    .exec_without_returning(&txn)
                    .await
                    .context("adding the user partition")?;
                position += 1;
            }
        }
    }
    txn.commit()
        .await
        .context("committing user partitions")?;
    Ok(())
}

/// Delete the user with its partitions and memberships.
pub async fn delete(db: &DatabaseConnection, user_id: &str) -> Result<(), UniqueIdProviderError> {
    let txn = db
        .begin()
        .await
        .context("starting transaction for deleting the user")?;
    UniqueUserGroup::delete_many()
        .filter(unique_user_group::Column::UserId.eq(user_id))
        .exec(&txn)
        .await
        .context("deleting group memberships of the user")?;
    UniqueUserPartition::delete_many()
        .filter(unique_user_partition::Column::UserId.eq(user_id))
        .exec(&txn)
        .await
        .context("deleting partitions of the user")?;
    let res = DbUniqueUser::delete_by_id(user_id)
        .exec(&txn)
        .await
        .context("deleting the user")?;
    if res.rows_affected == 0 {
        return Err(UniqueIdProviderError::UserNotFound(user_id.into()));
    }
    txn.commit().await.context("committing the user deletion")?;
    Ok(())
}

pub async fn list<C: ConnectionTrait>(
    db: &C,
    domain: &str,
    offset: usize,
    length: usize,
) -> Result<Vec<UniqueUser>, UniqueIdProviderError> {
    let users = DbUniqueUser::find()
        .filter(unique_user::Column::Domain.eq(domain))
        .order_by_asc(unique_user::Column::Id)
        .offset(offset as u64)
        .limit(length as u64)
        .all(db)
        .await
        .context("listing users")?;
    if users.is_empty() {
        return Ok(Vec::new());
    }
    let mut partitions: HashMap<String, Vec<unique_user_partition::Model>> = HashMap::new();
    for partition in UniqueUserPartition::find()
        .filter(unique_user_partition::Column::UserId.is_in(users.iter().map(|u| u.id.clone())))
        .order_by_asc(unique_user_partition::Column::UserId)
        .order_by_asc(unique_user_partition::Column::Position)
        .all(db)
        .await
        .context("listing partitions of the users")?
    {
        partitions
            .entry(partition.user_id.clone())
            .or_default()
            .push(partition);
    }
    users
        .into_iter()
        .map(|user| {
            let user_partitions = partitions.remove(&user.id).unwrap_or_default();
            to_unique_user(user, user_partitions)
        })
        .collect()
}

pub async fn set_state<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    user_state: UserState,
) -> Result<(), UniqueIdProviderError> {
    let res = DbUniqueUser::update_many()
        .col_expr(unique_user::Column::State, Expr::value(user_state.as_str()))
        .filter(unique_user::Column::Id.eq(user_id))
        .exec(db)
        .await
        .context("updating the user state")?;
    if res.rows_affected == 0 {
        return Err(UniqueIdProviderError::UserNotFound(user_id.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};

    use super::super::tests::{get_user_mock, get_user_partition_mock};
    use super::*;

    fn new_user() -> UniqueUser {
        UniqueUser {
            id: "u1".into(),
            domain: "PRIMARY".into(),
            state: UserState::Created,
            partitions: vec![
                Partition::identity("c1", "c1-u1"),
                Partition::credential("k1", "k1-u1"),
            ],
        }
    }

    #[tokio::test]
    async fn test_get() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_mock("u1")]])
            .append_query_results([vec![
                get_user_partition_mock("u1", "c1", 0),
                get_user_partition_mock("u1", "k1", 1),
            ]])
            .into_connection();

        assert_eq!(Some(new_user()), get(&db, "u1").await.unwrap());
        assert_eq!(2, db.into_transaction_log().len());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<unique_user::Model>::new()])
            .into_connection();

        assert!(get(&db, "u1").await.unwrap().is_none());
        // partitions are not queried for the missing user
        assert_eq!(1, db.into_transaction_log().len());
    }

    #[tokio::test]
    async fn test_get_unknown_state() {
        let mut user = get_user_mock("u1");
        user.state = "FROZEN".into();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user]])
            .append_query_results([Vec::<unique_user_partition::Model>::new()])
            .into_connection();

        assert!(matches!(
            get(&db, "u1").await,
            Err(UniqueIdProviderError::UnknownUserState { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_partition() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_partition_mock("u1", "c1", 0)]])
            .append_query_results([Vec::<unique_user_partition::Model>::new()])
            .into_connection();

        assert_eq!(
            Some("u1".to_string()),
            find_by_partition(&db, "c1", "c1-u1").await.unwrap()
        );
        assert!(find_by_partition(&db, "c1", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    rows_affected: 1,
                    ..Default::default()
                },
                MockExecResult {
                    rows_affected: 2,
                    ..Default::default()
                },
            ])
            .into_connection();

        create(&db, vec![new_user()]).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_partition_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                ..Default::default()
            }])
            .append_exec_errors([DbErr::Custom("insert failed".into())])
            .into_connection();

        assert!(matches!(
            create(&db, vec![new_user()]).await,
            Err(UniqueIdProviderError::Driver(..))
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_mock("u1"), get_user_mock("u2")]])
            .append_query_results([vec![
                get_user_partition_mock("u1", "c1", 0),
                get_user_partition_mock("u1", "k1", 1),
                get_user_partition_mock("u2", "c1", 0),
            ]])
            .into_connection();

        let users = list(&db, "PRIMARY", 0, 10).await.unwrap();
        assert_eq!(2, users.len());
        assert_eq!(new_user(), users[0]);
        assert_eq!(
            vec![Partition::identity("c1", "c1-u2")],
            users[1].partitions
        );
    }

    #[tokio::test]
    async fn test_set_state_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                rows_affected: 0,
                ..Default::default()
            }])
            .into_connection();

        assert!(matches!(
            set_state(&db, "u1", UserState::Disabled).await,
            Err(UniqueIdProviderError::UserNotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_upsert_partitions() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_user_mock("u1")]])
            .append_query_results([vec![get_user_partition_mock("u1", "c1", 0)]])
            .append_exec_results([
                MockExecResult {
                    rows_affected: 1,
                    ..Default::default()
                },
                MockExecResult {
                    rows_affected: 1,
                    ..Default::default()
                },
            ])
            .into_connection();

        upsert_partitions(
            &db,
            "u1",
            vec![
                Partition::identity("c1", "renamed"),
                Partition::identity("c2", "c2-u1"),
            ],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult::default(),
                MockExecResult::default(),
                MockExecResult::default(),
            ])
            .into_connection();

        assert!(matches!(
            delete(&db, "u1").await,
            Err(UniqueIdProviderError::UserNotFound(..))
        ));
    }
}
