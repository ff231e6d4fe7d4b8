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

use crate::db::entity::{
    prelude::{UniqueGroup as DbUniqueGroup, UniqueGroupPartition, UniqueUserGroup},
    unique_group, unique_group_partition, unique_user_group,
};
use crate::error::DbContextExt;
use crate::unique_id::UniqueIdProviderError;
use crate::unique_id::types::{Partition, UniqueGroup};

fn partition_model(
    group_id: &str,
    position: i32,
    partition: &Partition,
) -> unique_group_partition::ActiveModel {
    unique_group_partition::ActiveModel {
        group_id: Set(group_id.to_string()),
        connector_id: Set(partition.connector_id.clone()),
        connector_local_id: Set(partition.connector_local_id.clone()),
        identity_store: Set(partition.identity_store),
        position: Set(position),
    }
}

fn to_unique_group(
    group: unique_group::Model,
    partitions: Vec<unique_group_partition::Model>,
) -> UniqueGroup {
    UniqueGroup {
        id: group.id,
        domain: group.domain,
        partitions: partitions
            .into_iter()
            .map(|p| Partition {
                connector_id: p.connector_id,
                connector_local_id: p.connector_local_id,
                identity_store: p.identity_store,
            })
            .collect(),
    }
}

pub async fn create(db: &DatabaseConnection, group: UniqueGroup) -> Result<(), UniqueIdProviderError> {
    let partitions: Vec<unique_group_partition::ActiveModel> = group
        .partitions
        .iter()
        .enumerate()
        .map(|(pos, partition)| partition_model(&group.id, pos as i32, partition))
        .collect();

    let txn = db
        .begin()
        .await
        .context("starting transaction for persisting the group")?;
    DbUniqueGroup::insert(unique_group::ActiveModel {
        id: Set(group.id),
        domain: Set(group.domain),
    })
    .exec_without_returning(&txn)
    .await
    .context("persisting the group")?;
    if !partitions.is_empty() {
        UniqueGroupPartition::insert_many(partitions)
            .exec_without_returning(&txn)
            .await
            .context("persisting group partitions")?;
    }
    txn.commit().await.context("committing the new group")?;
    Ok(())
}

pub async fn get<C: ConnectionTrait>(
    db: &C,
    group_id: &str,
) -> Result<Option<UniqueGroup>, UniqueIdProviderError> {
    let Some(group) = DbUniqueGroup::find_by_id(group_id)
        .one(db)
        .await
        .context("fetching the group")?
    else {
        return Ok(None);
    };
    let partitions = UniqueGroupPartition::find()
        .filter(unique_group_partition::Column::GroupId.eq(group_id))
        .order_by_asc(unique_group_partition::Column::Position)
        .all(db)
        .await
        .context("fetching partitions of the group")?;
    Ok(Some(to_unique_group(group, partitions)))
}

pub async fn find_by_partition<C: ConnectionTrait>(
    db: &C,
    connector_id: &str,
    connector_local_id: &str,
) -> Result<Option<String>, UniqueIdProviderError> {
    Ok(UniqueGroupPartition::find()
        .filter(unique_group_partition::Column::ConnectorId.eq(connector_id))
        .filter(unique_group_partition::Column::ConnectorLocalId.eq(connector_local_id))
        .one(db)
        .await
        .context("looking up the group by the partition")?
        .map(|partition| partition.group_id))
}

pub async fn upsert_partitions(
    db: &DatabaseConnection,
    group_id: &str,
    partitions: Vec<Partition>,
) -> Result<(), UniqueIdProviderError> {
    let txn = db
        .begin()
        .await
        .context("starting transaction for updating group partitions")?;
    if DbUniqueGroup::find_by_id(group_id)
        .one(&txn)
        .await
        .context("fetching the group")?
        .is_none()
    {
        return Err(UniqueIdProviderError::GroupNotFound(group_id.into()));
    }
    let current = UniqueGroupPartition::find()
        .filter(unique_group_partition::Column::GroupId.eq(group_id))
        .all(&txn)
        .await
        .context("fetching partitions of the group")?;
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
                UniqueGroupPartition::update_many()
                    .col_expr(
                        unique_group_partition::Column::ConnectorLocalId,
                        Expr::value(partition.connector_local_id.clone()),
                    )
                    .filter(unique_group_partition::Column::GroupId.eq(group_id))
                    .filter(
                        unique_group_partition::Column::ConnectorId
                            .eq(partition.connector_id.as_str()),
                    )
                    .exec(&txn)
                    .await
                    .context("updating the group partition")?;
            }
            None => {
                UniqueGroupPartition::insert(partition_model(group_id, position, &partition))
                    .exec_without_returning(&txn)
                    .await
                    .context("adding the group partition")?;
                position += 1;
            }
        }
    }
    txn.commit()
        .await
        .context("committing group partitions")?;
    Ok(())
}

pub async fn delete(db: &DatabaseConnection, group_id: &str) -> Result<(), UniqueIdProviderError> {
    let txn = db
        .begin()
        .await
        .context("starting transaction for deleting the group")?;
    UniqueUserGroup::delete_many()
        .filter(unique_user_group::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await
        .context("deleting memberships of the group")?;
    UniqueGroupPartition::delete_many()
        .filter(unique_group_partition::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await
        .context("deleting partitions of the group")?;
    let res = DbUniqueGroup::delete_by_id(group_id)
        .exec(&txn)
        .await
        .context("deleting the group")?;
    if res.rows_affected == 0 {
        return Err(UniqueIdProviderError::GroupNotFound(group_id.into()));
    }
    txn.commit().await.context("committing the group deletion")?;
    Ok(())
}

pub async fn list<C: ConnectionTrait>(
    db: &C,
    domain: &str,
    offset: usize,
    length: usize,
) -> Result<Vec<UniqueGroup>, UniqueIdProviderError> {
    let groups = DbUniqueGroup::find()
        .filter(unique_group::Column::Domain.eq(domain))
        .order_by_asc(unique_group::Column::Id)
        .offset(offset as u64)
        .limit(length as u64)
        .all(db)
        .await
        .context("listing groups")?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let mut partitions: HashMap<String, Vec<unique_group_partition::Model>> = HashMap::new();
    for partition in UniqueGroupPartition::find()
        .filter(
            unique_group_partition::Column::GroupId.is_in(groups.iter().map(|g| g.id.clone())),
        )
        .order_by_asc(unique_group_partition::Column::GroupId)
        .order_by_asc(unique_group_partition::Column::Position)
        .all(db)
        .await
        .context("listing partitions of the groups")?
    {
        partitions
            .entry(partition.group_id.clone())
            .or_default()
            .push(partition);
    }
    Ok(groups
        .into_iter()
        .map(|group| {
            let group_partitions = partitions.remove(&group.id).unwrap_or_default();
            to_unique_group(group, group_partitions)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::super::tests::{get_group_mock, get_group_partition_mock};
    use super::*;

    #[tokio::test]
    async fn test_get() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_group_mock("g1")]])
            .append_query_results([vec![get_group_partition_mock("g1", "c1", 0)]])
            .into_connection();

        assert_eq!(
            Some(UniqueGroup {
                id: "g1".into(),
                domain: "PRIMARY".into(),
                partitions: vec![Partition::identity("c1", "c1-g1")],
            }),
            get(&db, "g1").await.unwrap()
        );
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
                    rows_affected: 1,
                    ..Default::default()
                },
            ])
            .into_connection();

        create(
            &db,
            UniqueGroup {
                id: "g1".into(),
                domain: "PRIMARY".into(),
                partitions: vec![Partition::identity("c1", "c1-g1")],
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_missing_group() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<unique_group::Model>::new()])
            .into_connection();

        assert!(matches!(
            upsert_partitions(&db, "g1", vec![Partition::identity("c1", "x")]).await,
            Err(UniqueIdProviderError::GroupNotFound(..))
        ));
    }

    #[tokio::test]
    async fn test_list() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![get_group_mock("g1"), get_group_mock("g2")]])
            .append_query_results([vec![get_group_partition_mock("g2", "c1", 0)]])
            .into_connection();

        let groups = list(&db, "PRIMARY", 0, 10).await.unwrap();
        assert_eq!(2, groups.len());
        assert!(groups[0].partitions.is_empty());
        assert_eq!(1, groups[1].partitions.len());
    }
}
