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
use sea_orm::ConnectionTrait;

use crate::db::entity::{prelude::UniqueUserGroup, unique_user_group};
use crate::error::{DatabaseError, DbContextExt};

pub async fn list_groups_of_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    Ok(UniqueUserGroup::find()
        .filter(unique_user_group::Column::UserId.eq(user_id))
        .order_by_asc(unique_user_group::Column::GroupId)
        .all(db)
        .await
        .context("listing groups of the user")?
        .into_iter()
        .map(|item| item.group_id)
        .collect())
}

pub async fn list_users_of_group<C: ConnectionTrait>(
    db: &C,
    group_id: &str,
) -> Result<Vec<String>, DatabaseError> {
    Ok(UniqueUserGroup::find()
        .filter(unique_user_group::Column::GroupId.eq(group_id))
        .order_by_asc(unique_user_group::Column::UserId)
        .all(db)
        .await
        .context("listing users of the group")?
        .into_iter()
        .map(|item| item.user_id)
        .collect())
}

/// Add (user id, group id) memberships.
pub async fn add<C: ConnectionTrait>(
    db: &C,
    memberships: Vec<(String, String)>,
) -> Result<(), DatabaseError> {
    if memberships.is_empty() {
        return Ok(());
    }
    UniqueUserGroup::insert_many(memberships.into_iter().map(|(user_id, group_id)| {
        unique_user_group::ActiveModel {
            user_id: Set(user_id),
            group_id: Set(group_id),
        }
    }))
    .exec_without_returning(db)
    .await
    .context("adding group memberships")?;
    Ok(())
}

/// Remove (user id, group id) memberships.
pub async fn remove<C: ConnectionTrait>(
    db: &C,
    memberships: Vec<(String, String)>,
) -> Result<(), DatabaseError> {
    if memberships.is_empty() {
        return Ok(());
    }
    let mut condition = Condition::any();
    for (user_id, group_id) in memberships {
        condition = condition.add(
            Condition::all()
                .add(unique_user_group::Column::UserId.eq(user_id))
                .add(unique_user_group::Column::GroupId.eq(group_id)),
        );
    }
    UniqueUserGroup::delete_many()
        .filter(condition)
        .exec(db)
        .await
        .context("removing group memberships")?;
    Ok(())
}
