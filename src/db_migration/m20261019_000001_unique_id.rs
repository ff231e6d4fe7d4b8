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

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UniqueUser::Table)
                    .if_not_exists()
                    .col(string_len(UniqueUser::Id, 64).primary_key())
                    .col(string_len(UniqueUser::Domain, 255))
                    .col(string_len(UniqueUser::State, 64))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UniqueUserPartition::Table)
                    .if_not_exists()
                    .col(string_len(UniqueUserPartition::UserId, 64))
                    .col(string_len(UniqueUserPartition::ConnectorId, 255))
                    .col(string_len(UniqueUserPartition::ConnectorLocalId, 255))
                    .col(boolean(UniqueUserPartition::IdentityStore))
                    .col(integer(UniqueUserPartition::Position))
                    .primary_key(
                        Index::create()
                            .col(UniqueUserPartition::UserId)
                            .col(UniqueUserPartition::ConnectorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-unique-user-partition-user")
                            .from(UniqueUserPartition::Table, UniqueUserPartition::UserId)
                            .to(UniqueUser::Table, UniqueUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-unique-user-partition-local-id")
                    .unique()
                    .table(UniqueUserPartition::Table)
                    .col(UniqueUserPartition::ConnectorLocalId)
                    .col(UniqueUserPartition::ConnectorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UniqueGroup::Table)
                    .if_not_exists()
                    .col(string_len(UniqueGroup::Id, 64).primary_key())
                    .col(string_len(UniqueGroup::Domain, 255))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UniqueGroupPartition::Table)
                    .if_not_exists()
                    .col(string_len(UniqueGroupPartition::GroupId, 64))
                    .col(string_len(UniqueGroupPartition::ConnectorId, 255))
                    .col(string_len(UniqueGroupPartition::ConnectorLocalId, 255))
                    .col(boolean(UniqueGroupPartition::IdentityStore))
                    .col(integer(UniqueGroupPartition::Position))
                    .primary_key(
                        Index::create()
                            .col(UniqueGroupPartition::GroupId)
                            .col(UniqueGroupPartition::ConnectorId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-unique-group-partition-group")
                            .from(UniqueGroupPartition::Table, UniqueGroupPartition::GroupId)
                            .to(UniqueGroup::Table, UniqueGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-unique-group-partition-local-id")
                    .unique()
                    .table(UniqueGroupPartition::Table)
                    .col(UniqueGroupPartition::ConnectorLocalId)
                    .col(UniqueGroupPartition::ConnectorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UniqueUserGroup::Table)
                    .if_not_exists()
                    .col(string_len(UniqueUserGroup::UserId, 64))
                    .col(string_len(UniqueUserGroup::GroupId, 64))
                    .primary_key(
                        Index::create()
                            .col(UniqueUserGroup::UserId)
                            .col(UniqueUserGroup::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-unique-user-group-user")
                            .from(UniqueUserGroup::Table, UniqueUserGroup::UserId)
                            .to(UniqueUser::Table, UniqueUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-unique-user-group-group")
                            .from(UniqueUserGroup::Table, UniqueUserGroup::GroupId)
                            .to(UniqueGroup::Table, UniqueGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UniqueUserGroup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UniqueGroupPartition::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UniqueGroup::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UniqueUserPartition::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UniqueUser::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum UniqueUser {
    Table,
    Id,
    Domain,
    State,
}

#[derive(DeriveIden)]
enum UniqueUserPartition {
    Table,
    UserId,
    ConnectorId,
    ConnectorLocalId,
    IdentityStore,
    Position,
}

#[derive(DeriveIden)]
enum UniqueGroup {
    Table,
    Id,
    Domain,
}

#[derive(DeriveIden)]
enum UniqueGroupPartition {
    Table,
    GroupId,
    ConnectorId,
    ConnectorLocalId,
    IdentityStore,
    Position,
}

#[derive(DeriveIden)]
enum UniqueUserGroup {
    Table,
    UserId,
    GroupId,
}
