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
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "unique_group_partition")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub connector_id: String,
    pub connector_local_id: String,
    pub identity_store: bool,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::unique_group::Entity",
        from = "Column::GroupId",
        to = "super::unique_group::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UniqueGroup,
}

impl Related<super::unique_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UniqueGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
