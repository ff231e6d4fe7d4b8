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
#[sea_orm(table_name = "unique_user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub domain: String,
    pub state: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unique_user_partition::Entity")]
    UniqueUserPartition,
    #[sea_orm(has_many = "super::unique_user_group::Entity")]
    UniqueUserGroup,
}

impl Related<super::unique_user_partition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UniqueUserPartition.def()
    }
}

impl Related<super::unique_user_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UniqueUserGroup.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
