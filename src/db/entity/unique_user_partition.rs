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
#[sea_orm(table_name = "unique_user_partition")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub connector_id: String,
    pub connector_local_id: String,
    pub identity_store: bool,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::unique_user::Entity",
        from = "Column::UserId",
        to = "super::unique_user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    UniqueUser,
}

impl Related<super::unique_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UniqueUser.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
