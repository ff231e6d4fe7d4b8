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
pub use super::unique_group::Entity as UniqueGroup;
pub use super::unique_group_partition::Entity as UniqueGroupPartition;
pub use super::unique_user::Entity as UniqueUser;
pub use super::unique_user_group::Entity as UniqueUserGroup;
pub use super::unique_user_partition::Entity as UniqueUserPartition;
