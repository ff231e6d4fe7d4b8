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
//! # Claims
//!
//! Claims are the connector independent representation of the user and group
//! data. A claim is stored by exactly one identity store connector of a domain
//! under a connector native attribute name as described by the
//! [`MetaClaimMapping`] of the domain.

pub mod error;
pub mod translator;
pub mod types;

pub use error::ClaimError;
pub use types::*;
