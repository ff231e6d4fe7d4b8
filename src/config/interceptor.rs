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
use serde::Deserialize;

use super::common::{default_true, flexible_bool};

#[derive(Debug, Deserialize, Clone)]
pub struct InterceptorSection {
    /// Run the interceptor chain around the public operations.
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub enabled: bool,

    /// Register the built-in interceptor rejecting modifications of disabled
    /// accounts.
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub account_state_guard: bool,

    /// Lock the account after that many consecutive authentication failures.
    /// `0` disables the lockout interceptor.
    #[serde(default)]
    pub max_failed_attempts: u32,
}

impl Default for InterceptorSection {
    fn default() -> Self {
        Self {
            enabled: true,
            account_state_guard: true,
            max_failed_attempts: 0,
        }
    }
}
