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
//! Refuse modifications of disabled accounts.
use async_trait::async_trait;
use tracing::debug;

use super::{Interceptor, InterceptorError, Operation};
use crate::common::UserStateGroup;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdResolverApi;

/// Reject claim, credential and membership updates of accounts whose state
/// belongs to the `DISABLED` group.
#[derive(Debug, Default)]
pub struct AccountStateInterceptor {}

#[async_trait]
impl Interceptor for AccountStateInterceptor {
    fn name(&self) -> &str {
        "account_state_guard"
    }

    fn execution_order(&self) -> i32 {
        -100
    }

    async fn pre<'a>(
        &self,
        state: &ServiceState,
        operation: &Operation<'a>,
    ) -> Result<(), InterceptorError> {
        let Some(user_id) = operation.modified_user() else {
            return Ok(());
        };
        let user = state
            .provider
            .get_unique_id_provider()
            .get_user(state, user_id)
            .await
            .map_err(|err| InterceptorError::Failure {
                interceptor: self.name().into(),
                message: err.to_string(),
            })?;
        // Unknown users are reported by the operation itself.
        if let Some(user) = user
            && user.state.group() == UserStateGroup::Disabled
        {
            debug!("refusing {} of the disabled user {}", operation.name(), user_id);
            return Err(InterceptorError::Rejected {
                interceptor: self.name().into(),
                reason: format!("user {} is {}", user_id, user.state),
            });
        }
        Ok(())
    }
}
