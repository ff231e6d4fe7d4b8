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
//! Lock accounts after repeated authentication failures.
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Interceptor, InterceptorError, Operation, OperationOutcome};
use crate::auth::error::AuthenticationError;
use crate::common::UserState;
use crate::federation;
use crate::service::ServiceState;
use crate::unique_id::UniqueIdResolverApi;

/// Count failed authentications per user and move the account to
/// [`UserState::LockedInvalidCredential`] once `max_attempts` is reached. A
/// successful authentication resets the counter.
///
/// Counters live in memory of the process.
#[derive(Debug)]
pub struct FailedLoginInterceptor {
    max_attempts: u32,
    failures: Mutex<HashMap<String, u32>>,
}

impl FailedLoginInterceptor {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Current number of consecutive failures of the user.
    pub async fn failures_of(&self, user_id: &str) -> u32 {
        self.failures
            .lock()
            .await
            .get(user_id)
            .copied()
            .unwrap_or_default()
    }

    fn failure(&self, message: impl ToString) -> InterceptorError {
        InterceptorError::Failure {
            interceptor: self.name().into(),
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl Interceptor for FailedLoginInterceptor {
    fn name(&self) -> &str {
        "failed_login_lockout"
    }

    fn execution_order(&self) -> i32 {
        100
    }

    fn is_enabled(&self) -> bool {
        self.max_attempts > 0
    }

    async fn post<'a>(
        &self,
        _state: &ServiceState,
        _operation: &Operation<'a>,
        outcome: &OperationOutcome<'a>,
    ) -> Result<(), InterceptorError> {
        if let OperationOutcome::Authentication(context) = outcome {
            self.failures.lock().await.remove(context.user_id());
        }
        Ok(())
    }

    async fn failed<'a>(
        &self,
        state: &ServiceState,
        operation: &Operation<'a>,
        error: &(dyn Error + Send + Sync + 'static),
    ) -> Result<(), InterceptorError> {
        let Operation::Authenticate { claim, domain } = operation else {
            return Ok(());
        };
        if !matches!(
            error.downcast_ref::<AuthenticationError>(),
            Some(AuthenticationError::AuthenticationFailure)
        ) {
            return Ok(());
        }
        let user = match federation::user::get_user_by_claim(state, claim, *domain).await {
            Ok(user) => user,
            Err(err) => {
                debug!("failed authentication of an unknown subject: {}", err);
                return Ok(());
            }
        };

        let attempts = {
            let mut failures = self.failures.lock().await;
            let counter = failures.entry(user.id.clone()).or_default();
            *counter += 1;
            let attempts = *counter;
            if attempts >= self.max_attempts {
                failures.remove(&user.id);
            }
            attempts
        };
        if attempts < self.max_attempts {
            debug!(
                "user {} failed to authenticate {} time(s)",
                user.id, attempts
            );
            return Ok(());
        }

        info!(
            "locking user {} after {} failed authentications",
            user.id, attempts
        );
        state
            .provider
            .get_unique_id_provider()
            .set_user_state(state, &user.id, UserState::LockedInvalidCredential)
            .await
            .map_err(|err| self.failure(err))
    }
}
