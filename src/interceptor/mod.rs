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
//! # Interceptor chain
//!
//! Ordered hooks wrapped around every public operation of the federation
//! coordinator and the authentication engine. A pre-hook may reject the
//! operation before any connector is touched. Post and failure hooks only
//! observe: their errors are logged and never change the result of the
//! operation.
use async_trait::async_trait;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod account_state;
pub mod error;
pub mod lockout;
pub mod types;

use crate::service::ServiceState;
pub use account_state::AccountStateInterceptor;
pub use error::InterceptorError;
pub use lockout::FailedLoginInterceptor;
pub use types::*;

/// Hook around the public operations.
#[async_trait]
pub trait Interceptor: Send + Sync + std::fmt::Debug {
    /// Name of the interceptor used in the logs and rejections.
    fn name(&self) -> &str;

    /// Lower values run first.
    fn execution_order(&self) -> i32 {
        0
    }

    fn is_enabled(&self) -> bool {
        true
    }

    /// Invoked before the operation. An error aborts the operation.
    async fn pre<'a>(
        &self,
        _state: &ServiceState,
        _operation: &Operation<'a>,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Invoked after the operation succeeded.
    async fn post<'a>(
        &self,
        _state: &ServiceState,
        _operation: &Operation<'a>,
        _outcome: &OperationOutcome<'a>,
    ) -> Result<(), InterceptorError> {
        Ok(())
    }

    /// Invoked after the operation failed.
    async fn failed<'a>(
        &self,
        _state: &ServiceState,
        _operation: &Operation<'a>,
        _error: &(dyn Error + Send + Sync + 'static),
    ) -> Result<(), InterceptorError> {
        Ok(())
    }
}

/// Interceptors sorted by their execution order.
#[derive(Clone, Debug, Default)]
pub struct InterceptorChain {
    enabled: bool,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new(enabled: bool, mut interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        // Stable: equal orders keep the registration order.
        interceptors.sort_by_key(|interceptor| interceptor.execution_order());
        Self {
            enabled,
            interceptors,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    fn active(&self) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.interceptors
            .iter()
            .filter(move |interceptor| self.enabled && interceptor.is_enabled())
    }

    /// Run `operation` wrapped by the hooks of the chain.
    ///
    /// The future is not polled when a pre-hook rejects the operation.
    pub async fn intercept<'a, T, E, F>(
        &self,
        state: &ServiceState,
        operation: Operation<'a>,
        fut: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>> + Send,
        T: AsOutcome + Send,
        E: From<InterceptorError> + Error + Send + Sync + 'static,
    {
        for interceptor in self.active() {
            if let Err(err) = interceptor.pre(state, &operation).await {
                debug!(
                    "{} interrupted by the interceptor {}: {}",
                    operation.name(),
                    interceptor.name(),
                    err
                );
                return Err(err.into());
            }
        }

        let result = fut.await;

        match &result {
            Ok(value) => {
                let outcome = value.as_outcome();
                for interceptor in self.active() {
                    if let Err(err) = interceptor.post(state, &operation, &outcome).await {
                        warn!(
                            "post hook of {} for {} failed: {}",
                            interceptor.name(),
                            operation.name(),
                            err
                        );
                    }
                }
            }
            Err(error) => {
                for interceptor in self.active() {
                    if let Err(err) = interceptor.failed(state, &operation, error).await {
                        warn!(
                            "failure hook of {} for {} failed: {}",
                            interceptor.name(),
                            operation.name(),
                            err
                        );
                    }
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use tracing_test::traced_test;

    use super::*;
    use crate::config::Config;
    use crate::provider::Provider;
    use crate::service::Service;

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("boom")]
        Boom,
        #[error(transparent)]
        Interceptor(#[from] InterceptorError),
    }

    #[derive(Debug)]
    struct Recorder {
        name: String,
        order: i32,
        reject: bool,
        fail_post: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &str, order: i32, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name: name.into(),
                order,
                reject: false,
                fail_post: false,
                log: log.clone(),
            }
        }

        fn record(&self, hook: &str) {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, hook));
        }
    }

    #[async_trait]
    impl Interceptor for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn execution_order(&self) -> i32 {
            self.order
        }

        async fn pre<'a>(
            &self,
            _state: &ServiceState,
            _operation: &Operation<'a>,
        ) -> Result<(), InterceptorError> {
            self.record("pre");
            if self.reject {
                return Err(InterceptorError::Rejected {
                    interceptor: self.name.clone(),
                    reason: "test".into(),
                });
            }
            Ok(())
        }

        async fn post<'a>(
            &self,
            _state: &ServiceState,
            _operation: &Operation<'a>,
            _outcome: &OperationOutcome<'a>,
        ) -> Result<(), InterceptorError> {
            self.record("post");
            if self.fail_post {
                return Err(InterceptorError::Failure {
                    interceptor: self.name.clone(),
                    message: "post".into(),
                });
            }
            Ok(())
        }

        async fn failed<'a>(
            &self,
            _state: &ServiceState,
            _operation: &Operation<'a>,
            _error: &(dyn Error + Send + Sync + 'static),
        ) -> Result<(), InterceptorError> {
            self.record("failed");
            Ok(())
        }
    }

    fn get_state() -> ServiceState {
        let provider = Provider::mocked_builder().build().unwrap();
        Arc::new(
            Service::new(
                Config::default(),
                sea_orm::DatabaseConnection::Disconnected,
                provider,
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_order_and_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(
            true,
            vec![
                Arc::new(Recorder::new("late", 10, &log)),
                Arc::new(Recorder::new("early", -10, &log)),
                Arc::new(Recorder::new("default", 0, &log)),
            ],
        );
        let res: Result<bool, TestError> = chain
            .intercept(
                &get_state(),
                Operation::GetUser { user_id: "u" },
                async { Ok(true) },
            )
            .await;
        assert!(res.unwrap());
        assert_eq!(
            vec![
                "early:pre",
                "default:pre",
                "late:pre",
                "early:post",
                "default:post",
                "late:post"
            ],
            *log.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn test_rejection_skips_operation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut guard = Recorder::new("guard", 0, &log);
        guard.reject = true;
        let chain = InterceptorChain::new(
            true,
            vec![Arc::new(guard), Arc::new(Recorder::new("next", 1, &log))],
        );
        let executed = Arc::new(Mutex::new(false));
        let flag = executed.clone();
        let res: Result<(), TestError> = chain
            .intercept(
                &get_state(),
                Operation::DeleteUser { user_id: "u" },
                async move {
                    *flag.lock().unwrap() = true;
                    Ok(())
                },
            )
            .await;
        assert!(matches!(
            res,
            Err(TestError::Interceptor(InterceptorError::Rejected { .. }))
        ));
        assert!(!*executed.lock().unwrap());
        assert_eq!(vec!["guard:pre"], *log.lock().unwrap());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_post_failure_does_not_change_result() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut noisy = Recorder::new("noisy", 0, &log);
        noisy.fail_post = true;
        let chain = InterceptorChain::new(true, vec![Arc::new(noisy)]);
        let res: Result<bool, TestError> = chain
            .intercept(
                &get_state(),
                Operation::GetUser { user_id: "u" },
                async { Ok(false) },
            )
            .await;
        assert!(!res.unwrap());
        assert!(logs_contain("post hook of noisy for get_user failed"));
    }

    #[tokio::test]
    async fn test_failed_hook_sees_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = InterceptorChain::new(true, vec![Arc::new(Recorder::new("obs", 0, &log))]);
        let res: Result<bool, TestError> = chain
            .intercept(
                &get_state(),
                Operation::GetUser { user_id: "u" },
                async { Err(TestError::Boom) },
            )
            .await;
        assert!(matches!(res, Err(TestError::Boom)));
        assert_eq!(vec!["obs:pre", "obs:failed"], *log.lock().unwrap());
    }

    #[tokio::test]
    async fn test_disabled_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut guard = Recorder::new("guard", 0, &log);
        guard.reject = true;
        let chain = InterceptorChain::new(false, vec![Arc::new(guard)]);
        let res: Result<bool, TestError> = chain
            .intercept(
                &get_state(),
                Operation::GetUser { user_id: "u" },
                async { Ok(true) },
            )
            .await;
        assert!(res.unwrap());
        assert!(log.lock().unwrap().is_empty());
    }
}
