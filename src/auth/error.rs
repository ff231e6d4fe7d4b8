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
use thiserror::Error;

use crate::common::UserState;
use crate::federation::error::FederationProviderError;
use crate::interceptor::InterceptorError;

#[derive(Error, Debug)]
pub enum AuthenticationError {
    /// Account state does not allow the authentication.
    #[error("account is in the state {state}")]
    AccountStateBlocked {
        /// Current state of the account.
        state: UserState,
    },

    /// Unknown subject or credentials not accepted.
    #[error("authentication failure")]
    AuthenticationFailure,

    /// Parameter is already present in the authentication context.
    #[error("authentication context parameter {0} already set")]
    DuplicateParameter(String),

    #[error(transparent)]
    Federation {
        #[from]
        source: FederationProviderError,
    },

    /// Authentication rejected by the interceptor chain.
    #[error(transparent)]
    Interceptor {
        #[from]
        source: InterceptorError,
    },
}
