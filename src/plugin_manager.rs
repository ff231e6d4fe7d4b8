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
//! # Plugin manager
//!
//! Custom resolver backends and interceptors are registered here before the
//! [`Provider`](crate::provider::Provider) is assembled. Built-in backends
//! (`sql`, `memory`) do not need to be registered: a registered backend with
//! the same name takes precedence over them.
use std::collections::HashMap;
use std::sync::Arc;

use crate::interceptor::Interceptor;
use crate::unique_id::backend::UniqueIdBackend;

/// Plugin manager allowing to pass custom backend plugins implementing required
/// trait during the service start.
#[derive(Clone, Default)]
pub struct PluginManager {
    /// Custom interceptors in the registration order.
    interceptors: Vec<Arc<dyn Interceptor>>,
    /// Unique id resolver backend plugins.
    unique_id_backends: HashMap<String, Arc<dyn UniqueIdBackend>>,
}

impl PluginManager {
    /// Register unique id resolver backend.
    pub fn register_unique_id_backend<S: AsRef<str>>(
        &mut self,
        name: S,
        plugin: Arc<dyn UniqueIdBackend>,
    ) {
        self.unique_id_backends
            .insert(name.as_ref().to_string(), plugin);
    }

    /// Get registered unique id resolver backend.
    pub fn get_unique_id_backend<S: AsRef<str>>(
        &self,
        name: S,
    ) -> Option<&Arc<dyn UniqueIdBackend>> {
        self.unique_id_backends.get(name.as_ref())
    }

    /// Register custom interceptor.
    pub fn register_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Registered interceptors.
    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }
}
