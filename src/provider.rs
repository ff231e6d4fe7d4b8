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
//! # Provider manager
//!
//! Provider manager provides access to the individual subsystems. This gives
//! an easy way of passing the overall manager down to the subsystems that
//! need to call each other while also allowing an easy injection of the test
//! doubles.
use derive_builder::Builder;
use std::sync::Arc;
use tracing::info;

use crate::auth::{AuthenticationApi, AuthenticationEngine};
use crate::config::Config;
use crate::domain::DomainRegistry;
use crate::error::FederationError;
use crate::federation::{FederationApi, FederationCoordinator};
use crate::interceptor::{
    AccountStateInterceptor, FailedLoginInterceptor, Interceptor, InterceptorChain,
};
use crate::plugin_manager::PluginManager;
use crate::unique_id::{UniqueIdResolverApi, UniqueIdResolverProvider};

/// Global provider manager.
#[derive(Builder, Clone)]
#[builder(pattern = "owned")]
pub struct Provider {
    /// Configuration.
    pub config: Config,
    /// Domain topology.
    domains: Arc<DomainRegistry>,
    /// Interceptor chain wrapping the public operations.
    interceptors: InterceptorChain,
    /// Unique id resolver.
    unique_id: UniqueIdResolverProvider,
    /// Federation coordinator.
    #[builder(default)]
    federation: FederationCoordinator,
    /// Authentication engine.
    #[builder(default)]
    authentication: AuthenticationEngine,
}

impl Provider {
    pub fn new(
        cfg: Config,
        plugin_manager: PluginManager,
        domains: DomainRegistry,
    ) -> Result<Self, FederationError> {
        let unique_id_provider = UniqueIdResolverProvider::new(&cfg, &plugin_manager)?;

        let mut interceptors: Vec<Arc<dyn Interceptor>> = plugin_manager.interceptors().to_vec();
        if cfg.interceptor.account_state_guard {
            interceptors.push(Arc::new(AccountStateInterceptor::default()));
        }
        if cfg.interceptor.max_failed_attempts > 0 {
            interceptors.push(Arc::new(FailedLoginInterceptor::new(
                cfg.interceptor.max_failed_attempts,
            )));
        }
        let chain = InterceptorChain::new(cfg.interceptor.enabled, interceptors);
        info!(
            "{} interceptor(s) registered, chain enabled: {}",
            chain.len(),
            chain.is_enabled()
        );

        Ok(Self {
            config: cfg,
            domains: Arc::new(domains),
            interceptors: chain,
            unique_id: unique_id_provider,
            federation: FederationCoordinator::default(),
            authentication: AuthenticationEngine::default(),
        })
    }

    /// Get the authentication engine.
    pub fn get_authentication_provider(&self) -> &impl AuthenticationApi {
        &self.authentication
    }

    /// Get the domain registry.
    pub fn get_domain_registry(&self) -> &DomainRegistry {
        &self.domains
    }

    /// Get the federation coordinator.
    pub fn get_federation_provider(&self) -> &impl FederationApi {
        &self.federation
    }

    /// Get the interceptor chain.
    pub fn get_interceptor_chain(&self) -> &InterceptorChain {
        &self.interceptors
    }

    /// Get the unique id resolver.
    pub fn get_unique_id_provider(&self) -> &impl UniqueIdResolverApi {
        &self.unique_id
    }
}

#[cfg(test)]
impl Provider {
    /// Builder with the in-memory resolver, an empty interceptor chain and a
    /// single empty `PRIMARY` domain.
    pub fn mocked_builder() -> ProviderBuilder {
        let mut config = Config::default();
        config.unique_id.driver = "memory".into();
        let unique_id = UniqueIdResolverProvider::new(&config, &PluginManager::default())
            .expect("memory resolver");
        let domains = DomainRegistry::new(vec![
            crate::domain::Domain::builder("PRIMARY", 1)
                .build()
                .expect("empty domain"),
        ])
        .expect("registry");

        ProviderBuilder::default()
            .config(config)
            .domains(Arc::new(domains))
            .interceptors(InterceptorChain::default())
            .unique_id(unique_id)
    }
}
