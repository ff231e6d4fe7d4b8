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
//! # Configuration
//!
//! Service level configuration read from the INI file. The domain topology
//! (domains, connectors and claim mappings) is not part of it: it is assembled
//! by the embedding application and handed over to
//! [`Provider::new`](crate::provider::Provider::new) already resolved.
use config::{File, FileFormat};
use eyre::{Report, WrapErr};
use serde::Deserialize;
use std::path::PathBuf;

mod common;
mod database;
mod interceptor;
mod unique_id;
mod user_state;

pub use database::DatabaseSection;
pub use interceptor::InterceptorSection;
pub use unique_id::UniqueIdSection;
pub use user_state::UserStateSection;

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Database configuration of the unique id resolver.
    #[serde(default)]
    pub database: DatabaseSection,

    /// Interceptor chain configuration.
    #[serde(default)]
    pub interceptor: InterceptorSection,

    /// Unique id resolver configuration.
    #[serde(default)]
    pub unique_id: UniqueIdSection,

    /// Account state defaults.
    #[serde(default)]
    pub user_state: UserStateSection,
}

impl Config {
    pub fn new(path: PathBuf) -> Result<Self, Report> {
        let mut builder = config::Config::builder();

        if std::path::Path::new(&path).is_file() {
            builder = builder.add_source(File::from(path).format(FileFormat::Ini));
        }

        builder.try_into()
    }
}

impl TryFrom<config::ConfigBuilder<config::builder::DefaultState>> for Config {
    type Error = Report;
    fn try_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Self::Error> {
        builder
            .set_default("unique_id.driver", "sql")?
            .set_default("interceptor.enabled", "true")?
            .set_default("interceptor.account_state_guard", "true")?
            .build()
            .wrap_err("Failed to read configuration file")?
            .try_deserialize()
            .wrap_err("Failed to parse configuration file")
    }
}
