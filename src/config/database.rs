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
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Database holding the unique id resolver tables.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct DatabaseSection {
    /// Database URL.
    ///
    /// The SQLAlchemy style `<scheme>+<driver>://` notation is accepted to
    /// allow sharing the connection string with other services.
    #[serde(default)]
    pub connection: SecretString,
}

impl DatabaseSection {
    /// Connection URL with the optional `+driver` suffix of the scheme removed.
    pub fn get_connection(&self) -> SecretString {
        let url = self.connection.expose_secret();
        let Some((scheme, rest)) = url.split_once("://") else {
            return self.connection.clone();
        };
        match Regex::new(r"^(?<scheme>\w+)\+\w+$") {
            Ok(re) if re.is_match(scheme) => {
                let plain = re.replace(scheme, "${scheme}");
                SecretString::from(format!("{plain}://{rest}"))
            }
            _ => self.connection.clone(),
        }
    }
}
