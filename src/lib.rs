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

//! # Identity federation
//!
//! A virtual identity store presenting one logical user and group directory
//! on top of any number of independently owned backend connectors.
//!
//! Connectors are grouped into *domains*. Every domain has a priority (`1`
//! being the primary domain), an ordered list of identity store connectors
//! (holding user and group attributes), an ordered list of credential store
//! connectors (holding secrets) and a set of claim mappings telling which
//! connector stores which claim under which attribute name.
//!
//! The building blocks are:
//!
//! - [`connector`]: the contracts every backend implements, plus an in-memory
//!   implementation.
//!
//! - [`claim`]: claims and their translation to connector attributes.
//!
//! - [`domain`]: domains and the boot-time immutable [`domain::DomainRegistry`].
//!
//! - [`unique_id`]: the resolver mapping a global id of a user or group to the
//!   partitions (connector + connector local id) holding its data.
//!
//! - [`federation`]: the coordinator orchestrating user and group operations
//!   over the connectors of a domain, compensating partial writes.
//!
//! - [`auth`]: the authentication engine gating credential verification on
//!   the account state.
//!
//! - [`interceptor`]: ordered pre/post hooks around every public operation.
//!
//! Backends are not transactional and not owned by this crate. A write that
//! spans several connectors is compensated on a best-effort basis, only the
//! resolver persistence is transactional.

pub mod auth;
pub mod claim;
pub mod common;
pub mod config;
pub mod connector;
pub mod db;
pub mod db_migration;
pub mod domain;
pub mod error;
pub mod federation;
pub mod interceptor;
pub mod plugin_manager;
pub mod provider;
pub mod service;
pub mod unique_id;

#[cfg(test)]
mod tests;
