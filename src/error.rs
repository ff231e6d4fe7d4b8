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
//! # Error
//!
//! Errors of the federation engine assembly and the shared database error
//! handling.
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::auth::error::AuthenticationError;
use crate::domain::error::DomainError;
use crate::federation::error::FederationProviderError;
use crate::unique_id::error::UniqueIdProviderError;

/// Federation engine error.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Authentication engine error.
    #[error(transparent)]
    Authentication {
        #[from]
        source: AuthenticationError,
    },

    /// Domain topology is invalid.
    #[error(transparent)]
    Domain {
        #[from]
        source: DomainError,
    },

    /// Federation coordinator error.
    #[error(transparent)]
    Federation {
        #[from]
        source: FederationProviderError,
    },

    #[error(transparent)]
    IO {
        #[from]
        source: std::io::Error,
    },

    /// Provider manager could not be assembled.
    #[error(transparent)]
    StructBuilder {
        #[from]
        source: BuilderError,
    },

    /// Unique id resolver error.
    #[error(transparent)]
    UniqueId {
        #[from]
        source: UniqueIdProviderError,
    },
}

/// Database operation error.
///
/// Raw `DbErr` is never returned to the caller. Every call site attaches the
/// description of the operation which failed.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Unique or foreign key constraint violation.
    #[error("{message} (while {context})")]
    Conflict {
        /// Message reported by the database.
        message: String,
        /// Operation context.
        context: String,
    },

    /// Any other database error.
    #[error("database error while {context}")]
    Database {
        /// The source of the error.
        source: DbErr,
        /// Operation context.
        context: String,
    },
}

/// Attach the operation context to a database error.
pub trait DbContextExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T, DatabaseError>;
}

impl<T> DbContextExt<T> for Result<T, DbErr> {
    fn context<C: Into<String>>(self, context: C) -> Result<T, DatabaseError> {
        self.map_err(|source| match source.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(message))
            | Some(SqlErr::ForeignKeyConstraintViolation(message)) => DatabaseError::Conflict {
                message,
                context: context.into(),
            },
            _ => DatabaseError::Database {
                source,
                context: context.into(),
            },
        })
    }
}

/// Error of the structures built with `derive_builder`.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BuilderError(String);

impl From<derive_builder::UninitializedFieldError> for BuilderError {
    fn from(value: derive_builder::UninitializedFieldError) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BuilderError {
    fn from(value: String) -> Self {
        Self(value)
    }
}
