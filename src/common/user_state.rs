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
//! # Account state
//!
//! The concrete state of an account records *why* it is in its current
//! situation (self sign-up awaiting confirmation, too many invalid
//! credentials, administrative reset, ...). Only the [`UserStateGroup`] of the
//! state is relevant for authentication, transitions between the concrete
//! states are decided by external policy.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Concrete account state.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum UserState {
    /// Freshly created account.
    #[default]
    #[serde(rename = "CREATED")]
    Created,
    #[serde(rename = "UNLOCKED__VERIFIED")]
    UnlockedVerified,
    #[serde(rename = "UNLOCKED__UNVERIFIED")]
    UnlockedUnverified,
    /// Self signed-up account waiting for the confirmation.
    #[serde(rename = "LOCKED__SELF_SIGN_UP")]
    LockedSelfSignUp,
    #[serde(rename = "LOCKED__UNVERIFIED")]
    LockedUnverified,
    /// Locked after too many invalid credentials.
    #[serde(rename = "LOCKED__INVALID_CREDENTIAL")]
    LockedInvalidCredential,
    /// Locked after too many invalid challenge answers.
    #[serde(rename = "LOCKED__INVALID_ANSWER")]
    LockedInvalidAnswer,
    /// Administrator forced a password reset.
    #[serde(rename = "LOCKED__ADMIN_FORCED_RESET")]
    LockedAdminForcedReset,
    #[serde(rename = "LOCKED__ADMIN")]
    LockedAdmin,
    #[serde(rename = "DISABLED")]
    Disabled,
    #[serde(rename = "DISABLED__LOCKED__UNVERIFIED")]
    DisabledLockedUnverified,
    #[serde(rename = "DISABLED__UNLOCKED__UNVERIFIED")]
    DisabledUnlockedUnverified,
}

/// Group of the account states.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum UserStateGroup {
    #[serde(rename = "LOCKED")]
    Locked,
    #[serde(rename = "UNLOCKED")]
    Unlocked,
    #[serde(rename = "DISABLED")]
    Disabled,
}

impl UserStateGroup {
    /// Whether accounts of the group are refused to authenticate.
    pub fn blocks_authentication(&self) -> bool {
        !matches!(self, Self::Unlocked)
    }
}

impl UserState {
    /// Group the state belongs to.
    pub fn group(&self) -> UserStateGroup {
        match self {
            Self::Created | Self::UnlockedVerified | Self::UnlockedUnverified => {
                UserStateGroup::Unlocked
            }
            Self::LockedSelfSignUp
            | Self::LockedUnverified
            | Self::LockedInvalidCredential
            | Self::LockedInvalidAnswer
            | Self::LockedAdminForcedReset
            | Self::LockedAdmin => UserStateGroup::Locked,
            Self::Disabled | Self::DisabledLockedUnverified | Self::DisabledUnlockedUnverified => {
                UserStateGroup::Disabled
            }
        }
    }

    /// Persisted name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::UnlockedVerified => "UNLOCKED__VERIFIED",
            Self::UnlockedUnverified => "UNLOCKED__UNVERIFIED",
            Self::LockedSelfSignUp => "LOCKED__SELF_SIGN_UP",
            Self::LockedUnverified => "LOCKED__UNVERIFIED",
            Self::LockedInvalidCredential => "LOCKED__INVALID_CREDENTIAL",
            Self::LockedInvalidAnswer => "LOCKED__INVALID_ANSWER",
            Self::LockedAdminForcedReset => "LOCKED__ADMIN_FORCED_RESET",
            Self::LockedAdmin => "LOCKED__ADMIN",
            Self::Disabled => "DISABLED",
            Self::DisabledLockedUnverified => "DISABLED__LOCKED__UNVERIFIED",
            Self::DisabledUnlockedUnverified => "DISABLED__UNLOCKED__UNVERIFIED",
        }
    }
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown account state name.
#[derive(Debug, thiserror::Error)]
#[error("unknown user state {0}")]
pub struct UnknownUserState(pub String);

impl FromStr for UserState {
    type Err = UnknownUserState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CREATED" => Self::Created,
            "UNLOCKED__VERIFIED" => Self::UnlockedVerified,
            "UNLOCKED__UNVERIFIED" => Self::UnlockedUnverified,
            "LOCKED__SELF_SIGN_UP" => Self::LockedSelfSignUp,
            "LOCKED__UNVERIFIED" => Self::LockedUnverified,
            "LOCKED__INVALID_CREDENTIAL" => Self::LockedInvalidCredential,
            "LOCKED__INVALID_ANSWER" => Self::LockedInvalidAnswer,
            "LOCKED__ADMIN_FORCED_RESET" => Self::LockedAdminForcedReset,
            "LOCKED__ADMIN" => Self::LockedAdmin,
            "DISABLED" => Self::Disabled,
            "DISABLED__LOCKED__UNVERIFIED" => Self::DisabledLockedUnverified,
            "DISABLED__UNLOCKED__UNVERIFIED" => Self::DisabledUnlockedUnverified,
            other => return Err(UnknownUserState(other.into())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups() {
        assert_eq!(UserStateGroup::Unlocked, UserState::Created.group());
        assert_eq!(
            UserStateGroup::Locked,
            UserState::LockedInvalidCredential.group()
        );
        assert_eq!(
            UserStateGroup::Disabled,
            UserState::DisabledLockedUnverified.group()
        );
        assert!(!UserStateGroup::Unlocked.blocks_authentication());
        assert!(UserStateGroup::Locked.blocks_authentication());
        assert!(UserStateGroup::Disabled.blocks_authentication());
    }

    #[test]
    fn test_persisted_name() {
        for state in [
            UserState::Created,
            UserState::LockedAdminForcedReset,
            UserState::DisabledUnlockedUnverified,
        ] {
            assert_eq!(state, UserState::from_str(state.as_str()).unwrap());
        }
        assert!(UserState::from_str("FOO").is_err());
    }
}
