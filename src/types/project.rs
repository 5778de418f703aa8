//! Project and user records supplied by the platform store.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ids::{ProjectId, UserId};

/// Default-branch protection applied when a branch is first pushed as the
/// project's default.
///
/// Configured as an integer code or the string `"none"`:
/// - `"none"`: no protection record is created
/// - `0`: only privileged users may push
/// - `1`: developers may push
/// - any other integer (or absent): protected, privileged pushers only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtectionLevel {
    /// Explicitly unprotected.
    Unprotected,
    /// Protected; only privileged users may push.
    #[default]
    PrivilegedOnly,
    /// Protected; developers may push.
    DevelopersCanPush,
    /// Protected with an unrecognised code; treated as privileged-only.
    Restricted(i64),
}

impl ProtectionLevel {
    /// Maps a numeric configuration code to a level.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => ProtectionLevel::PrivilegedOnly,
            1 => ProtectionLevel::DevelopersCanPush,
            other => ProtectionLevel::Restricted(other),
        }
    }

    /// The `developers_can_push` flag for the protection record, or `None`
    /// when no record should be created.
    pub fn developers_can_push(&self) -> Option<bool> {
        match self {
            ProtectionLevel::Unprotected => None,
            ProtectionLevel::DevelopersCanPush => Some(true),
            ProtectionLevel::PrivilegedOnly | ProtectionLevel::Restricted(_) => Some(false),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawProtectionLevel {
    Code(i64),
    Name(String),
}

impl Serialize for ProtectionLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let raw = match self {
            ProtectionLevel::Unprotected => RawProtectionLevel::Name("none".to_string()),
            ProtectionLevel::PrivilegedOnly => RawProtectionLevel::Code(0),
            ProtectionLevel::DevelopersCanPush => RawProtectionLevel::Code(1),
            ProtectionLevel::Restricted(code) => RawProtectionLevel::Code(*code),
        };
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProtectionLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawProtectionLevel::deserialize(deserializer)? {
            RawProtectionLevel::Code(code) => Ok(ProtectionLevel::from_code(code)),
            RawProtectionLevel::Name(name) if name.eq_ignore_ascii_case("none") => {
                Ok(ProtectionLevel::Unprotected)
            }
            RawProtectionLevel::Name(name) => Err(serde::de::Error::custom(format!(
                "unknown protection level {name:?}, expected an integer or \"none\""
            ))),
        }
    }
}

/// Project metadata as seen at push time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Namespaced path, e.g. `group/project`. Used in web and commit URLs.
    pub path_with_namespace: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Clone URL reported as `repository.url` in the push payload.
    pub clone_url: String,
    /// Configured default branch. `None` until the first branch is pushed.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub branch_protection: ProtectionLevel,
}

impl Project {
    /// Web URL of the project under the given instance base URL.
    pub fn web_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.path_with_namespace
        )
    }
}

/// A local user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name.
    pub name: String,
    pub username: String,
    pub email: String,
}
