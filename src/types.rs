//! Identifiers and newtypes shared by the ports, builders and resolver.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote resource.
///
/// The remote API hands out numeric identifiers. Zero never names a real
/// resource and doubles as the "unset" value for optional references such as
/// a disk's source archive.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
pub struct ResourceId(u64);

impl ResourceId {
    /// The unset identifier.
    pub const EMPTY: Self = Self(0);

    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns `true` when the identifier is unset.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns `Some(self)` unless the identifier is unset.
    #[must_use]
    pub const fn non_empty(self) -> Option<Self> {
        if self.is_empty() { None } else { Some(self) }
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps the given value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the inner string.
            #[must_use]
            pub const fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &Self::Target {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    /// Name of the zone a zone-scoped resource lives in (for example `is1a`).
    Zone
);
newtype!(
    /// Free-form tag attached to a resource.
    Tag
);

/// Returns `true` when `tags` contains `wanted` exactly.
#[must_use]
pub fn has_tag(tags: &[Tag], wanted: &str) -> bool {
    tags.iter().any(|tag| tag.as_str() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, true)]
    #[case(1, false)]
    #[case(113_600_000_001, false)]
    fn resource_id_reports_emptiness(#[case] raw: u64, #[case] empty: bool) {
        let id = ResourceId::new(raw);
        assert_eq!(id.is_empty(), empty);
        assert_eq!(id.non_empty().is_none(), empty);
    }

    #[test]
    fn has_tag_matches_exactly() {
        let tags = vec![Tag::from("os-linux"), Tag::from("current-stable")];
        assert!(has_tag(&tags, "os-linux"));
        assert!(!has_tag(&tags, "os-lin"));
        assert!(!has_tag(&tags, "OS-LINUX"));
    }
}
