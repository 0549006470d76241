//! Domain identifier types with proper encapsulation.
//!
//! Every identifier is a string newtype: chat platforms hand out opaque
//! snowflake strings for users and tenants, and items/commands are named.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new `", stringify!($name), "` from a string.")]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            #[doc = concat!("Get the `", stringify!($name), "` as a string slice.")]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

string_id! {
    /// Account identifier.
    UserId
}

string_id! {
    /// Catalog item identifier (e.g. `megaphone`).
    ItemId
}

string_id! {
    /// Rate-limited command identifier (e.g. `work`).
    CommandId
}

string_id! {
    /// Tenant (guild/server) identifier. Each tenant owns an isolated economy.
    TenantId
}

string_id! {
    /// Tradable asset identifier.
    ///
    /// Every asset is issued by the account with the same identifier, so a
    /// price series always has an owning [`UserId`].
    AssetId
}

impl AssetId {
    /// The account that issues this asset.
    #[must_use]
    pub fn owner(&self) -> UserId {
        UserId::new(self.0.clone())
    }
}

impl From<&UserId> for AssetId {
    fn from(user: &UserId) -> Self {
        Self::new(user.as_str())
    }
}
