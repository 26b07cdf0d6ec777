// ── Identifiers ──
//
// Sites and devices are keyed by random v4 UUIDs. Distinct newtypes keep a
// device id from being passed where a site id is expected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Primary key of a row in the `sites` table.
    SiteId
);

uuid_id!(
    /// Primary key of a row in the `devices` table.
    DeviceId
);

/// Draw ids from `generate` until one is not `taken`.
///
/// There is no attempt limit; the loop only ends on an unused id.
pub(crate) fn allocate_id(taken: impl Fn(&Uuid) -> bool, mut generate: impl FnMut() -> Uuid) -> Uuid {
    loop {
        let candidate = generate();
        if !taken(&candidate) {
            return candidate;
        }
        tracing::debug!(%candidate, "id collision, drawing again");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn allocation_skips_taken_ids() {
        let taken = [Uuid::from_u128(1), Uuid::from_u128(2)];
        let mut seq = (1..=3u128).map(Uuid::from_u128);
        let id = allocate_id(|c| taken.contains(c), || seq.next().unwrap());
        assert_eq!(id, Uuid::from_u128(3));
    }

    #[test]
    fn ids_parse_and_display() {
        let raw = "6f1c2b0e-8a4d-4f3e-9b7a-1c2d3e4f5a6b";
        let id: SiteId = raw.parse().unwrap();
        assert_eq!(id.to_string(), raw);
        assert!("not-a-uuid".parse::<DeviceId>().is_err());
        assert_eq!(serde_json::to_value(id).unwrap(), serde_json::json!(raw));
    }
}
