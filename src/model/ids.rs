//! Newtype IDs for type-safe identification of tracking graph elements.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., passing a link ID where a detection ID is expected).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! tracking_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            #[doc = concat!("Creates a new ", stringify!($name), ".")]
            #[inline]
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying integer value.
            #[inline]
            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(i64::from(id))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

tracking_id!(
    /// A unique identifier for a detection (graph node).
    DetectionId
);

tracking_id!(
    /// A unique identifier for a link between two detections (graph edge).
    LinkId
);

tracking_id!(
    /// An identifier for a track. Track ids are ephemeral: an import assigns
    /// fresh ones from the connected components of the link graph.
    TrackId
);
