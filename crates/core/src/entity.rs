//! Entity trait: identity + continuity across state changes.

use uuid::Uuid;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    ///
    /// Every identifier in this system is a UUID newtype, which lets storage
    /// backends key records without knowing the concrete type.
    type Id: Copy
        + Eq
        + core::hash::Hash
        + core::fmt::Debug
        + core::fmt::Display
        + Send
        + Sync
        + From<Uuid>
        + Into<Uuid>;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
