//! Entity trait: identity that survives state changes.

/// Entity marker + minimal interface.
///
/// Inventory items are entities: the same key in two snapshots denotes the
/// same item, whatever its quantity or attributes.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
