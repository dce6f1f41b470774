//! Shared building blocks: identifiers, domain errors, entity and value-object traits.
//!
//! This crate contains **pure** primitives used by every other crate in the
//! workspace (no IO, no async, no configuration lookups).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{RunId, StreamId};
pub use value_object::ValueObject;
