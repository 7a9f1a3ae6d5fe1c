//! Pure data structures: items, collections, mutations and their derived projections.
//!
//! Nothing in this module performs I/O. Every other layer (store actors, gateway, cache,
//! session coordinator) exchanges these types.

pub mod collection;
pub mod item;
pub mod mutation;
pub mod resource;
pub mod summary;

pub use collection::*;
pub use item::*;
pub use mutation::*;
pub use resource::*;
pub use summary::*;
