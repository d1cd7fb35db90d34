// packages/engine/src/interception/mod.rs
//! Operation interception layer
//!
//! This module lets a caller exchange, at runtime, the implementations bound
//! to two named operations so that calling either name runs the other's body:
//!
//! - **Model**: Type descriptors, selectors, implementations, locators
//! - **Registry**: Per-type instance and type-level dispatch tables
//! - **Resolver**: (type, selector, scope) to operation locator
//! - **Exchange**: Materialize own entries and swap atomically
//! - **Guard**: One-shot flag per exchanged pair
//!
//! # Architecture
//!
//! ```text
//! Caller (original, alternative)
//!     │
//!     ├─ DispatchResolver → metatype for type-level scope
//!     ├─ SwizzleGuard     → reject repeated pair
//!     └─ ExchangeEngine   → lookup → materialize → swap (one write lock)
//!                                 │
//!                            TypeRegistry
//! ```

pub mod exchange;
pub mod guard;
pub mod model;
pub mod registry;
pub mod resolver;

// Re-export commonly used types
pub use exchange::ExchangeEngine;
pub use guard::{PairKey, SwizzleGuard};
pub use model::{
    ExchangeResult, Implementation, ImplementationId, Invocation, Namespace, OperationLocator, Scope,
    Selector, TypeDescriptor, TypeId,
};
pub use registry::TypeRegistry;
pub use resolver::{DispatchResolver, ResolvedPair};
