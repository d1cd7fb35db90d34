// packages/engine/src/lib.rs
//! Sentra Lab Swizzle Engine Library
//!
//! Runtime interception for explicitly registered types: exchange the
//! implementations bound to two named operations so that instrumentation can
//! wrap existing behavior without touching the original bodies.
//!
//! # Architecture
//!
//! The library is structured into several key modules:
//!
//! - **interception**: Dispatch tables, resolver, exchange engine, guard
//! - **interposer**: Public swizzle entry points and process-wide instance
//! - **observability**: Logging setup
//! - **utils**: Configuration and error types
//!
//! # Example
//!
//! ```
//! use sentra_lab_swizzle::{Implementation, Interposer, TypeRegistry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! let view = registry.declare_type("View", None).unwrap();
//! registry
//!     .register_operation(view, "load", Implementation::new("v@:", |_| json!("loaded")))
//!     .unwrap();
//! registry
//!     .register_operation(
//!         view,
//!         "traced_load",
//!         Implementation::new("v@:", |inv| {
//!             // After the exchange this selector reaches the original body
//!             let inner = inv.send("traced_load", inv.args).unwrap();
//!             json!({ "traced": inner })
//!         }),
//!     )
//!     .unwrap();
//!
//! let interposer = Interposer::new(Arc::clone(&registry));
//! assert!(interposer.swizzle_instance_selectors(view, "load", "traced_load").is_success());
//! assert_eq!(
//!     registry.invoke(view, "load", &[]).unwrap(),
//!     json!({ "traced": "loaded" })
//! );
//! ```

// Public module exports
pub mod interception;
pub mod interposer;
pub mod observability;
pub mod utils;

// Re-export commonly used types
pub use interception::{
    DispatchResolver, ExchangeEngine, ExchangeResult, Implementation, Invocation, Namespace,
    OperationLocator, Scope, Selector, SwizzleGuard, TypeDescriptor, TypeRegistry,
};
pub use interposer::{Interposer, InterposerStats, Swizzled};
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
