// packages/engine/src/interception/model.rs
//! Shared data model for the interception engine
//!
//! Everything here is a small value type. Descriptors and locators are
//! resolved fresh for every exchange attempt and never cached.

use crate::interception::registry::TypeRegistry;
use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;

/// Numeric identity of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which dispatch table of a type a descriptor addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Namespace {
    /// Per-instance operations
    Instance,

    /// Type-level ("static") operations
    Meta,
}

/// Scope requested by a caller when addressing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Instance,
    TypeLevel,
}

/// Handle identifying one dispatch table of a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeDescriptor {
    pub id: TypeId,
    pub namespace: Namespace,
}

impl TypeDescriptor {
    pub(crate) fn instance(id: TypeId) -> Self {
        Self {
            id,
            namespace: Namespace::Instance,
        }
    }

    pub fn is_meta(&self) -> bool {
        self.namespace == Namespace::Meta
    }

    /// Same type, type-level table
    pub(crate) fn as_meta(self) -> Self {
        Self {
            id: self.id,
            namespace: Namespace::Meta,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Namespace::Instance => write!(f, "{}", self.id),
            Namespace::Meta => write!(f, "{}.meta", self.id),
        }
    }
}

/// Symbolic name of an operation slot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector(Arc<str>);

impl Selector {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Call context handed to an implementation body
pub struct Invocation<'a> {
    /// Registry the call was dispatched through
    pub registry: &'a TypeRegistry,

    /// Descriptor of the receiver (instance type or metatype)
    pub receiver: TypeDescriptor,

    /// Selector the caller used, which after an exchange is not the
    /// selector the body was registered under
    pub selector: &'a Selector,

    /// Call arguments
    pub args: &'a [Value],
}

impl Invocation<'_> {
    /// Dispatch another selector on the same receiver.
    ///
    /// An instrumenting body registered under `x_traced` and exchanged with
    /// `x` calls `send("x_traced", ..)` to reach the original `x` body.
    pub fn send(&self, selector: impl Into<Selector>, args: &[Value]) -> Result<Value> {
        self.registry.invoke(self.receiver, selector, args)
    }
}

/// Entry point signature for every bound operation
pub type OperationFn = dyn for<'a> Fn(&Invocation<'a>) -> Value + Send + Sync;

/// Unique identity of a registered body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImplementationId(Ulid);

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "imp_{}", self.0)
    }
}

/// A callable body plus its signature encoding
///
/// Clones share the entry point and the identity, so a materialized copy of
/// an inherited entry compares equal to the ancestor's.
#[derive(Clone)]
pub struct Implementation {
    id: ImplementationId,
    encoding: Arc<str>,
    entry: Arc<OperationFn>,
}

impl Implementation {
    pub fn new<F>(encoding: impl AsRef<str>, entry: F) -> Self
    where
        F: for<'a> Fn(&Invocation<'a>) -> Value + Send + Sync + 'static,
    {
        Self {
            id: ImplementationId(Ulid::new()),
            encoding: Arc::from(encoding.as_ref()),
            entry: Arc::new(entry),
        }
    }

    pub fn id(&self) -> ImplementationId {
        self.id
    }

    /// Signature encoding, e.g. `"v@:"`
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn same_as(&self, other: &Implementation) -> bool {
        self.id == other.id
    }

    pub(crate) fn call(&self, invocation: &Invocation<'_>) -> Value {
        (self.entry)(invocation)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("id", &self.id)
            .field("encoding", &self.encoding)
            .finish()
    }
}

/// Where an implementation lives: a (type, selector) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationLocator {
    pub owner: TypeDescriptor,
    pub selector: Selector,
}

impl OperationLocator {
    pub fn new(owner: TypeDescriptor, selector: impl Into<Selector>) -> Self {
        Self {
            owner,
            selector: selector.into(),
        }
    }
}

impl fmt::Display for OperationLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.owner, self.selector)
    }
}

/// Outcome of a single exchange attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeResult {
    Success,

    /// The registry rejected the table mutation
    Failure,

    OriginalMethodNotFound,

    AlternativeMethodNotFound,

    /// The locator pair was already exchanged through a guarded entry point
    AlreadyExchanged,

    /// A revert found no guarded exchange of the pair to undo
    NotExchanged,
}

impl ExchangeResult {
    pub fn is_success(self) -> bool {
        self == ExchangeResult::Success
    }

    /// Label used for logs and metrics
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::OriginalMethodNotFound => "original_method_not_found",
            Self::AlternativeMethodNotFound => "alternative_method_not_found",
            Self::AlreadyExchanged => "already_exchanged",
            Self::NotExchanged => "not_exchanged",
        }
    }

    /// Convert a non-success outcome into an [`EngineError`]
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            other => Err(EngineError::ExchangeRejected(other)),
        }
    }
}

impl fmt::Display for ExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
