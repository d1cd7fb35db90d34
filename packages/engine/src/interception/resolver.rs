// packages/engine/src/interception/resolver.rs
//! Dispatch resolver
//!
//! Turns "operation X on type T, in scope S" into an [`OperationLocator`].
//! Instance scope addresses T directly. Type-level scope addresses the
//! metatype, which is resolved separately for the alternative type and for
//! the caller's own type; each side fails with its own result.

use crate::interception::model::{ExchangeResult, OperationLocator, Scope, Selector, TypeDescriptor};
use crate::interception::registry::TypeRegistry;
use std::sync::Arc;
use tracing::debug;

/// Resolved (original, alternative) pair ready for the exchange engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPair {
    pub original: OperationLocator,
    pub alternative: OperationLocator,
}

/// Pure lookup over the registry; never mutates it
pub struct DispatchResolver {
    registry: Arc<TypeRegistry>,
}

impl DispatchResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Resolve a single (type, selector) request in the given scope.
    ///
    /// Returns `None` when the metatype of `owner` cannot be resolved.
    pub fn resolve(&self, owner: TypeDescriptor, selector: impl Into<Selector>, scope: Scope) -> Option<OperationLocator> {
        let owner = match scope {
            Scope::Instance => owner,
            Scope::TypeLevel => self.registry.metatype(owner)?,
        };

        Some(OperationLocator::new(owner, selector))
    }

    /// Resolve the caller's original selector on `own_type` together with an
    /// alternative locator.
    ///
    /// For type-level scope the alternative's metatype is resolved first,
    /// then the caller's own.
    pub fn resolve_pair(
        &self,
        own_type: TypeDescriptor,
        original: impl Into<Selector>,
        alternative: OperationLocator,
        scope: Scope,
    ) -> Result<ResolvedPair, ExchangeResult> {
        let OperationLocator {
            owner: alternative_owner,
            selector: alternative_selector,
        } = alternative;

        let alternative = self
            .resolve(alternative_owner, alternative_selector, scope)
            .ok_or(ExchangeResult::AlternativeMethodNotFound)?;
        let original = self
            .resolve(own_type, original, scope)
            .ok_or(ExchangeResult::OriginalMethodNotFound)?;

        debug!("Resolved {:?} pair {} <-> {}", scope, original, alternative);

        Ok(ResolvedPair { original, alternative })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::model::{Namespace, TypeId};

    fn setup() -> (DispatchResolver, TypeDescriptor, TypeDescriptor) {
        let registry = Arc::new(TypeRegistry::new());
        let a = registry.declare_type("A", None).unwrap();
        let b = registry.declare_type("B", None).unwrap();
        (DispatchResolver::new(registry), a, b)
    }

    #[test]
    fn test_instance_scope_is_direct() {
        let (resolver, a, _) = setup();

        let locator = resolver.resolve(a, "foo", Scope::Instance).unwrap();
        assert_eq!(locator.owner, a);
        assert_eq!(locator.selector.as_str(), "foo");
    }

    #[test]
    fn test_type_level_scope_uses_metatype() {
        let (resolver, a, b) = setup();

        let pair = resolver
            .resolve_pair(a, "make", OperationLocator::new(b, "build"), Scope::TypeLevel)
            .unwrap();

        assert_eq!(pair.original.owner.id, a.id);
        assert_eq!(pair.original.owner.namespace, Namespace::Meta);
        assert_eq!(pair.alternative.owner.id, b.id);
        assert_eq!(pair.alternative.owner.namespace, Namespace::Meta);
    }

    #[test]
    fn test_unresolvable_alternative_metatype() {
        let (resolver, a, _) = setup();
        let unknown = TypeDescriptor::instance(TypeId(99));

        let result = resolver.resolve_pair(a, "make", OperationLocator::new(unknown, "build"), Scope::TypeLevel);
        assert_eq!(result, Err(ExchangeResult::AlternativeMethodNotFound));
    }

    #[test]
    fn test_unresolvable_own_metatype() {
        let (resolver, _, b) = setup();
        let unknown = TypeDescriptor::instance(TypeId(99));

        let result = resolver.resolve_pair(unknown, "make", OperationLocator::new(b, "build"), Scope::TypeLevel);
        assert_eq!(result, Err(ExchangeResult::OriginalMethodNotFound));
    }

    #[test]
    fn test_instance_scope_does_not_check_registration() {
        let (resolver, a, _) = setup();
        let unknown = TypeDescriptor::instance(TypeId(99));

        // Existence is the exchange engine's concern
        let pair = resolver
            .resolve_pair(a, "foo", OperationLocator::new(unknown, "bar"), Scope::Instance)
            .unwrap();
        assert_eq!(pair.alternative.owner, unknown);
    }
}
