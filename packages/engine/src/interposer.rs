// packages/engine/src/interposer.rs
//! Swizzle entry points
//!
//! [`Interposer`] ties the resolver, the one-shot guard and the exchange
//! engine together behind the two external operations, `swizzle_instance`
//! and `swizzle_type_level`, plus the convenience forms that derive the
//! alternative's type from the caller's own type.
//!
//! A process normally installs one interposer early during startup with
//! [`Interposer::install`] and reaches it through [`Interposer::global`].
//! Exchanges are expected to finish before the affected operations are
//! invoked from other threads; the interposer does not verify that.

use crate::interception::exchange::ExchangeEngine;
use crate::interception::guard::SwizzleGuard;
use crate::interception::model::{ExchangeResult, OperationLocator, Scope, Selector, TypeDescriptor};
use crate::interception::registry::TypeRegistry;
use crate::interception::resolver::DispatchResolver;
use crate::utils::config::EngineConfig;
use crate::utils::errors::{EngineError, Result};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{info, warn};

static GLOBAL: OnceCell<Interposer> = OnceCell::new();

/// Implemented by types that install their own swizzles
pub trait Swizzled {
    fn swizzle_methods(interposer: &Interposer) -> ExchangeResult;
}

/// Resolves, guards and performs exchanges against one registry
pub struct Interposer {
    config: EngineConfig,
    registry: Arc<TypeRegistry>,
    resolver: DispatchResolver,
    engine: ExchangeEngine,
    guard: SwizzleGuard,
}

impl Interposer {
    /// Create an interposer with default configuration
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, EngineConfig::default())
    }

    /// Create an interposer with custom configuration
    pub fn with_config(registry: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        info!(
            "Initializing interposer (guard: {}, matching signatures: {})",
            config.guard.enabled, config.exchange.require_matching_signatures
        );

        Self {
            resolver: DispatchResolver::new(Arc::clone(&registry)),
            engine: ExchangeEngine::new(Arc::clone(&registry), config.exchange.clone()),
            guard: SwizzleGuard::new(),
            registry,
            config,
        }
    }

    /// Install the process-wide interposer; fails if one is already installed
    pub fn install(registry: Arc<TypeRegistry>, config: EngineConfig) -> Result<&'static Interposer> {
        GLOBAL
            .set(Self::with_config(registry, config))
            .map_err(|_| EngineError::AlreadyInstalled)?;

        Self::global()
    }

    /// The process-wide interposer
    pub fn global() -> Result<&'static Interposer> {
        GLOBAL.get().ok_or(EngineError::NotInstalled)
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a type's own swizzle installation
    pub fn apply<T: Swizzled>(&self) -> ExchangeResult {
        T::swizzle_methods(self)
    }

    /// Exchange two instance operations. `original.owner` is the caller's own type.
    pub fn swizzle_instance(&self, original: OperationLocator, alternative: OperationLocator) -> ExchangeResult {
        self.attempt(original, alternative, Scope::Instance)
    }

    /// Exchange two type-level operations.
    ///
    /// Both owners may be given as instance descriptors; they are resolved
    /// to their metatypes.
    pub fn swizzle_type_level(&self, original: OperationLocator, alternative: OperationLocator) -> ExchangeResult {
        self.attempt(original, alternative, Scope::TypeLevel)
    }

    /// Exchange two instance operations of `ty`
    pub fn swizzle_instance_selectors(
        &self,
        ty: TypeDescriptor,
        original: impl Into<Selector>,
        alternative: impl Into<Selector>,
    ) -> ExchangeResult {
        self.swizzle_instance(OperationLocator::new(ty, original), OperationLocator::new(ty, alternative))
    }

    /// Exchange an instance operation of `ty` with one on another type
    pub fn swizzle_instance_for(
        &self,
        ty: TypeDescriptor,
        original: impl Into<Selector>,
        alternative: OperationLocator,
    ) -> ExchangeResult {
        self.swizzle_instance(OperationLocator::new(ty, original), alternative)
    }

    /// Exchange two type-level operations of `ty`
    pub fn swizzle_class_selectors(
        &self,
        ty: TypeDescriptor,
        original: impl Into<Selector>,
        alternative: impl Into<Selector>,
    ) -> ExchangeResult {
        self.swizzle_type_level(OperationLocator::new(ty, original), OperationLocator::new(ty, alternative))
    }

    /// Exchange a type-level operation of `ty` with one on another type
    pub fn swizzle_class_for(
        &self,
        ty: TypeDescriptor,
        original: impl Into<Selector>,
        alternative: OperationLocator,
    ) -> ExchangeResult {
        self.swizzle_type_level(OperationLocator::new(ty, original), alternative)
    }

    /// Undo an instance exchange and release its one-shot claim.
    ///
    /// Returns `NotExchanged` when the guard holds no claim for the pair.
    pub fn revert_instance(&self, original: OperationLocator, alternative: OperationLocator) -> ExchangeResult {
        self.revert(original, alternative, Scope::Instance)
    }

    /// Undo a type-level exchange and release its one-shot claim.
    ///
    /// Returns `NotExchanged` when the guard holds no claim for the pair.
    pub fn revert_type_level(&self, original: OperationLocator, alternative: OperationLocator) -> ExchangeResult {
        self.revert(original, alternative, Scope::TypeLevel)
    }

    /// Whether the pair is currently exchanged through a guarded call
    pub fn is_exchanged(&self, original: &OperationLocator, alternative: &OperationLocator, scope: Scope) -> bool {
        let own = self.resolver.resolve(original.owner, original.selector.clone(), scope);
        let alt = self.resolver.resolve(alternative.owner, alternative.selector.clone(), scope);

        match (own, alt) {
            (Some(own), Some(alt)) => self.guard.is_claimed(&own, &alt),
            _ => false,
        }
    }

    /// Get interposer statistics
    pub fn stats(&self) -> InterposerStats {
        InterposerStats {
            guard_enabled: self.config.guard.enabled,
            exchanged_pairs: self.guard.len(),
        }
    }

    fn attempt(&self, original: OperationLocator, alternative: OperationLocator, scope: Scope) -> ExchangeResult {
        let pair = match self
            .resolver
            .resolve_pair(original.owner, original.selector, alternative, scope)
        {
            Ok(pair) => pair,
            Err(result) => {
                warn!("Could not resolve {:?} swizzle: {}", scope, result);
                return result;
            }
        };

        if !self.config.guard.enabled {
            return self.engine.exchange_pair(&pair);
        }

        let result = self
            .guard
            .claim_with(&pair.original, &pair.alternative, || self.engine.exchange_pair(&pair));

        if result == ExchangeResult::AlreadyExchanged {
            warn!(
                "Swizzle {} <-> {} already applied",
                pair.original, pair.alternative
            );
            metrics::counter!("swizzle_exchanges_total", "result" => result.as_str()).increment(1);
        }

        result
    }

    fn revert(&self, original: OperationLocator, alternative: OperationLocator, scope: Scope) -> ExchangeResult {
        let pair = match self
            .resolver
            .resolve_pair(original.owner, original.selector, alternative, scope)
        {
            Ok(pair) => pair,
            Err(result) => return result,
        };

        if !self.config.guard.enabled {
            return self.engine.exchange_pair(&pair);
        }

        let result = self
            .guard
            .release_with(&pair.original, &pair.alternative, || self.engine.exchange_pair(&pair));

        if result == ExchangeResult::NotExchanged {
            warn!(
                "Nothing to revert for {} <-> {}",
                pair.original, pair.alternative
            );
        }

        result
    }
}

/// Interposer statistics
#[derive(Debug, Clone)]
pub struct InterposerStats {
    pub guard_enabled: bool,
    pub exchanged_pairs: usize,
}
