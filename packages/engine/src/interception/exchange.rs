// packages/engine/src/interception/exchange.rs
//! Exchange engine
//!
//! Swaps the implementations bound at two operation locators:
//!
//! 1. Resolve each locator with inherited lookup (original first).
//! 2. Materialize an own-table entry on each owning type if the binding was
//!    only inherited, so the swap cannot leak into the ancestor's table and
//!    every other descendant of it.
//! 3. Exchange the two own-table entries.
//!
//! All three steps run under the registry's write lock and every check runs
//! before the first write, so a failed attempt commits nothing and readers
//! see either the complete pre-exchange or post-exchange tables.

use crate::interception::model::{ExchangeResult, OperationLocator};
use crate::interception::registry::{Tables, TypeRegistry};
use crate::interception::resolver::ResolvedPair;
use crate::utils::config::ExchangeConfig;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Performs implementation exchanges against one registry
pub struct ExchangeEngine {
    registry: Arc<TypeRegistry>,
    config: ExchangeConfig,
}

impl ExchangeEngine {
    pub fn new(registry: Arc<TypeRegistry>, config: ExchangeConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Exchange a resolved pair
    pub fn exchange_pair(&self, pair: &ResolvedPair) -> ExchangeResult {
        self.exchange(&pair.original, &pair.alternative)
    }

    /// Exchange the implementations bound at `original` and `alternative`.
    ///
    /// Exchanging a locator with itself only materializes the own entry.
    pub fn exchange(&self, original: &OperationLocator, alternative: &OperationLocator) -> ExchangeResult {
        let mut tables = self.registry.write();
        let result = self.exchange_locked(&mut tables, original, alternative);
        let (original_label, alternative_label) =
            (tables.locator_label(original), tables.locator_label(alternative));
        drop(tables);

        match result {
            ExchangeResult::Success => info!("Exchanged {} <-> {}", original_label, alternative_label),
            other => warn!(
                "Exchange {} <-> {} failed: {}",
                original_label, alternative_label, other
            ),
        }
        metrics::counter!("swizzle_exchanges_total", "result" => result.as_str()).increment(1);

        result
    }

    fn exchange_locked(
        &self,
        tables: &mut Tables,
        original: &OperationLocator,
        alternative: &OperationLocator,
    ) -> ExchangeResult {
        // Step 1
        let original_imp = match tables.lookup(original.owner, &original.selector) {
            Some(imp) => imp.clone(),
            None => return ExchangeResult::OriginalMethodNotFound,
        };
        let alternative_imp = match tables.lookup(alternative.owner, &alternative.selector) {
            Some(imp) => imp.clone(),
            None => return ExchangeResult::AlternativeMethodNotFound,
        };

        for owner in [original.owner, alternative.owner] {
            if tables.is_sealed(owner) {
                warn!("Refusing to mutate sealed type {}", tables.label(owner));
                return ExchangeResult::Failure;
            }
        }

        if self.config.require_matching_signatures && original_imp.encoding() != alternative_imp.encoding() {
            warn!(
                "Signature mismatch: {} is {:?}, {} is {:?}",
                tables.locator_label(original),
                original_imp.encoding(),
                tables.locator_label(alternative),
                alternative_imp.encoding()
            );
            return ExchangeResult::Failure;
        }

        // Step 2
        for (locator, imp) in [(original, original_imp), (alternative, alternative_imp)] {
            if tables.own_entry(locator.owner, &locator.selector).is_none() {
                debug!(
                    "Materializing inherited {} as own entry ({})",
                    tables.locator_label(locator),
                    imp.id()
                );
                tables.bind(locator.owner, locator.selector.clone(), imp);
                metrics::counter!("swizzle_materialized_entries_total").increment(1);
            }
        }

        // Step 3
        match tables.swap_own(original, alternative) {
            Ok(()) => ExchangeResult::Success,
            Err(e) => {
                warn!("Exchange primitive rejected mutation: {}", e);
                ExchangeResult::Failure
            }
        }
    }
}
