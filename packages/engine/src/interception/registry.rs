// packages/engine/src/interception/registry.rs
//! Process-wide type registry and dispatch tables
//!
//! Each declared type owns two tables keyed by selector: the instance table
//! and the type-level (meta) table. Lookup walks the single-inheritance chain
//! within one namespace, so a metatype inherits from its parent's metatype.
//!
//! All tables live behind one `RwLock`. Dispatch lookups take the read lock
//! and clone the bound [`Implementation`] out before calling it; mutations
//! take the write lock, which is what makes a two-slot exchange appear
//! atomic to readers.

use crate::interception::model::{
    Implementation, Invocation, Namespace, OperationLocator, Selector, TypeDescriptor, TypeId,
};
use crate::utils::errors::{EngineError, Result};
use parking_lot::{RwLock, RwLockWriteGuard};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, trace};

/// Dispatch table of one namespace
pub(crate) type Table = HashMap<Selector, Implementation>;

/// Registry entry for one declared type
#[derive(Debug)]
pub(crate) struct TypeRecord {
    name: String,
    parent: Option<TypeId>,
    sealed: bool,
    instance_table: Table,
    meta_table: Table,
}

impl TypeRecord {
    fn table(&self, namespace: Namespace) -> &Table {
        match namespace {
            Namespace::Instance => &self.instance_table,
            Namespace::Meta => &self.meta_table,
        }
    }

    fn table_mut(&mut self, namespace: Namespace) -> &mut Table {
        match namespace {
            Namespace::Instance => &mut self.instance_table,
            Namespace::Meta => &mut self.meta_table,
        }
    }
}

/// All type records, indexed by [`TypeId`]
#[derive(Debug, Default)]
pub(crate) struct Tables {
    types: Vec<TypeRecord>,
    by_name: HashMap<String, TypeId>,
}

impl Tables {
    fn record(&self, id: TypeId) -> Option<&TypeRecord> {
        self.types.get(id.0 as usize)
    }

    fn record_mut(&mut self, id: TypeId) -> Option<&mut TypeRecord> {
        self.types.get_mut(id.0 as usize)
    }

    pub(crate) fn contains(&self, desc: TypeDescriptor) -> bool {
        self.record(desc.id).is_some()
    }

    pub(crate) fn is_sealed(&self, desc: TypeDescriptor) -> bool {
        self.record(desc.id).map(|r| r.sealed).unwrap_or(false)
    }

    /// Human-readable name, e.g. `Base` or `Base.meta`
    pub(crate) fn label(&self, desc: TypeDescriptor) -> String {
        match (self.record(desc.id), desc.namespace) {
            (Some(r), Namespace::Instance) => r.name.clone(),
            (Some(r), Namespace::Meta) => format!("{}.meta", r.name),
            (None, _) => desc.to_string(),
        }
    }

    pub(crate) fn locator_label(&self, locator: &OperationLocator) -> String {
        format!("{}::{}", self.label(locator.owner), locator.selector)
    }

    /// Entry defined directly on the type
    pub(crate) fn own_entry(&self, desc: TypeDescriptor, selector: &Selector) -> Option<&Implementation> {
        self.record(desc.id)?.table(desc.namespace).get(selector)
    }

    /// Entry on the type or the nearest ancestor defining it
    pub(crate) fn lookup(&self, desc: TypeDescriptor, selector: &Selector) -> Option<&Implementation> {
        let mut current = Some(desc.id);

        while let Some(id) = current {
            let record = self.record(id)?;
            if let Some(imp) = record.table(desc.namespace).get(selector) {
                return Some(imp);
            }
            current = record.parent;
        }

        None
    }

    /// Bind without any checks; callers validate first
    pub(crate) fn bind(&mut self, desc: TypeDescriptor, selector: Selector, imp: Implementation) -> Option<Implementation> {
        self.record_mut(desc.id)
            .and_then(|r| r.table_mut(desc.namespace).insert(selector, imp))
    }

    /// Swap two own entries; both must exist
    pub(crate) fn swap_own(&mut self, a: &OperationLocator, b: &OperationLocator) -> Result<()> {
        let a_imp = self
            .own_entry(a.owner, &a.selector)
            .cloned()
            .ok_or_else(|| EngineError::OperationNotFound(self.locator_label(a)))?;
        let b_imp = self
            .own_entry(b.owner, &b.selector)
            .cloned()
            .ok_or_else(|| EngineError::OperationNotFound(self.locator_label(b)))?;

        self.bind(a.owner, a.selector.clone(), b_imp);
        self.bind(b.owner, b.selector.clone(), a_imp);
        Ok(())
    }

    fn check_mutable(&self, desc: TypeDescriptor) -> Result<()> {
        match self.record(desc.id) {
            None => Err(EngineError::UnknownType(desc.to_string())),
            Some(r) if r.sealed => Err(EngineError::Sealed(r.name.clone())),
            Some(_) => Ok(()),
        }
    }
}

/// Id for the type declared after `count` existing ones
fn next_type_id(count: usize) -> Result<TypeId> {
    u32::try_from(count)
        .map(TypeId)
        .map_err(|_| EngineError::RegistryFull(count))
}

/// Type registry holding every dispatch table
pub struct TypeRegistry {
    tables: RwLock<Tables>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Declare a type, optionally inheriting from `parent`
    pub fn declare_type(&self, name: impl Into<String>, parent: Option<TypeDescriptor>) -> Result<TypeDescriptor> {
        let name = name.into();
        let mut tables = self.tables.write();

        if tables.by_name.contains_key(&name) {
            return Err(EngineError::DuplicateType(name));
        }

        let parent = match parent {
            Some(p) if !tables.contains(p) => return Err(EngineError::UnknownType(p.to_string())),
            Some(p) => Some(p.id),
            None => None,
        };

        let id = next_type_id(tables.types.len())?;
        tables.types.push(TypeRecord {
            name: name.clone(),
            parent,
            sealed: false,
            instance_table: Table::new(),
            meta_table: Table::new(),
        });
        tables.by_name.insert(name.clone(), id);

        info!("Declared type {} ({})", name, id);
        Ok(TypeDescriptor::instance(id))
    }

    /// Resolve a type's instance descriptor by name
    pub fn resolve_type(&self, name: &str) -> Option<TypeDescriptor> {
        self.tables.read().by_name.get(name).copied().map(TypeDescriptor::instance)
    }

    /// Name the type was declared with
    pub fn type_name(&self, desc: TypeDescriptor) -> Option<String> {
        self.tables.read().record(desc.id).map(|r| r.name.clone())
    }

    /// Parent descriptor in the same namespace
    pub fn parent_of(&self, desc: TypeDescriptor) -> Option<TypeDescriptor> {
        let tables = self.tables.read();
        tables.record(desc.id)?.parent.map(|id| TypeDescriptor {
            id,
            namespace: desc.namespace,
        })
    }

    /// Resolve the descriptor of the type-level table.
    ///
    /// Returns `None` for a type this registry does not know. A meta
    /// descriptor resolves to itself.
    pub fn metatype(&self, desc: TypeDescriptor) -> Option<TypeDescriptor> {
        if self.tables.read().contains(desc) {
            Some(desc.as_meta())
        } else {
            None
        }
    }

    /// Inherited lookup
    pub fn lookup(&self, desc: TypeDescriptor, selector: &Selector) -> Option<Implementation> {
        self.tables.read().lookup(desc, selector).cloned()
    }

    /// Entry defined directly on the type, ignoring ancestors
    pub fn own_entry(&self, desc: TypeDescriptor, selector: &Selector) -> Option<Implementation> {
        self.tables.read().own_entry(desc, selector).cloned()
    }

    /// Resolve two locators under a single read lock
    pub fn lookup_pair(
        &self,
        a: &OperationLocator,
        b: &OperationLocator,
    ) -> (Option<Implementation>, Option<Implementation>) {
        let tables = self.tables.read();
        (
            tables.lookup(a.owner, &a.selector).cloned(),
            tables.lookup(b.owner, &b.selector).cloned(),
        )
    }

    /// Whether the type or an ancestor binds `selector`
    pub fn responds_to(&self, desc: TypeDescriptor, selector: &Selector) -> bool {
        self.tables.read().lookup(desc, selector).is_some()
    }

    /// Bind `imp` on the type unless it already has an own entry.
    ///
    /// Returns `false` when an own entry exists; an inherited entry does not
    /// count and is shadowed by the new binding.
    pub fn add_operation(&self, desc: TypeDescriptor, selector: impl Into<Selector>, imp: Implementation) -> Result<bool> {
        let selector = selector.into();
        let mut tables = self.tables.write();
        tables.check_mutable(desc)?;

        if tables.own_entry(desc, &selector).is_some() {
            return Ok(false);
        }

        debug!("Adding {}::{} ({})", tables.label(desc), selector, imp.id());
        tables.bind(desc, selector, imp);
        Ok(true)
    }

    /// Register a new own entry; fails if one already exists
    pub fn register_operation(&self, desc: TypeDescriptor, selector: impl Into<Selector>, imp: Implementation) -> Result<()> {
        let selector = selector.into();
        let mut tables = self.tables.write();
        tables.check_mutable(desc)?;

        if tables.own_entry(desc, &selector).is_some() {
            return Err(EngineError::DuplicateOperation(format!(
                "{}::{}",
                tables.label(desc),
                selector
            )));
        }

        debug!("Registering {}::{} ({})", tables.label(desc), selector, imp.id());
        tables.bind(desc, selector, imp);
        Ok(())
    }

    /// Replace (or create) the own entry, returning the previous own binding
    pub fn rebind_operation(
        &self,
        desc: TypeDescriptor,
        selector: impl Into<Selector>,
        imp: Implementation,
    ) -> Result<Option<Implementation>> {
        let selector = selector.into();
        let mut tables = self.tables.write();
        tables.check_mutable(desc)?;

        debug!("Rebinding {}::{} to {}", tables.label(desc), selector, imp.id());
        Ok(tables.bind(desc, selector, imp))
    }

    /// Atomically exchange two own entries.
    ///
    /// Unlike the exchange engine this does not materialize inherited
    /// entries: both locators must already have own bindings.
    pub fn exchange_bindings(&self, a: &OperationLocator, b: &OperationLocator) -> Result<()> {
        let mut tables = self.tables.write();
        tables.check_mutable(a.owner)?;
        tables.check_mutable(b.owner)?;
        tables.swap_own(a, b)
    }

    /// Reject every further mutation of the type's tables
    pub fn seal(&self, desc: TypeDescriptor) -> Result<()> {
        let mut tables = self.tables.write();
        let record = tables
            .record_mut(desc.id)
            .ok_or_else(|| EngineError::UnknownType(desc.to_string()))?;

        record.sealed = true;
        info!("Sealed type {}", record.name);
        Ok(())
    }

    pub fn is_sealed(&self, desc: TypeDescriptor) -> bool {
        self.tables.read().is_sealed(desc)
    }

    /// Dispatch `selector` on `receiver`
    pub fn invoke(&self, receiver: TypeDescriptor, selector: impl Into<Selector>, args: &[Value]) -> Result<Value> {
        let selector = selector.into();
        let imp = {
            let tables = self.tables.read();
            match tables.lookup(receiver, &selector) {
                Some(imp) => imp.clone(),
                None => {
                    return Err(EngineError::OperationNotFound(format!(
                        "{}::{}",
                        tables.label(receiver),
                        selector
                    )))
                }
            }
        };

        trace!("Invoking {}::{} -> {}", receiver, selector, imp.id());

        let invocation = Invocation {
            registry: self,
            receiver,
            selector: &selector,
            args,
        };
        Ok(imp.call(&invocation))
    }

    /// Exclusive access for multi-step mutations
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write()
    }

    #[cfg(test)]
    pub(crate) fn is_write_locked(&self) -> bool {
        self.tables.is_locked_exclusive()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(tag: &'static str) -> Implementation {
        Implementation::new("@@:", move |_| json!(tag))
    }

    #[test]
    fn test_declare_and_resolve() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let child = registry.declare_type("Child", Some(base)).unwrap();

        assert_eq!(registry.resolve_type("Base"), Some(base));
        assert_eq!(registry.resolve_type("Child"), Some(child));
        assert_eq!(registry.resolve_type("Missing"), None);
        assert_eq!(registry.parent_of(child), Some(base));
        assert_eq!(registry.type_name(child).as_deref(), Some("Child"));
    }

    #[test]
    fn test_next_type_id() {
        assert_eq!(next_type_id(0).unwrap(), TypeId(0));
        assert_eq!(next_type_id(u32::MAX as usize).unwrap(), TypeId(u32::MAX));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_next_type_id_overflow() {
        let count = u32::MAX as usize + 1;
        let result = next_type_id(count);
        assert!(matches!(result, Err(EngineError::RegistryFull(n)) if n == count));
    }

    #[test]
    fn test_duplicate_type() {
        let registry = TypeRegistry::new();
        registry.declare_type("Base", None).unwrap();

        let result = registry.declare_type("Base", None);
        assert!(matches!(result, Err(EngineError::DuplicateType(_))));
    }

    #[test]
    fn test_unknown_parent() {
        let registry = TypeRegistry::new();
        let foreign = TypeDescriptor::instance(TypeId(3));

        let result = registry.declare_type("Child", Some(foreign));
        assert!(matches!(result, Err(EngineError::UnknownType(_))));
    }

    #[test]
    fn test_inherited_lookup() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let child = registry.declare_type("Child", Some(base)).unwrap();
        let imp = body("base.foo");
        registry.register_operation(base, "foo", imp.clone()).unwrap();

        let foo = Selector::new("foo");
        assert!(registry.lookup(child, &foo).unwrap().same_as(&imp));
        assert!(registry.own_entry(child, &foo).is_none());
        assert!(registry.own_entry(base, &foo).is_some());
        assert!(registry.responds_to(child, &foo));
    }

    #[test]
    fn test_namespaces_are_separate() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let meta = registry.metatype(base).unwrap();
        registry.register_operation(meta, "shared", body("static")).unwrap();

        let shared = Selector::new("shared");
        assert!(registry.lookup(meta, &shared).is_some());
        assert!(registry.lookup(base, &shared).is_none());
    }

    #[test]
    fn test_meta_inherits_from_parent_meta() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let child = registry.declare_type("Child", Some(base)).unwrap();
        registry
            .register_operation(base.as_meta(), "make", body("Base.make"))
            .unwrap();

        let child_meta = registry.metatype(child).unwrap();
        let value = registry.invoke(child_meta, "make", &[]).unwrap();
        assert_eq!(value, json!("Base.make"));
    }

    #[test]
    fn test_metatype_of_unknown_type() {
        let registry = TypeRegistry::new();
        let desc = TypeDescriptor::instance(TypeId(42));
        assert!(registry.metatype(desc).is_none());
    }

    #[test]
    fn test_add_operation_only_if_absent() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let first = body("first");

        assert!(registry.add_operation(base, "foo", first.clone()).unwrap());
        assert!(!registry.add_operation(base, "foo", body("second")).unwrap());
        assert!(registry
            .own_entry(base, &Selector::new("foo"))
            .unwrap()
            .same_as(&first));
    }

    #[test]
    fn test_register_duplicate_operation() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        registry.register_operation(base, "foo", body("a")).unwrap();

        let result = registry.register_operation(base, "foo", body("b"));
        assert!(matches!(result, Err(EngineError::DuplicateOperation(_))));
    }

    #[test]
    fn test_rebind_returns_previous() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let old = body("old");
        registry.register_operation(base, "foo", old.clone()).unwrap();

        let previous = registry.rebind_operation(base, "foo", body("new")).unwrap();
        assert!(previous.unwrap().same_as(&old));
        assert_eq!(registry.invoke(base, "foo", &[]).unwrap(), json!("new"));
    }

    #[test]
    fn test_exchange_bindings_requires_own_entries() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        let child = registry.declare_type("Child", Some(base)).unwrap();
        registry.register_operation(base, "foo", body("foo")).unwrap();
        registry.register_operation(child, "bar", body("bar")).unwrap();

        let inherited = OperationLocator::new(child, "foo");
        let own = OperationLocator::new(child, "bar");
        let result = registry.exchange_bindings(&inherited, &own);
        assert!(matches!(result, Err(EngineError::OperationNotFound(_))));

        // Nothing moved
        assert_eq!(registry.invoke(child, "bar", &[]).unwrap(), json!("bar"));
    }

    #[test]
    fn test_exchange_bindings() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        registry.register_operation(base, "foo", body("foo")).unwrap();
        registry.register_operation(base, "bar", body("bar")).unwrap();

        registry
            .exchange_bindings(&OperationLocator::new(base, "foo"), &OperationLocator::new(base, "bar"))
            .unwrap();

        assert_eq!(registry.invoke(base, "foo", &[]).unwrap(), json!("bar"));
        assert_eq!(registry.invoke(base, "bar", &[]).unwrap(), json!("foo"));
    }

    #[test]
    fn test_sealed_type_rejects_mutation() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        registry.register_operation(base, "foo", body("foo")).unwrap();
        registry.seal(base).unwrap();

        assert!(registry.is_sealed(base));
        let result = registry.rebind_operation(base, "foo", body("other"));
        assert!(matches!(result, Err(EngineError::Sealed(_))));
        assert_eq!(registry.invoke(base, "foo", &[]).unwrap(), json!("foo"));
    }

    #[test]
    fn test_invoke_missing() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();

        let err = registry.invoke(base, "missing", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Operation not found: Base::missing");
    }

    #[test]
    fn test_invoke_passes_context() {
        let registry = TypeRegistry::new();
        let base = registry.declare_type("Base", None).unwrap();
        registry
            .register_operation(
                base,
                "echo",
                Implementation::new("@@:@", |inv| {
                    json!({ "selector": inv.selector.as_str(), "args": inv.args })
                }),
            )
            .unwrap();

        let value = registry.invoke(base, "echo", &[json!(1), json!("two")]).unwrap();
        assert_eq!(value, json!({ "selector": "echo", "args": [1, "two"] }));
    }
}
