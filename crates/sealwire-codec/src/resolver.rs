//! Type resolvers decide which Rust types a serializer will accept.
//!
//! A resolver is handed to the serializer when it is built; there is no
//! process-wide registry. [`StandardResolver`] accepts every type.
//! [`RegistryResolver`] accepts only the types registered on it, and a
//! serializer using it reports unregistered types as
//! `FormatterMissing`, a configuration error distinct from a data error.

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    fmt,
};

use sealwire_types::{Operation, SerializationError};

/// Decides whether a type may go through a serializer.
pub trait TypeResolver: Send + Sync + fmt::Debug {
    /// Identity reported in capability maps.
    fn name(&self) -> &str;

    fn resolves(&self, type_id: TypeId) -> bool;
}

/// Check `T` against a resolver.
pub(crate) fn ensure_resolvable<T: 'static>(
    resolver: &dyn TypeResolver,
    operation: Operation,
) -> Result<(), SerializationError> {
    if resolver.resolves(TypeId::of::<T>()) {
        Ok(())
    } else {
        Err(SerializationError::formatter_missing(operation, type_name::<T>()))
    }
}

/// Accepts every type.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardResolver;

impl TypeResolver for StandardResolver {
    fn name(&self) -> &str {
        "standard"
    }

    fn resolves(&self, _type_id: TypeId) -> bool {
        true
    }
}

/// Accepts an explicit allow-list of types.
#[derive(Debug, Clone)]
pub struct RegistryResolver {
    name: String,
    types: HashMap<TypeId, &'static str>,
}

impl RegistryResolver {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: HashMap::new(),
        }
    }

    /// Allow `T`.
    #[must_use]
    pub fn register<T: 'static>(mut self) -> Self {
        self.types.insert(TypeId::of::<T>(), type_name::<T>());
        self
    }

    #[must_use]
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.types.contains_key(&TypeId::of::<T>())
    }

    /// Registered type names, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.values().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeResolver for RegistryResolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolves(&self, type_id: TypeId) -> bool {
        self.types.contains_key(&type_id)
    }
}

#[cfg(test)]
mod tests {
    use sealwire_types::SerializationErrorKind;

    use super::*;

    #[test]
    fn standard_accepts_everything() {
        assert!(ensure_resolvable::<String>(&StandardResolver, Operation::Serialize).is_ok());
        assert!(ensure_resolvable::<Vec<u8>>(&StandardResolver, Operation::Serialize).is_ok());
    }

    #[test]
    fn registry_rejects_unregistered() {
        let resolver = RegistryResolver::new("orders").register::<u64>();
        assert!(resolver.is_registered::<u64>());
        assert!(ensure_resolvable::<u64>(&resolver, Operation::Serialize).is_ok());

        let err = ensure_resolvable::<String>(&resolver, Operation::Deserialize).unwrap_err();
        assert_eq!(err.kind(), SerializationErrorKind::FormatterMissing);
        assert_eq!(err.operation(), Operation::Deserialize);
        assert!(err.target_type().unwrap().contains("String"));
    }

    #[test]
    fn registry_lists_names() {
        let resolver = RegistryResolver::new("r").register::<u8>().register::<bool>();
        assert_eq!(resolver.len(), 2);
        assert_eq!(resolver.type_names(), vec!["bool", "u8"]);
    }
}
