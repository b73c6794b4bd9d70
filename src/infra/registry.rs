// ============================================================
// Layer 6: Name → Constructor Registry
// ============================================================
// Models, executors and evaluators are all created from a
// string in the configuration. Each kind owns a Registry that
// maps that string to a plain constructor function, so adding
// a new implementation means adding one `register` call.
//
// Unknown names fail with NotFound and list what is available.

use std::collections::BTreeMap;

use crate::domain::error::{PipelineError, Result};

/// Constructor signature stored in a registry.
pub type Constructor<T, A> = fn(A) -> Result<T>;

pub struct Registry<T, A> {
    kind:    &'static str,
    entries: BTreeMap<&'static str, Constructor<T, A>>,
}

impl<T, A> Registry<T, A> {
    /// An empty registry; `kind` names the registered things in errors.
    pub fn new(kind: &'static str) -> Self {
        Self { kind, entries: BTreeMap::new() }
    }

    /// Add (or replace) the constructor for `name`.
    pub fn register(&mut self, name: &'static str, constructor: Constructor<T, A>) -> &mut Self {
        if self.entries.insert(name, constructor).is_some() {
            tracing::debug!("Replaced {} constructor '{}'", self.kind, name);
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Look up `name` and run its constructor with `args`.
    pub fn create(&self, name: &str, args: A) -> Result<T> {
        let constructor = self.entries.get(name).ok_or_else(|| {
            tracing::error!(
                "Unknown {} '{}', available: {:?}",
                self.kind,
                name,
                self.names()
            );
            PipelineError::not_found(self.kind, name)
        })?;

        tracing::debug!("Creating {} '{}'", self.kind, name);
        constructor(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(x: i32) -> Result<i32> { Ok(x * 2) }

    fn negate(x: i32) -> Result<i32> { Ok(-x) }

    #[test]
    fn test_create_by_name() {
        let mut registry = Registry::new("op");
        registry.register("double", double).register("negate", negate);

        assert_eq!(registry.create("double", 4).unwrap(), 8);
        assert_eq!(registry.create("negate", 4).unwrap(), -4);
        assert_eq!(registry.names(), vec!["double", "negate"]);
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let registry: Registry<i32, i32> = Registry::new("op");
        let err = registry.create("triple", 1).unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { kind: "op", ref name } if name == "triple"));
    }
}
