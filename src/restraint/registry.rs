//! Restraint Registry
//!
//! Records the restraints bound into one session. The registry is owned by
//! the open session and passed where needed, so independent sessions in the
//! same process never see each other's restraints.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;

use super::RestraintPotential;
use crate::error::{Result, SessionError};

#[derive(Default)]
pub struct RestraintRegistry {
    restraints: BTreeMap<String, Arc<dyn RestraintPotential>>,
}

impl RestraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a restraint under `name` and returns the new count.
    ///
    /// Fails with a usage error if the name is taken.
    pub fn add(&mut self, name: impl Into<String>, restraint: Arc<dyn RestraintPotential>) -> Result<usize> {
        let name = name.into();
        if self.restraints.contains_key(&name) {
            return Err(SessionError::Usage(format!(
                "a restraint named '{}' is already registered",
                name
            )));
        }

        debug!("Registered restraint '{}' on sites {:?}", name, restraint.sites());
        self.restraints.insert(name, restraint);
        Ok(self.restraints.len())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn RestraintPotential>> {
        self.restraints.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.restraints.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.restraints.keys().cloned().collect()
    }

    /// Number of active restraints.
    pub fn len(&self) -> usize {
        self.restraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restraints.is_empty()
    }

    pub fn clear(&mut self) {
        self.restraints.clear();
    }
}

impl std::fmt::Debug for RestraintRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestraintRegistry")
            .field("restraints", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::restraint::HarmonicRestraint;

    fn restraint() -> Arc<dyn RestraintPotential> {
        Arc::new(HarmonicRestraint::new([0, 1], 1.0, 1.0))
    }

    #[test]
    fn test_add_counts_restraints() {
        let mut registry = RestraintRegistry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.add("a", restraint()).unwrap(), 1);
        assert_eq!(registry.add("b", restraint()).unwrap(), 2);
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert!(registry.contains("a"));
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = RestraintRegistry::new();
        registry.add("a", restraint()).unwrap();
        let result = registry.add("a", restraint());
        assert!(matches!(result, Err(SessionError::Usage(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registries_are_independent() {
        let mut first = RestraintRegistry::new();
        let second = RestraintRegistry::new();
        first.add("a", restraint()).unwrap();
        assert!(second.get("a").is_none());

        first.clear();
        assert!(first.is_empty());
    }
}
