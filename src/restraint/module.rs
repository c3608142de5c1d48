//! Restraint Work Modules

use std::sync::Arc;

use super::RestraintPotential;
use crate::session::MdModule;

/// A named work module contributing one restraint to a session.
#[derive(Clone)]
pub struct RestraintModule {
    name: String,
    restraint: Arc<dyn RestraintPotential>,
}

impl RestraintModule {
    pub fn new(name: impl Into<String>, restraint: Arc<dyn RestraintPotential>) -> Self {
        Self {
            name: name.into(),
            restraint,
        }
    }
}

impl std::fmt::Debug for RestraintModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestraintModule")
            .field("name", &self.name)
            .field("sites", &self.restraint.sites())
            .finish()
    }
}

impl MdModule for RestraintModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn restraint(&self) -> Option<Arc<dyn RestraintPotential>> {
        Some(Arc::clone(&self.restraint))
    }
}
