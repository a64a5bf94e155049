use crate::compile::{CompileError, Template};
use std::collections::HashMap;

/// In-memory module loader.
///
/// The candidate's declared dependency references resolve here and nowhere
/// else; there is no fallback to a filesystem or any ambient registry.
#[derive(Debug, Default, Clone)]
pub struct ModuleSet {
    modules: HashMap<String, Template>,
}

impl ModuleSet {
    /// An empty module set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a compiled module under its component name.
    pub fn insert(&mut self, template: Template) -> Result<(), CompileError> {
        if self.modules.contains_key(&template.name) {
            return Err(CompileError::DuplicateModule(template.name));
        }
        self.modules.insert(template.name.clone(), template);
        Ok(())
    }

    /// Look up a loaded module by component name.
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.modules.get(name)
    }

    /// Whether a module is loaded under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Number of loaded modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no modules are loaded.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Check that every dependency reference of `template` resolves.
    pub fn link(&self, template: &Template) -> Result<(), CompileError> {
        for dep in &template.deps {
            if !self.contains(dep) {
                return Err(CompileError::UnresolvedDependency(dep.clone()));
            }
        }
        Ok(())
    }
}
