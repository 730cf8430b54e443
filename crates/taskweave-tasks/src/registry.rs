//! Task registry

use std::collections::HashMap;

use tracing::debug;

use crate::task::TaskDefinition;

/// Mapping from task name to definition, owned by one engine.
///
/// Registration performs no shape validation: callables, capability objects
/// and aliases are all accepted as-is. Re-registering a name replaces the
/// previous definition.
pub struct Registry<D> {
    tasks: HashMap<String, TaskDefinition<D>>,
}

impl<D> Registry<D> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Store or overwrite a definition
    pub fn register(&mut self, name: impl Into<String>, definition: TaskDefinition<D>) {
        let name = name.into();
        debug!(task = %name, kind = definition.kind(), "registering task");
        if self.tasks.insert(name.clone(), definition).is_some() {
            debug!(task = %name, "replaced existing definition");
        }
    }

    /// Look up a definition by name
    pub fn lookup(&self, name: &str) -> Option<&TaskDefinition<D>> {
        self.tasks.get(name)
    }

    /// Whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Registry<D> {
    fn clone(&self) -> Self {
        Self {
            tasks: self.tasks.clone(),
        }
    }
}

impl<D> std::fmt::Debug for Registry<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.names().into_iter().map(|name| (name, &self.tasks[name])))
            .finish()
    }
}
