use super::error::ProgramResult;
use super::library::Botball;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a user process
pub type ProgramFn = Arc<dyn Fn(&Botball) -> ProgramResult + Send + Sync>;

/// Named entry points that `start_process` can launch
#[derive(Clone, Default)]
pub struct ProgramRegistry {
    functions: HashMap<String, ProgramFn>,
}

impl ProgramRegistry {
    pub fn new() -> Self {
        ProgramRegistry::default()
    }

    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&Botball) -> ProgramResult + Send + Sync + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(function));
    }

    pub fn with<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&Botball) -> ProgramResult + Send + Sync + 'static,
    {
        self.register(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<ProgramFn> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ProgramRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let registry = ProgramRegistry::new()
            .with("main", |_| Ok(()))
            .with("blink", |_| Ok(()));
        assert!(registry.contains("main"));
        assert!(registry.get("blink").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["blink", "main"]);
    }
}
