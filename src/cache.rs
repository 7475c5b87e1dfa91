use crate::error::CheckerError;
use crate::template::Node;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The parts of the Svelte compiler's result the checker reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationResult {
    pub ast: Ast,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    pub html: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationEntry {
    pub compiled_source: String,
    pub compilation: CompilationResult,
}

/// Compile-step output keyed by script file name. Populated before checking;
/// the checker only reads from it.
#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: HashMap<String, CompilationEntry>,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, file: &str) -> bool {
        self.entries.contains_key(file)
    }

    pub fn get(&self, file: &str) -> Option<&CompilationEntry> {
        self.entries.get(file)
    }

    pub fn insert(
        &mut self,
        file: impl Into<String>,
        compiled_source: impl Into<String>,
        compilation: CompilationResult,
    ) {
        self.entries.insert(
            file.into(),
            CompilationEntry {
                compiled_source: compiled_source.into(),
                compilation,
            },
        );
    }

    /// Stores an entry from the compiler's JSON result (`{"ast": {"html": ...}}`).
    /// Other top-level fields such as `js`, `css` or `warnings` are ignored.
    pub fn insert_json(
        &mut self,
        file: impl Into<String>,
        compiled_source: impl Into<String>,
        json: &str,
    ) -> Result<(), CheckerError> {
        let file = file.into();
        let compilation: CompilationResult =
            serde_json::from_str(json).map_err(|source| CheckerError::InvalidCompilation {
                file: file.clone(),
                source,
            })?;
        self.insert(file, compiled_source, compilation);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
