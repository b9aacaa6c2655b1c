//! Circular selection over a list of filter definitions.

use serde_json::Value;

use super::definition::FilterDefinition;

/// Ordered, never-empty list of filters with a current selection.
#[derive(Debug, Clone)]
pub struct FilterCatalog<T> {
    entries: Vec<T>,
    current: usize,
}

impl<T: FilterDefinition> FilterCatalog<T> {
    /// Build a catalog from raw definition objects.
    ///
    /// Entries without a name are skipped with a warning. If nothing valid
    /// remains, the catalog holds the built-in fallback entry.
    pub fn from_definitions(defs: &[Value]) -> Self {
        let mut entries = Vec::with_capacity(defs.len());
        for def in defs {
            match T::from_definition(def) {
                Some(filter) => {
                    tracing::debug!(name = filter.name(), "Loaded filter definition");
                    entries.push(filter);
                }
                None => {
                    tracing::warn!(entry = %def, "Skipping malformed filter definition");
                }
            }
        }
        Self::new(entries)
    }

    /// Wrap already-built entries, falling back to the default entry when empty.
    pub fn new(mut entries: Vec<T>) -> Self {
        if entries.is_empty() {
            entries.push(T::fallback());
        }
        Self {
            entries,
            current: 0,
        }
    }

    pub fn current(&self) -> &T {
        &self.entries[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Advance the selection, wrapping past the last entry.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> &T {
        self.step(1)
    }

    /// Move the selection back, wrapping before the first entry.
    pub fn prev(&mut self) -> &T {
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> &T {
        let len = self.entries.len() as isize;
        self.current = (self.current as isize + delta).rem_euclid(len) as usize;
        &self.entries[self.current]
    }

    pub fn by_name(&self, name: &str) -> Option<&T> {
        self.entries.iter().find(|f| f.name() == name)
    }

    /// Make the named entry current. Returns `false` and keeps the selection
    /// when no entry has that name.
    pub fn select(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|f| f.name() == name) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
