//! Configuration for a world.

/// Configuration for a [`crate::World`].
///
/// Controls path rendering and initial allocations.
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Separator between names in hierarchical paths.
    pub path_separator: String,

    /// Number of entity slots to reserve up front.
    pub entity_capacity: usize,

    /// Number of table slots to reserve up front.
    pub table_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            path_separator: ".".to_string(),
            entity_capacity: 0,
            table_capacity: 16,
        }
    }
}

impl WorldConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the path separator.
    #[must_use]
    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    /// Builder method to reserve entity slots.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Builder method to reserve table slots.
    #[must_use]
    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.table_capacity = capacity;
        self
    }
}
