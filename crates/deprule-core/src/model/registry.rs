//! Per-run registry bundling item types and interned items.

use super::{Item, ItemStore, ItemTail, ItemType, ItemTypeRegistry, ModelError};

/// Owner of the item type table and the item interning table of one run.
///
/// Independent runs use separate registries, or call [`Registry::reset`]
/// in between, so that interned instances never leak across runs.
#[derive(Debug, Default)]
pub struct Registry {
    types: ItemTypeRegistry,
    items: ItemStore,
}

impl Registry {
    /// Creates a registry with only the predefined item types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry whose items compare markers case-insensitively.
    #[must_use]
    pub fn with_ignore_case(ignore_case: bool) -> Self {
        Self {
            types: ItemTypeRegistry::new(),
            items: ItemStore::with_ignore_case_markers(ignore_case),
        }
    }

    /// Item type table.
    #[must_use]
    pub fn types(&self) -> &ItemTypeRegistry {
        &self.types
    }

    /// Mutable item type table.
    pub fn types_mut(&mut self) -> &mut ItemTypeRegistry {
        &mut self.types
    }

    /// Item interning table.
    #[must_use]
    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    /// Mutable item interning table.
    pub fn items_mut(&mut self) -> &mut ItemStore {
        &mut self.items
    }

    /// Shorthand for [`ItemStore::intern`].
    ///
    /// # Errors
    ///
    /// See [`ItemStore::intern`].
    pub fn item<S: AsRef<str>>(
        &mut self,
        item_type: &ItemType,
        values: &[S],
        is_inner: bool,
    ) -> Result<Item, ModelError> {
        self.items.intern(item_type, values, is_inner)
    }

    /// Shorthand for [`ItemStore::append`].
    ///
    /// # Errors
    ///
    /// See [`ItemStore::append`].
    pub fn append(&mut self, item: &Item, tail: &ItemTail) -> Result<Item, ModelError> {
        self.items.append(item, tail)
    }

    /// Clears both tables and restores the predefined item types.
    pub fn reset(&mut self) {
        self.types.reset();
        self.items.reset();
    }
}
