//! Interned items, item tails and item side tables.

use super::markers::{MarkerPattern, MarkerSet};
use super::{ItemType, ModelError};
use serde::{Serialize, Serializer};
use std::collections::hash_map::{DefaultHasher, Entry};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A node of the dependency graph: a typed tuple of string values.
///
/// Items are created only through an [`ItemStore`], which returns one shared
/// handle per `(type, values, is_inner)` triple. Cloning an `Item` clones the
/// handle. Equality and hashing are structural, with a pointer fast path, so
/// handles from the same store compare by identity.
///
/// The order annotation and the marker set are the only mutable parts and
/// are shared by all handles.
#[derive(Clone)]
pub struct Item {
    inner: Arc<ItemInner>,
}

struct ItemInner {
    item_type: ItemType,
    values: Box<[Arc<str>]>,
    is_inner: bool,
    hash: u64,
    as_string: OnceLock<String>,
    order: RwLock<Option<String>>,
    markers: RwLock<MarkerSet>,
}

fn structural_hash(item_type: &ItemType, values: &[Arc<str>], is_inner: bool) -> u64 {
    let mut hasher = DefaultHasher::new();
    item_type.hash(&mut hasher);
    values.hash(&mut hasher);
    is_inner.hash(&mut hasher);
    hasher.finish()
}

impl Item {
    /// The item's type.
    #[must_use]
    pub fn item_type(&self) -> &ItemType {
        &self.inner.item_type
    }

    /// Field values, parallel to the type's keys.
    #[must_use]
    pub fn values(&self) -> &[Arc<str>] {
        &self.inner.values
    }

    /// Whether the item belongs to the analyzed code base.
    #[must_use]
    pub fn is_inner(&self) -> bool {
        self.inner.is_inner
    }

    /// Whether all values are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.values.iter().all(|v| v.is_empty())
    }

    /// Values joined by `:`, or by `;` between sub-fields of one key.
    #[must_use]
    pub fn as_string(&self) -> &str {
        self.inner.as_string.get_or_init(|| {
            let mut out = String::new();
            for (i, value) in self.inner.values.iter().enumerate() {
                if i > 0 {
                    out.push(if self.inner.item_type.continues_key(i) {
                        ';'
                    } else {
                        ':'
                    });
                }
                out.push_str(value);
            }
            out
        })
    }

    /// `TYPE[;order]:values`, the form used in DIP files.
    #[must_use]
    pub fn as_full_string(&self) -> String {
        match self.order() {
            Some(order) if !order.is_empty() => format!(
                "{};{order}:{}",
                self.inner.item_type.name(),
                self.as_string()
            ),
            _ => format!("{}:{}", self.inner.item_type.name(), self.as_string()),
        }
    }

    /// Display-sorting annotation.
    #[must_use]
    pub fn order(&self) -> Option<String> {
        read(&self.inner.order).clone()
    }

    /// Sets the display-sorting annotation; `None` clears it.
    pub fn set_order(&self, order: Option<String>) {
        *write(&self.inner.order) = order;
    }

    /// Snapshot of the item's markers.
    #[must_use]
    pub fn markers(&self) -> MarkerSet {
        read(&self.inner.markers).clone()
    }

    /// Adds a marker. Returns `true` if it was not present before.
    pub fn add_marker(&self, marker: &str) -> bool {
        write(&self.inner.markers).add(marker)
    }

    /// Removes a marker. Returns `true` if it was present.
    pub fn remove_marker(&self, marker: &str) -> bool {
        write(&self.inner.markers).remove(marker)
    }

    /// Removes all markers.
    pub fn clear_markers(&self) {
        write(&self.inner.markers).clear();
    }

    /// Tests whether a marker is present.
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        read(&self.inner.markers).contains(marker)
    }

    /// Evaluates a marker predicate on this item.
    #[must_use]
    pub fn matches_markers(&self, pattern: &MarkerPattern) -> bool {
        pattern.matches(&read(&self.inner.markers))
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.hash == other.inner.hash
                && self.inner.is_inner == other.inner.is_inner
                && self.inner.values == other.inner.values
                && self.inner.item_type == other.inner.item_type)
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_full_string())
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({})", self.as_full_string())
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_full_string())
    }
}

/// Trailing fields to be appended to an item, typed by the full type of the
/// resulting item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemTail {
    item_type: ItemType,
    values: Vec<String>,
}

impl ItemTail {
    /// Creates a tail. `item_type` is the type of the appended item.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ValueCount`] if there are more values than the
    /// type has fields.
    pub fn new<S: AsRef<str>>(item_type: ItemType, values: &[S]) -> Result<Self, ModelError> {
        if values.len() > item_type.len() {
            return Err(ModelError::ValueCount {
                type_name: item_type.name().to_string(),
                expected: item_type.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            item_type,
            values: values.iter().map(|v| v.as_ref().to_string()).collect(),
        })
    }

    /// Type of the item produced by appending this tail.
    #[must_use]
    pub fn item_type(&self) -> &ItemType {
        &self.item_type
    }

    /// The trailing values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[derive(PartialEq, Eq, Hash)]
struct ItemKey {
    item_type: ItemType,
    values: Box<[Arc<str>]>,
    is_inner: bool,
}

/// Interning table for items and their value strings.
#[derive(Default)]
pub struct ItemStore {
    items: HashMap<ItemKey, Item>,
    strings: HashSet<Arc<str>>,
    ignore_case_markers: bool,
}

impl fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStore")
            .field("items", &self.items.len())
            .field("strings", &self.strings.len())
            .finish()
    }
}

impl ItemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose items compare markers case-insensitively.
    #[must_use]
    pub fn with_ignore_case_markers(ignore_case: bool) -> Self {
        Self {
            ignore_case_markers: ignore_case,
            ..Self::default()
        }
    }

    fn intern_str(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(value) {
            return Arc::clone(existing);
        }
        let interned: Arc<str> = Arc::from(value);
        self.strings.insert(Arc::clone(&interned));
        interned
    }

    /// Returns the canonical item for `(item_type, values, is_inner)`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ValueCount`] if the number of values differs from
    /// the type's field count.
    pub fn intern<S: AsRef<str>>(
        &mut self,
        item_type: &ItemType,
        values: &[S],
        is_inner: bool,
    ) -> Result<Item, ModelError> {
        if values.len() != item_type.len() {
            return Err(ModelError::ValueCount {
                type_name: item_type.name().to_string(),
                expected: item_type.len(),
                actual: values.len(),
            });
        }
        let values: Box<[Arc<str>]> = values.iter().map(|v| self.intern_str(v.as_ref())).collect();
        let key = ItemKey {
            item_type: item_type.clone(),
            values,
            is_inner,
        };
        let ignore_case = self.ignore_case_markers;
        let item = match self.items.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let key = entry.key();
                let item = Item {
                    inner: Arc::new(ItemInner {
                        hash: structural_hash(&key.item_type, &key.values, is_inner),
                        item_type: key.item_type.clone(),
                        values: key.values.clone(),
                        is_inner,
                        as_string: OnceLock::new(),
                        order: RwLock::new(None),
                        markers: RwLock::new(MarkerSet::with_ignore_case(ignore_case)),
                    }),
                };
                entry.insert(item).clone()
            }
        };
        Ok(item)
    }

    /// Interns an item from its string form, splitting values on `:` and `;`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ValueCount`] if the split does not fit the type.
    pub fn parse(
        &mut self,
        item_type: &ItemType,
        text: &str,
        is_inner: bool,
    ) -> Result<Item, ModelError> {
        let values: Vec<&str> = text.split([':', ';']).collect();
        self.intern(item_type, &values, is_inner)
    }

    /// Returns the item with `tail`'s values appended to `item`'s values and
    /// typed by the tail's type. The order annotation is carried over if the
    /// result has none yet; `item` itself is not changed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ValueCount`] if the combined values do not fit
    /// the tail's type.
    pub fn append(&mut self, item: &Item, tail: &ItemTail) -> Result<Item, ModelError> {
        let values: Vec<&str> = item
            .values()
            .iter()
            .map(AsRef::as_ref)
            .chain(tail.values().iter().map(String::as_str))
            .collect();
        let appended = self.intern(tail.item_type(), &values, item.is_inner())?;
        if appended.order().is_none() {
            appended.set_order(item.order());
        }
        Ok(appended)
    }

    /// Number of interned items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if no item has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates all interned items in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Forgets all interned items and strings. Existing handles stay valid but
    /// are no longer identical to items created afterwards.
    pub fn reset(&mut self) {
        self.items.clear();
        self.strings.clear();
    }
}

/// Per-item data owned by a collaborator, kept outside the item so that it
/// never affects item equality.
#[derive(Debug, Clone)]
pub struct ItemSideTable<T> {
    entries: HashMap<Item, T>,
}

impl<T> Default for ItemSideTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> ItemSideTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Data attached to `item`.
    #[must_use]
    pub fn get(&self, item: &Item) -> Option<&T> {
        self.entries.get(item)
    }

    /// Mutable data attached to `item`, created on first access.
    pub fn get_or_insert_with(&mut self, item: &Item, create: impl FnOnce() -> T) -> &mut T {
        self.entries.entry(item.clone()).or_insert_with(create)
    }

    /// Attaches data, returning the previous value.
    pub fn insert(&mut self, item: Item, value: T) -> Option<T> {
        self.entries.insert(item, value)
    }

    /// Detaches data from `item`.
    pub fn remove(&mut self, item: &Item) -> Option<T> {
        self.entries.remove(item)
    }

    /// Number of items with attached data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no data is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(item, data)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Item, &T)> {
        self.entries.iter()
    }
}
