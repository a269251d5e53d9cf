//! Item types and the item type registry.

use super::ModelError;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Largest field count supported by [`ItemTypeRegistry::generic`].
pub const MAX_GENERIC_FIELDS: usize = 40;

const SIMPLE_NAME: &str = "SIMPLE";
const GENERIC_PREFIX: &str = "GENERIC_";

/// Schema of an item: a name plus ordered field keys, each with an optional
/// `.name` subkey.
///
/// Equality and hashing are structural over keys and subkeys; the name is
/// not compared. Generic types (created by [`ItemTypeRegistry::generic`])
/// additionally *match* any type of the same field count, see
/// [`ItemType::matches`].
#[derive(Clone)]
pub struct ItemType {
    inner: Arc<ItemTypeInner>,
}

#[derive(Debug)]
struct ItemTypeInner {
    name: String,
    keys: Vec<String>,
    sub_keys: Vec<String>,
    matches_on_field_count: bool,
}

impl ItemType {
    fn new(
        name: &str,
        keys: &[&str],
        sub_keys: &[&str],
        matches_on_field_count: bool,
    ) -> Result<Self, ModelError> {
        if keys.is_empty() {
            return Err(ModelError::NoFields {
                name: name.to_string(),
            });
        }
        if keys.len() != sub_keys.len() {
            return Err(ModelError::SubKeyCount {
                name: name.to_string(),
                keys: keys.len(),
                sub_keys: sub_keys.len(),
            });
        }
        let sub_keys: Vec<String> = sub_keys.iter().map(|s| s.trim().to_string()).collect();
        if let Some(bad) = sub_keys.iter().find(|s| !is_valid_sub_key(s)) {
            return Err(ModelError::InvalidSubKey {
                name: name.to_string(),
                sub_key: bad.clone(),
            });
        }
        Ok(Self {
            inner: Arc::new(ItemTypeInner {
                name: name.to_string(),
                keys: keys.iter().map(|k| k.trim().to_string()).collect(),
                sub_keys,
                matches_on_field_count,
            }),
        })
    }

    /// Type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Field keys, in order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.inner.keys
    }

    /// Subkeys, parallel to [`ItemType::keys`]; each is empty or `.name`.
    #[must_use]
    pub fn sub_keys(&self) -> &[String] {
        &self.inner.sub_keys
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.keys.len()
    }

    /// Always `false`; a type has at least one field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.keys.is_empty()
    }

    /// Whether this type matches any type of the same field count.
    #[must_use]
    pub fn is_generic(&self) -> bool {
        self.inner.matches_on_field_count
    }

    /// Tests schema compatibility: generic types compare field counts, all
    /// other types compare structurally.
    #[must_use]
    pub fn matches(&self, other: &ItemType) -> bool {
        if self.is_generic() || other.is_generic() {
            self.len() == other.len()
        } else {
            self == other
        }
    }

    /// Whether field `index` shares its key with the preceding field, i.e.
    /// the two values are sub-fields of one key group.
    #[must_use]
    pub fn continues_key(&self, index: usize) -> bool {
        index > 0 && index < self.len() && self.inner.keys[index] == self.inner.keys[index - 1]
    }

    /// Declaration line as used in DIP files: `NAME Key Key.Sub`.
    #[must_use]
    pub fn declaration(&self) -> String {
        let mut out = self.inner.name.clone();
        for (key, sub) in self.inner.keys.iter().zip(&self.inner.sub_keys) {
            out.push(' ');
            out.push_str(key);
            out.push_str(sub);
        }
        out
    }

    fn same_shape(&self, keys: &[&str], sub_keys: &[&str]) -> bool {
        self.inner.keys.len() == keys.len()
            && self.inner.sub_keys.len() == sub_keys.len()
            && self.inner.keys.iter().zip(keys).all(|(a, b)| a == b.trim())
            && self
                .inner
                .sub_keys
                .iter()
                .zip(sub_keys)
                .all(|(a, b)| a == b.trim())
    }
}

/// Field count of a reserved `GENERIC_n` name.
fn generic_field_count(name: &str) -> Option<usize> {
    name.strip_prefix(GENERIC_PREFIX)?
        .parse()
        .ok()
        .filter(|n| (2..=MAX_GENERIC_FIELDS).contains(n))
}

fn is_valid_sub_key(sub_key: &str) -> bool {
    sub_key.is_empty()
        || sub_key
            .strip_prefix('.')
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('.'))
}

impl PartialEq for ItemType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.keys == other.inner.keys && self.inner.sub_keys == other.inner.sub_keys)
    }
}

impl Eq for ItemType {}

impl Hash for ItemType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.keys.hash(state);
        self.inner.sub_keys.hash(state);
    }
}

impl fmt::Debug for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemType({self})")
    }
}

impl fmt::Display for ItemType {
    /// Formats as `NAME(Key:Key.Sub)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)?;
        let mut sep = '(';
        for (key, sub) in self.inner.keys.iter().zip(&self.inner.sub_keys) {
            if sub.is_empty() {
                write!(f, "{sep}{}", key.trim_end_matches('.'))?;
            } else {
                write!(f, "{sep}{key}{sub}")?;
            }
            sep = ':';
        }
        write!(f, ")")
    }
}

/// Name-indexed table of item types.
///
/// The predefined `SIMPLE(Name)` type is always present. [`reset`] returns the
/// registry to that state.
///
/// [`reset`]: ItemTypeRegistry::reset
#[derive(Debug)]
pub struct ItemTypeRegistry {
    types: BTreeMap<String, ItemType>,
    simple: ItemType,
}

impl Default for ItemTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemTypeRegistry {
    /// Creates a registry containing only the predefined types.
    #[must_use]
    pub fn new() -> Self {
        let simple = ItemType {
            inner: Arc::new(ItemTypeInner {
                name: SIMPLE_NAME.to_string(),
                keys: vec!["Name".to_string()],
                sub_keys: vec![String::new()],
                matches_on_field_count: true,
            }),
        };
        let mut registry = Self {
            types: BTreeMap::new(),
            simple,
        };
        registry.load_predefined();
        registry
    }

    fn load_predefined(&mut self) {
        self.types
            .insert(SIMPLE_NAME.to_string(), self.simple.clone());
    }

    /// The predefined single-field generic type `SIMPLE(Name)`.
    #[must_use]
    pub fn simple(&self) -> ItemType {
        self.simple.clone()
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ItemType> {
        self.types.get(name).cloned()
    }

    /// Returns the type registered under `name`, creating it on first use.
    /// `GENERIC_n` names are reserved: they resolve to [`ItemTypeRegistry::generic`].
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ConflictingItemType`] if `name` is already
    /// registered with different keys or subkeys, or a validation error if
    /// the keys are malformed.
    pub fn get_or_create(
        &mut self,
        name: &str,
        keys: &[&str],
        sub_keys: &[&str],
    ) -> Result<ItemType, ModelError> {
        let Some(field_count) = generic_field_count(name) else {
            return self.get_or_create_with(name, keys, sub_keys, false);
        };
        let generic = self.generic(field_count)?;
        if generic.same_shape(keys, sub_keys) {
            return Ok(generic);
        }
        let requested = ItemType::new(name, keys, sub_keys, false)?;
        Err(ModelError::ConflictingItemType {
            name: name.to_string(),
            registered: generic.to_string(),
            requested: requested.to_string(),
        })
    }

    fn get_or_create_with(
        &mut self,
        name: &str,
        keys: &[&str],
        sub_keys: &[&str],
        matches_on_field_count: bool,
    ) -> Result<ItemType, ModelError> {
        if let Some(existing) = self.types.get(name) {
            if existing.same_shape(keys, sub_keys) {
                return Ok(existing.clone());
            }
            let requested = ItemType::new(name, keys, sub_keys, matches_on_field_count)?;
            return Err(ModelError::ConflictingItemType {
                name: name.to_string(),
                registered: existing.to_string(),
                requested: requested.to_string(),
            });
        }
        let created = ItemType::new(name, keys, sub_keys, matches_on_field_count)?;
        self.types.insert(name.to_string(), created.clone());
        Ok(created)
    }

    /// Returns the generic type with `field_count` fields: `SIMPLE` for one
    /// field, `GENERIC_n` with keys `Field_1..Field_n` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::GenericFieldCount`] outside `1..=40`.
    pub fn generic(&mut self, field_count: usize) -> Result<ItemType, ModelError> {
        if !(1..=MAX_GENERIC_FIELDS).contains(&field_count) {
            return Err(ModelError::GenericFieldCount(field_count));
        }
        if field_count == 1 {
            return Ok(self.simple());
        }
        let keys: Vec<String> = (1..=field_count).map(|i| format!("Field_{i}")).collect();
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let sub_keys = vec![""; field_count];
        self.get_or_create_with(&format!("{GENERIC_PREFIX}{field_count}"), &keys, &sub_keys, true)
    }

    /// Parses and registers a declaration such as `NAME(Key:Key.Sub)` or the
    /// DIP form `NAME Key Key.Sub`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidDeclaration`] when no name is present, or
    /// any error of [`ItemTypeRegistry::get_or_create`].
    pub fn declare(&mut self, declaration: &str) -> Result<ItemType, ModelError> {
        let mut parts = declaration
            .split(|c: char| matches!(c, ':' | ';' | '(' | ')') || c.is_whitespace())
            .filter(|p| !p.is_empty());
        let Some(name) = parts.next() else {
            return Err(ModelError::InvalidDeclaration(declaration.to_string()));
        };
        let mut keys = Vec::new();
        let mut sub_keys = Vec::new();
        for part in parts {
            let mut split = part.splitn(3, '.');
            keys.push(split.next().unwrap_or_default());
            sub_keys.push(split.next().map(|s| format!(".{s}")).unwrap_or_default());
        }
        let sub_keys: Vec<&str> = sub_keys.iter().map(String::as_str).collect();
        self.get_or_create(name, &keys, &sub_keys)
    }

    /// Iterates all registered types ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &ItemType> {
        self.types.values()
    }

    /// Removes all user-defined and generic types.
    pub fn reset(&mut self) {
        self.types.clear();
        self.load_predefined();
    }
}
