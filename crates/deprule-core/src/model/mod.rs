//! Item and dependency model.
//!
//! Items are typed tuples of string values, interned by an [`ItemStore`] so
//! that handle identity equals structural identity. Dependencies are counted,
//! markable edges between two items.

mod dependency;
mod item;
mod item_type;
mod markers;
mod registry;

pub use dependency::{
    aggregate_all_edges, collect_outgoing, collect_outgoing_of, Dependency, SourceLocation,
};
pub use item::{Item, ItemSideTable, ItemStore, ItemTail};
pub use item_type::{ItemType, ItemTypeRegistry, MAX_GENERIC_FIELDS};
pub use markers::{MarkerPattern, MarkerSet};
pub use registry::Registry;

pub(crate) use dependency::DIP_ARROW;

use thiserror::Error;

/// Errors raised while building item types and items.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// An item type was declared without any field.
    #[error("item type {name} must have at least one field")]
    NoFields {
        /// Name of the item type.
        name: String,
    },

    /// Keys and subkeys have different lengths.
    #[error("item type {name}: {keys} keys but {sub_keys} subkeys")]
    SubKeyCount {
        /// Name of the item type.
        name: String,
        /// Number of keys.
        keys: usize,
        /// Number of subkeys.
        sub_keys: usize,
    },

    /// A subkey is neither empty nor of the form `.name`.
    #[error("item type {name}: subkey must either be empty or .name, but not '{sub_key}'")]
    InvalidSubKey {
        /// Name of the item type.
        name: String,
        /// The offending subkey.
        sub_key: String,
    },

    /// A type name was registered again with a different shape.
    #[error("item type {name} is already registered as {registered}, cannot redefine it as {requested}")]
    ConflictingItemType {
        /// Name of the item type.
        name: String,
        /// Declaration of the registered type.
        registered: String,
        /// Declaration that was rejected.
        requested: String,
    },

    /// A generic type was requested with an unsupported field count.
    #[error("generic item types have 1..={MAX_GENERIC_FIELDS} fields, not {0}")]
    GenericFieldCount(usize),

    /// Item values do not fit the item type.
    #[error("item type {type_name} has {expected} fields, but {actual} values were given")]
    ValueCount {
        /// Name of the item type.
        type_name: String,
        /// Number of fields of the type.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// A type declaration could not be parsed.
    #[error("invalid item type declaration '{0}'")]
    InvalidDeclaration(String),
}
