//! Query construction
//!
//! Filters are composed from an immutable list of typed predicates and
//! rendered to query text plus named parameters in one deterministic pass.
//! Predicate values are only ever carried as parameters.

mod builder;
mod predicate;

pub use builder::{QueryBuilder, QueryParameter, QuerySpec, Selection};
pub use predicate::{Pagination, Predicate, RangeBound};

/// Field names must be plain identifiers: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_field_name(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
