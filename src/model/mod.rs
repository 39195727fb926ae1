//! Immutable endpoint model types.
//!
//! Conditions and mappings are built once per endpoint definition and shared
//! read-only across requests; every construction-time invariant (duplicate
//! names, invalid identifiers) is rejected here, never during a request.

mod condition;
mod mapping;

pub use condition::{ConditionSet, ParameterCondition};
pub use mapping::{FieldMapping, MappingSet};
