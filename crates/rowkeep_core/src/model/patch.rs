//! Wire-level field mutation request.

use serde::{Deserialize, Serialize};

/// Untyped `{ propertyName, propertyValue }` patch; the value is coerced
/// when applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPatch {
    pub property_name: String,
    pub property_value: String,
}

impl FieldPatch {
    pub fn new(property_name: impl Into<String>, property_value: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            property_value: property_value.into(),
        }
    }
}
