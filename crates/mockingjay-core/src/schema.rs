//! JSON Schema for the report interchange format
//!
//! `mockingjay check --output json` prints a [`CompatibilityReport`]; this
//! schema lets CI tooling validate and consume it.

use crate::report::CompatibilityReport;

/// Generate the JSON Schema of [`CompatibilityReport`] as a pretty JSON string.
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(CompatibilityReport);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
