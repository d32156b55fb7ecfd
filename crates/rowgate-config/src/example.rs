// crates/rowgate-config/src/example.rs
// ============================================================================
// Module: Config Example
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for Rowgate configuration. The output is deterministic,
//! parses cleanly, and passes full validation; tests keep it in sync with the
//! config model.

/// Returns a canonical example `rowgate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[connection]
host = "localhost"
database = "northwind"

[identity]
subject_min = 1
subject_max = 30
admin_subjects = [3, 11]
correlation_width = 2

[scoping]
column = "customer_id"
tables = ["customer_orders", "orders"]

[[objects]]
handler = "scoped_procedure"
object = "sp_customer_orders"
parameter = "customer"

[[objects]]
handler = "correlation_query"
object = "customer_orders_details"
column = "order_id"

[dev]
permit_missing_subject = false

[audit]
sink = "stderr"
# sink = "file"
# path = "rowgate-audit.jsonl"
"#,
    )
}
