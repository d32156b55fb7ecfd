// crates/rowgate-core/src/core/sanitize.rs
// ============================================================================
// Module: Rowgate Input Sanitizers
// Description: Fail-closed checks for caller-supplied scalar inputs.
// Purpose: Gate every caller value before it can reach synthesized SQL text.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Sanitizers are small, total functions over untrusted text. Each either
//! proves a narrow shape claim about its input or fails; nothing here mutates
//! input into an "acceptable" form except [`escape_single_quotes`], which is
//! a pure literal-escaping step applied after shape checks have passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced by input sanitization checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// Value is not composed of exactly `width` ASCII digits.
    #[error("value is not a {width}-digit numeric token")]
    NotFixedWidthNumeric {
        /// Required token width in digits.
        width: usize,
    },
    /// Value is not an unsigned decimal number.
    #[error("value is not numeric")]
    NotNumeric,
    /// Value parsed but falls outside the permitted closed range.
    #[error("value {value} is outside the permitted range {min}..={max}")]
    OutOfRange {
        /// Parsed numeric value.
        value: u64,
        /// Lower bound of the permitted range (inclusive).
        min: u64,
        /// Upper bound of the permitted range (inclusive).
        max: u64,
    },
}

// ============================================================================
// SECTION: Sanitizers
// ============================================================================

/// Checks that `value` is exactly `width` ASCII digits, nothing more.
///
/// Whitespace, signs, and unicode digits are all rejected. This is the gate
/// for secondary lookup values such as order numbers.
///
/// # Errors
///
/// Returns [`SanitizeError::NotFixedWidthNumeric`] when the value does not
/// match the required shape.
pub fn fixed_width_token(value: &str, width: usize) -> Result<(), SanitizeError> {
    if value.len() == width && !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(());
    }
    Err(SanitizeError::NotFixedWidthNumeric {
        width,
    })
}

/// Parses `value` as an unsigned decimal and checks it against `min..=max`.
///
/// Returns the parsed value on success so callers never parse twice.
///
/// # Errors
///
/// Returns [`SanitizeError::NotNumeric`] when the value does not parse and
/// [`SanitizeError::OutOfRange`] when it parses outside the closed range.
pub fn subject_in_range(value: &str, min: u64, max: u64) -> Result<u64, SanitizeError> {
    let parsed: u64 = value.parse().map_err(|_| SanitizeError::NotNumeric)?;
    if !(min..=max).contains(&parsed) {
        return Err(SanitizeError::OutOfRange {
            value: parsed,
            min,
            max,
        });
    }
    Ok(parsed)
}

/// Doubles every single quote so `value` is safe inside a quoted SQL literal.
///
/// This is an escaping step, not a validation step: callers must still prove
/// the value's shape before embedding it, and every synthesized query is
/// re-checked by the safety validator afterwards.
#[must_use]
pub fn escape_single_quotes(value: &str) -> String {
    value.replace('\'', "''")
}
