//! # Validation Module
//!
//! Input validation for engine requests.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP (stockroom-api)                                         │
//! │  └── JSON shape (serde deserialization)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Ids present and well-formed                                       │
//! │  └── Quantities positive and bounded                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints on every quantity bucket                        │
//! │  └── UNIQUE (unit_id, location_id)                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Anything failing here surfaces as `BAD_INPUT` and never reaches storage.

use crate::error::ValidationError;
use crate::{MAX_ID_LENGTH, MAX_NOTE_LENGTH, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates an opaque identifier (unit, location, order, order line...).
///
/// ## Rules
/// - Must not be empty or blank
/// - At most [`MAX_ID_LENGTH`] characters
/// - No whitespace or control characters
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_id;
///
/// assert!(validate_id("unitId", "SIZE-M-RED").is_ok());
/// assert!(validate_id("unitId", "").is_err());
/// assert!(validate_id("unitId", "has space").is_err());
/// ```
pub fn validate_id(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_ID_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LENGTH,
        });
    }

    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates a location code such as `WH-UK-01`.
///
/// Letters, digits, hyphens and underscores, up to 32 characters.
pub fn validate_location_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (1..=200 characters).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an optional free-text note.
pub fn validate_note(note: Option<&str>) -> ValidationResult<()> {
    match note {
        Some(text) if text.chars().count() > MAX_NOTE_LENGTH => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LENGTH,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Quantity Validators
// =============================================================================

/// Validates a movement quantity.
///
/// ## Rules
/// - Must be positive (zero-quantity movements are meaningless)
/// - Must not exceed [`MAX_QUANTITY`]
pub fn validate_quantity(field: &str, qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a signed on-hand adjustment.
pub fn validate_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustNotBeZero {
            field: "delta".to_string(),
        });
    }

    if !(-MAX_QUANTITY..=MAX_QUANTITY).contains(&delta) {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_QUANTITY,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a safety-stock level (zero allowed).
pub fn validate_safety_stock(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "safetyStock".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "safetyStock".to_string(),
            min: 0,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("unitId", "SIZE-M").is_ok());
        assert!(validate_id("unitId", "550e8400-e29b-41d4-a716-446655440000").is_ok());

        assert!(validate_id("unitId", "").is_err());
        assert!(validate_id("unitId", "   ").is_err());
        assert!(validate_id("unitId", "a\tb").is_err());
        assert!(validate_id("unitId", &"x".repeat(MAX_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_location_code() {
        assert!(validate_location_code("WH-UK-01").is_ok());
        assert!(validate_location_code("store_3").is_ok());
        assert!(validate_location_code("").is_err());
        assert!(validate_location_code("WH UK").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("qty", 1).is_ok());
        assert!(validate_quantity("qty", MAX_QUANTITY).is_ok());

        assert!(validate_quantity("qty", 0).is_err());
        assert!(validate_quantity("qty", -5).is_err());
        assert!(validate_quantity("qty", MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_delta() {
        assert!(validate_delta(-3).is_ok());
        assert!(validate_delta(12).is_ok());
        assert_eq!(
            validate_delta(0),
            Err(ValidationError::MustNotBeZero {
                field: "delta".to_string()
            })
        );
    }

    #[test]
    fn test_validate_safety_stock() {
        assert!(validate_safety_stock(0).is_ok());
        assert!(validate_safety_stock(10).is_ok());
        assert!(validate_safety_stock(-1).is_err());
    }

    #[test]
    fn test_validate_note() {
        assert!(validate_note(None).is_ok());
        assert!(validate_note(Some("cycle count")).is_ok());
        assert!(validate_note(Some(&"n".repeat(MAX_NOTE_LENGTH + 1))).is_err());
    }
}
