//! ROSTER Test Utilities
//!
//! Centralized test infrastructure for the ROSTER workspace:
//! - Proptest generators for valid and invalid employee candidates
//! - Test fixtures for common scenarios
//! - In-memory store and cache pairs
//! - Custom assertions for ROSTER-specific errors

// Re-export core types for convenience
pub use roster_core::{
    EmployeeDto, EmployeeEntity, EmployeeId, EmployeePatch, EmployeeValidator, RosterError,
    RosterResult, StorageError, ValidationErrors, DEFAULT_ROLES,
};
pub use roster_storage::{
    CacheConfig, InMemoryCacheBackend, InMemoryEmployeeStore, EMAIL_UNIQUE_CONSTRAINT,
};

use std::sync::Arc;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for employee candidates and patches.

    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use roster_core::validation::{AGE_MAX, AGE_MIN};
    use rust_decimal::Decimal;

    /// Letters-only name of 2 to 41 characters, optionally two words.
    pub fn arb_valid_name() -> impl Strategy<Value = String> {
        ("[A-Za-z]{2,20}", proptest::option::of("[A-Za-z]{1,20}")).prop_map(|(first, last)| {
            match last {
                Some(last) => format!("{} {}", first, last),
                None => first,
            }
        })
    }

    /// Simple `local@domain.tld` address.
    pub fn arb_valid_email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9]{0,11}", "[a-z]{2,10}", prop::sample::select(vec!["com", "org", "io"]))
            .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
    }

    pub fn arb_valid_age() -> impl Strategy<Value = i32> {
        AGE_MIN..=AGE_MAX
    }

    /// Salary in cents between 100.50 and 100000.99 inclusive.
    pub fn arb_valid_salary() -> impl Strategy<Value = Decimal> {
        (10_050i64..=10_000_099i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    pub fn arb_valid_role() -> impl Strategy<Value = String> {
        prop::sample::select(DEFAULT_ROLES.to_vec()).prop_map(str::to_string)
    }

    /// Joining date between 1990-01-01 and 2023-12-31.
    pub fn arb_past_date() -> impl Strategy<Value = NaiveDate> {
        (0u32..12_418).prop_map(|offset| {
            fixtures::date(1990, 1, 1) + chrono::Duration::days(i64::from(offset))
        })
    }

    /// A candidate that passes full validation.
    pub fn arb_valid_candidate() -> impl Strategy<Value = EmployeeDto> {
        (
            arb_valid_name(),
            arb_valid_email(),
            arb_valid_age(),
            arb_past_date(),
            arb_valid_salary(),
            arb_valid_role(),
        )
            .prop_map(|(name, email, age, joined, salary, role)| EmployeeDto {
                id: None,
                name: Some(name),
                email: Some(email),
                age: Some(age),
                date_of_joining: Some(joined),
                is_active: Some(true),
                salary: Some(salary),
                role: Some(role),
            })
    }

    /// Ages outside the accepted range.
    pub fn arb_invalid_age() -> impl Strategy<Value = i32> {
        prop_oneof![0..AGE_MIN, (AGE_MAX + 1)..150]
    }

    /// A patch whose present fields all pass patch validation.
    pub fn arb_valid_patch() -> impl Strategy<Value = EmployeePatch> {
        (
            proptest::option::of(arb_valid_name()),
            proptest::option::of(arb_valid_age()),
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(name, age, active)| {
                let mut patch = EmployeePatch::new();
                if let Some(name) = name {
                    patch = patch.with_name(name);
                }
                if let Some(age) = age {
                    patch = patch.with_age(age);
                }
                if let Some(active) = active {
                    patch = patch.with_active(active);
                }
                patch
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records for common test scenarios.

    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    /// Calendar date; panics on an impossible date.
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_else(|| {
            panic!("invalid fixture date {}-{}-{}", year, month, day)
        })
    }

    /// Jane Doe, a valid engineer candidate without an id.
    pub fn jane_doe() -> EmployeeDto {
        EmployeeDto {
            id: None,
            name: Some("Jane Doe".to_string()),
            email: Some("jane@x.com".to_string()),
            age: Some(30),
            date_of_joining: Some(date(2020, 1, 1)),
            is_active: Some(true),
            salary: Some(Decimal::new(500_000, 2)),
            role: Some("ENGINEER".to_string()),
        }
    }

    /// A second valid candidate with a distinct email.
    pub fn john_roe() -> EmployeeDto {
        EmployeeDto {
            name: Some("John Roe".to_string()),
            email: Some("john@x.com".to_string()),
            age: Some(45),
            role: Some("MANAGER".to_string()),
            ..jane_doe()
        }
    }

    /// Jane Doe as JSON, the shape a client posts.
    pub fn jane_doe_json() -> serde_json::Value {
        serde_json::json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "age": 30,
            "dateOfJoining": "2020-01-01",
            "isActive": true,
            "salary": 5000.00,
            "role": "ENGINEER"
        })
    }

    /// Candidate with every field absent.
    pub fn empty_candidate() -> EmployeeDto {
        EmployeeDto::default()
    }
}

// ============================================================================
// IN-MEMORY BACKENDS
// ============================================================================

/// Fresh in-memory store and cache with default settings.
pub fn in_memory_backends() -> (Arc<InMemoryEmployeeStore>, Arc<InMemoryCacheBackend>) {
    in_memory_backends_with(CacheConfig::default())
}

/// Fresh in-memory store and a cache with the given settings.
pub fn in_memory_backends_with(
    config: CacheConfig,
) -> (Arc<InMemoryEmployeeStore>, Arc<InMemoryCacheBackend>) {
    (
        Arc::new(InMemoryEmployeeStore::new()),
        Arc::new(InMemoryCacheBackend::new(config)),
    )
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for ROSTER-specific errors.

    use super::*;

    /// Assert that validation failed and reported `field`.
    #[track_caller]
    pub fn assert_field_error(result: &Result<(), ValidationErrors>, field: &str) {
        match result {
            Err(errors) => assert!(
                errors.has_field(field),
                "Expected an error on '{}', got: {}",
                field,
                errors
            ),
            Ok(()) => panic!("Expected an error on '{}', validation passed", field),
        }
    }

    /// Assert that a store result is a unique violation on the email.
    #[track_caller]
    pub fn assert_unique_violation<T: std::fmt::Debug>(result: &RosterResult<T>) {
        match result {
            Err(RosterError::Storage(StorageError::UniqueViolation { constraint, .. })) => {
                assert_eq!(constraint, EMAIL_UNIQUE_CONSTRAINT);
            }
            other => panic!("Expected UniqueViolation, got: {:?}", other),
        }
    }

    /// Assert that a store result is a NotFound storage error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &RosterResult<T>) {
        match result {
            Err(RosterError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }
}
