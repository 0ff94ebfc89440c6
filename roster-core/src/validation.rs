//! Field-level validation for employee candidates.
//!
//! Every constraint runs independently and reports into one
//! [`ValidationErrors`] so callers can surface all problems at once.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::entities::{EmployeeDto, EmployeePatch};
use crate::error::ValidationErrors;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const AGE_MIN: i32 = 18;
pub const AGE_MAX: i32 = 65;
/// Six, so the inclusive ceiling 100000.99 keeps its shape.
pub const SALARY_MAX_INTEGER_DIGITS: usize = 6;
pub const SALARY_MAX_FRACTION_DIGITS: u32 = 2;

/// Inclusive salary floor, 100.50.
pub const SALARY_MIN: Decimal = Decimal::from_parts(10050, 0, 0, false, 2);
/// Inclusive salary ceiling, 100000.99.
pub const SALARY_MAX: Decimal = Decimal::from_parts(10000099, 0, 0, false, 2);

pub const DEFAULT_ROLES: &[&str] = &["ADMIN", "ANALYST", "ENGINEER", "MANAGER", "USER"];

#[allow(clippy::expect_used)]
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z\s]+$").expect("name pattern is valid")
});

#[allow(clippy::expect_used)]
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
        .expect("email pattern is valid")
});

// ============================================================================
// ROLE RULE
// ============================================================================

/// Pluggable rule deciding which role strings are acceptable.
pub trait RoleRule: Send + Sync {
    fn is_valid(&self, role: &str) -> bool;

    /// Message reported on the `role` field when `is_valid` fails.
    fn message(&self) -> String;
}

/// Role rule backed by a fixed set of allowed role names (exact match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedRoles {
    roles: BTreeSet<String>,
}

impl AllowedRoles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles
                .into_iter()
                .map(|r| {
                    let r: String = r.into();
                    r.trim().to_string()
                })
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated role list, e.g. `"ADMIN,USER"`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl Default for AllowedRoles {
    fn default() -> Self {
        Self::new(DEFAULT_ROLES.iter().copied())
    }
}

impl RoleRule for AllowedRoles {
    fn is_valid(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    fn message(&self) -> String {
        let listed = self.roles.iter().cloned().collect::<Vec<_>>().join(", ");
        format!("Role must be one of: {}", listed)
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

/// Validates employee candidates and patches.
#[derive(Clone)]
pub struct EmployeeValidator {
    role_rule: Arc<dyn RoleRule>,
}

impl std::fmt::Debug for EmployeeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmployeeValidator").finish_non_exhaustive()
    }
}

impl Default for EmployeeValidator {
    fn default() -> Self {
        Self::new(Arc::new(AllowedRoles::default()))
    }
}

impl EmployeeValidator {
    pub fn new(role_rule: Arc<dyn RoleRule>) -> Self {
        Self { role_rule }
    }

    /// Validate a full candidate against today's UTC date.
    pub fn validate(&self, candidate: &EmployeeDto) -> Result<(), ValidationErrors> {
        self.validate_at(candidate, Utc::now().date_naive())
    }

    /// Validate a full candidate, treating `today` as the current date.
    pub fn validate_at(
        &self,
        candidate: &EmployeeDto,
        today: NaiveDate,
    ) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        check_name(candidate.name.as_deref(), &mut errors);
        check_email(candidate.email.as_deref(), &mut errors);
        check_age(candidate.age, &mut errors);
        check_date_of_joining(candidate.date_of_joining, today, &mut errors);
        check_active(candidate.is_active, &mut errors);
        check_salary(candidate.salary, &mut errors);
        self.check_role(candidate.role.as_deref(), &mut errors);

        errors.into_result()
    }

    /// Validate only the fields a patch supplies.
    ///
    /// `isActive` is unconstrained here: a patch is how a record gets
    /// deactivated.
    pub fn validate_patch(&self, patch: &EmployeePatch) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(name) = patch.name.as_deref() {
            check_name(Some(name), &mut errors);
        }
        if let Some(email) = patch.email.as_deref() {
            check_email(Some(email), &mut errors);
        }
        if let Some(age) = patch.age {
            check_age(Some(age), &mut errors);
        }

        errors.into_result()
    }

    fn check_role(&self, role: Option<&str>, errors: &mut ValidationErrors) {
        match role {
            Some(role) if !role.trim().is_empty() => {
                if !self.role_rule.is_valid(role) {
                    errors.push("role", self.role_rule.message());
                }
            }
            _ => errors.push("role", "Role of the employee cannot be blank"),
        }
    }
}

fn check_name(name: Option<&str>, errors: &mut ValidationErrors) {
    let Some(name) = name else {
        errors.push("name", "Name cannot be blank");
        return;
    };
    if name.trim().is_empty() {
        errors.push("name", "Name cannot be blank");
    }
    let chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        errors.push(
            "name",
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        );
    }
    if !NAME_PATTERN.is_match(name) {
        errors.push("name", "Name can only contain letters and spaces");
    }
}

fn check_email(email: Option<&str>, errors: &mut ValidationErrors) {
    match email {
        Some(email) if !email.trim().is_empty() => {
            if !EMAIL_PATTERN.is_match(email) {
                errors.push("email", "Email should be valid");
            }
        }
        _ => errors.push("email", "Email is required"),
    }
}

fn check_age(age: Option<i32>, errors: &mut ValidationErrors) {
    match age {
        None => errors.push("age", "Age is required"),
        Some(age) if age < AGE_MIN => {
            errors.push("age", format!("Age must be at least {}", AGE_MIN));
        }
        Some(age) if age > AGE_MAX => {
            errors.push("age", format!("Age must be at most {}", AGE_MAX));
        }
        Some(_) => {}
    }
}

fn check_date_of_joining(date: Option<NaiveDate>, today: NaiveDate, errors: &mut ValidationErrors) {
    match date {
        None => errors.push("dateOfJoining", "Date of joining is required"),
        Some(date) if date > today => {
            errors.push("dateOfJoining", "Date of joining must be in the past or today");
        }
        Some(_) => {}
    }
}

fn check_active(active: Option<bool>, errors: &mut ValidationErrors) {
    match active {
        None => errors.push("isActive", "Active status must be specified"),
        Some(false) => errors.push("isActive", "Employee should be active"),
        Some(true) => {}
    }
}

fn check_salary(salary: Option<Decimal>, errors: &mut ValidationErrors) {
    let Some(salary) = salary else {
        errors.push("salary", "Salary cannot be null");
        return;
    };
    if salary <= Decimal::ZERO {
        errors.push("salary", "Salary of Employee should be positive");
    }
    let (integer_digits, fraction_digits) = digit_counts(salary);
    if integer_digits > SALARY_MAX_INTEGER_DIGITS || fraction_digits > SALARY_MAX_FRACTION_DIGITS {
        errors.push("salary", "The salary can be in the form XXXXX.XX");
    }
    if salary > SALARY_MAX {
        errors.push("salary", "Salary cannot exceed 100,000.99");
    }
    if salary < SALARY_MIN {
        errors.push("salary", "Salary must be at least 100.50");
    }
}

/// Integer and fraction digit counts with trailing fraction zeros dropped.
fn digit_counts(value: Decimal) -> (usize, u32) {
    let normalized = value.abs().normalize();
    let integer_part = normalized.trunc();
    let integer_digits = if integer_part.is_zero() {
        0
    } else {
        integer_part.to_string().len()
    };
    (integer_digits, normalized.scale())
}

// =============================================================================
// TESTS
// =============================================================================
