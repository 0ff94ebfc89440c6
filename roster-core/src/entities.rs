//! Employee record shapes.
//!
//! `EmployeeEntity` is the persisted form. `EmployeeDto` is the API form and
//! doubles as the candidate for create and full update, so every field is
//! optional until validation has run. `EmployeePatch` carries the fields a
//! partial update may touch.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::identity::EmployeeId;

/// Persisted employee row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmployeeEntity {
    /// `None` until the store assigns one.
    pub id: Option<EmployeeId>,
    pub name: String,
    pub email: String,
    pub age: i32,
    pub date_of_joining: NaiveDate,
    /// Stored as `is_active`.
    pub active: bool,
    pub salary: Decimal,
    pub role: String,
}

/// External employee representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    #[serde(default)]
    pub id: Option<EmployeeId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub date_of_joining: Option<NaiveDate>,
    #[serde(default, rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub salary: Option<Decimal>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Partial update payload.
///
/// Only `name`, `email`, `age` and `isActive` are patchable. `salary`,
/// `role`, `dateOfJoining` and `id` are accepted and discarded; any other key
/// fails deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmployeePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default, rename = "isActive")]
    pub is_active: Option<bool>,

    #[serde(default)]
    salary: Option<IgnoredAny>,
    #[serde(default)]
    role: Option<IgnoredAny>,
    #[serde(default)]
    date_of_joining: Option<IgnoredAny>,
    #[serde(default)]
    id: Option<IgnoredAny>,
}

impl EmployeePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }

    /// True when at least one patchable field carries a value.
    pub fn has_any_updates(&self) -> bool {
        self.name.is_some() || self.email.is_some() || self.age.is_some() || self.is_active.is_some()
    }

    /// Names of the non-patchable fields the caller supplied.
    pub fn ignored_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.salary.is_some() {
            fields.push("salary");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        if self.date_of_joining.is_some() {
            fields.push("dateOfJoining");
        }
        if self.id.is_some() {
            fields.push("id");
        }
        fields
    }

    /// Overwrite the present fields on `entity`, leaving the rest untouched.
    pub fn apply_to(&self, entity: &mut EmployeeEntity) {
        if let Some(name) = &self.name {
            entity.name = name.clone();
        }
        if let Some(email) = &self.email {
            entity.email = email.clone();
        }
        if let Some(age) = self.age {
            entity.age = age;
        }
        if let Some(active) = self.is_active {
            entity.active = active;
        }
    }
}
