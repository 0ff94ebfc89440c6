//! Conversion between the persisted and external employee shapes.

use crate::entities::{EmployeeDto, EmployeeEntity};
use crate::error::{RosterError, RosterResult};

impl From<&EmployeeEntity> for EmployeeDto {
    fn from(entity: &EmployeeEntity) -> Self {
        Self {
            id: entity.id,
            name: Some(entity.name.clone()),
            email: Some(entity.email.clone()),
            age: Some(entity.age),
            date_of_joining: Some(entity.date_of_joining),
            is_active: Some(entity.active),
            salary: Some(entity.salary),
            role: Some(entity.role.clone()),
        }
    }
}

impl From<EmployeeEntity> for EmployeeDto {
    fn from(entity: EmployeeEntity) -> Self {
        Self {
            id: entity.id,
            name: Some(entity.name),
            email: Some(entity.email),
            age: Some(entity.age),
            date_of_joining: Some(entity.date_of_joining),
            is_active: Some(entity.active),
            salary: Some(entity.salary),
            role: Some(entity.role),
        }
    }
}

/// Converts a candidate into the persisted shape.
///
/// Intended for candidates that already passed validation; any missing
/// field still surfaces as [`RosterError::MissingField`].
impl TryFrom<EmployeeDto> for EmployeeEntity {
    type Error = RosterError;

    fn try_from(dto: EmployeeDto) -> RosterResult<Self> {
        Ok(Self {
            id: dto.id,
            name: required(dto.name, "name")?,
            email: required(dto.email, "email")?,
            age: required(dto.age, "age")?,
            date_of_joining: required(dto.date_of_joining, "dateOfJoining")?,
            active: required(dto.is_active, "isActive")?,
            salary: required(dto.salary, "salary")?,
            role: required(dto.role, "role")?,
        })
    }
}

impl EmployeeEntity {
    /// Copy every mutable field from `other`, keeping this record's id.
    pub fn replace_fields(&mut self, other: EmployeeEntity) {
        self.name = other.name;
        self.email = other.email;
        self.age = other.age;
        self.date_of_joining = other.date_of_joining;
        self.active = other.active;
        self.salary = other.salary;
        self.role = other.role;
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> RosterResult<T> {
    value.ok_or(RosterError::MissingField { field })
}
