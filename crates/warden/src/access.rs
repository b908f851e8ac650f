//! Capability-based permission model.
//!
//! Each role carries an enumerated set of permitted operations, checked
//! explicitly at every entry point. Who holds which role (credentials,
//! sessions) is a collaborator concern.

use serde::{Deserialize, Serialize};

/// Operations the API surface gates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageSubjects,
    ManageFacilities,
    ViewReports,
    ExportHistory,
    UrgentHold,
    GrantRelease,
}

/// Caller roles, from least to most privileged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Operator,
    Director,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Director => "director",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "operator" => Some(Role::Operator),
            "director" => Some(Role::Director),
            _ => None,
        }
    }

    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Role::Operator => &[
                Capability::ManageSubjects,
                Capability::ManageFacilities,
                Capability::ViewReports,
                Capability::ExportHistory,
            ],
            Role::Director => &[
                Capability::ManageSubjects,
                Capability::ManageFacilities,
                Capability::ViewReports,
                Capability::ExportHistory,
                Capability::UrgentHold,
                Capability::GrantRelease,
            ],
        }
    }

    pub fn allows(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

/// Denied operation, reported to the caller; no state mutation occurs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("role '{role}' lacks the '{capability:?}' capability")]
pub struct AccessDenied {
    pub role: &'static str,
    pub capability: Capability,
}

/// Check a capability at an entry point.
pub fn ensure(role: Role, capability: Capability) -> Result<(), AccessDenied> {
    if role.allows(capability) {
        Ok(())
    } else {
        Err(AccessDenied {
            role: role.label(),
            capability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_manages_subjects_and_facilities() {
        assert!(ensure(Role::Operator, Capability::ManageSubjects).is_ok());
        assert!(ensure(Role::Operator, Capability::ManageFacilities).is_ok());
        assert!(ensure(Role::Operator, Capability::ExportHistory).is_ok());
    }

    #[test]
    fn operator_cannot_use_privileged_overrides() {
        assert!(ensure(Role::Operator, Capability::UrgentHold).is_err());
        assert!(ensure(Role::Operator, Capability::GrantRelease).is_err());
    }

    #[test]
    fn director_holds_every_capability() {
        for capability in [
            Capability::ManageSubjects,
            Capability::ManageFacilities,
            Capability::ViewReports,
            Capability::ExportHistory,
            Capability::UrgentHold,
            Capability::GrantRelease,
        ] {
            assert!(ensure(Role::Director, capability).is_ok());
        }
    }

    #[test]
    fn parse_accepts_known_labels_only() {
        assert_eq!(Role::parse("Director"), Some(Role::Director));
        assert_eq!(Role::parse(" operator "), Some(Role::Operator));
        assert_eq!(Role::parse("president"), None);
    }
}
