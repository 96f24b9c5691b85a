// Column selection and validation for the chart form

use crate::data::TabularPreview;
use crate::kind::ChartKind;
use anyhow::{anyhow, Error, Result};
use std::fmt;
use std::str::FromStr;

/// Chart-semantic role a dataset column can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    X,
    Y,
    Value,
    Label,
}

impl Role {
    pub const ALL: [Self; 4] = [Self::X, Self::Y, Self::Value, Self::Label];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Value => "value",
            Self::Label => "label",
        }
    }

    /// Placeholder text of the empty choice in the column picker
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::X => "Select X-Axis column...",
            Self::Y => "Select Y-Axis column...",
            Self::Value => "Select value column...",
            Self::Label => "Select label column...",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("Unknown role '{}' (expected x, y, value or label)", s))
    }
}

/// Mapping from role to the column key chosen for it.
///
/// An empty key is the same as no choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleAssignment {
    x: Option<String>,
    y: Option<String>,
    value: Option<String>,
    label: Option<String>,
}

impl RoleAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: Role, column: impl Into<String>) -> Self {
        self.set(role, column);
        self
    }

    pub fn set(&mut self, role: Role, column: impl Into<String>) {
        let column = column.into();
        *self.slot_mut(role) = if column.is_empty() { None } else { Some(column) };
    }

    pub fn clear(&mut self, role: Role) {
        *self.slot_mut(role) = None;
    }

    pub fn get(&self, role: Role) -> Option<&str> {
        let slot = match role {
            Role::X => &self.x,
            Role::Y => &self.y,
            Role::Value => &self.value,
            Role::Label => &self.label,
        };
        slot.as_deref().filter(|c| !c.is_empty())
    }

    pub fn is_assigned(&self, role: Role) -> bool {
        self.get(role).is_some()
    }

    fn slot_mut(&mut self, role: Role) -> &mut Option<String> {
        match role {
            Role::X => &mut self.x,
            Role::Y => &mut self.y,
            Role::Value => &mut self.value,
            Role::Label => &mut self.label,
        }
    }

    /// Roles the chart kind needs that have no column yet
    pub fn missing_roles(&self, kind: ChartKind) -> Vec<Role> {
        kind.required_roles()
            .iter()
            .copied()
            .filter(|r| !self.is_assigned(*r))
            .collect()
    }

    /// Fail on the first assigned column that the preview does not have
    pub fn check_columns(&self, preview: &TabularPreview) -> Result<()> {
        for role in Role::ALL {
            if let Some(column) = self.get(role) {
                if !preview.has_column(column) {
                    anyhow::bail!("Column '{}' not found (role '{}')", column, role);
                }
            }
        }
        Ok(())
    }
}

/// True when every role required by `kind` has a non-empty column
pub fn validate(selection: &RoleAssignment, kind: ChartKind) -> bool {
    kind.required_roles().iter().all(|r| selection.is_assigned(*r))
}

/// Enabled state and caption of the "update chart" control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateControl {
    pub enabled: bool,
    pub label: &'static str,
}

impl UpdateControl {
    pub fn for_selection(selection: &RoleAssignment, kind: ChartKind) -> Self {
        if validate(selection, kind) {
            Self { enabled: true, label: "Update Chart" }
        } else {
            Self { enabled: false, label: "Select Data to Update Chart" }
        }
    }
}

/// Which column pickers the form shows for a chart kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFields {
    pub x: bool,
    pub y: bool,
    pub value: bool,
    pub label: bool,
}

impl FormFields {
    pub fn for_kind(kind: ChartKind) -> Self {
        let pie = kind.is_categorical();
        Self {
            x: true,
            y: !pie,
            value: pie,
            label: pie,
        }
    }
}
