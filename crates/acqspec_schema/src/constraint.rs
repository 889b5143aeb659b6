//! Constraint values - the acceptance rule attached to one field.
//!
//! A constraint is exactly one of four shapes. Values are kept as the raw
//! text the user typed; numeric interpretation belongs to the compliance
//! engine that consumes the exported schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The acceptance rule for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintValue {
    /// Value must match exactly
    Exact { value: String },
    /// Value must fall inside the inclusive range [min, max]
    Range { min: String, max: String },
    /// Value must be within `value ± tolerance`
    Tolerance { value: String, tolerance: String },
    /// Value must contain the substring
    Contains { substring: String },
}

impl Default for ConstraintValue {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConstraintValue {
    pub fn exact(value: impl Into<String>) -> Self {
        ConstraintValue::Exact {
            value: value.into(),
        }
    }

    pub fn range(min: impl Into<String>, max: impl Into<String>) -> Self {
        ConstraintValue::Range {
            min: min.into(),
            max: max.into(),
        }
    }

    pub fn tolerance(value: impl Into<String>, tolerance: impl Into<String>) -> Self {
        ConstraintValue::Tolerance {
            value: value.into(),
            tolerance: tolerance.into(),
        }
    }

    pub fn contains(substring: impl Into<String>) -> Self {
        ConstraintValue::Contains {
            substring: substring.into(),
        }
    }

    /// `Exact("")`, the value given to freshly added fields and cells.
    pub fn empty() -> Self {
        Self::exact("")
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            ConstraintValue::Exact { .. } => ConstraintKind::Exact,
            ConstraintValue::Range { .. } => ConstraintKind::Range,
            ConstraintValue::Tolerance { .. } => ConstraintKind::Tolerance,
            ConstraintValue::Contains { .. } => ConstraintKind::Contains,
        }
    }

    /// Switch the active variant.
    ///
    /// `value` is shared by `Exact` and `Tolerance` and survives a switch
    /// between the two. Every other sub-field starts out empty.
    pub fn set_variant(&mut self, kind: ConstraintKind) {
        if self.kind() == kind {
            return;
        }
        let carried = match self {
            ConstraintValue::Exact { value } | ConstraintValue::Tolerance { value, .. } => {
                std::mem::take(value)
            }
            ConstraintValue::Range { .. } | ConstraintValue::Contains { .. } => String::new(),
        };
        *self = match kind {
            ConstraintKind::Exact => ConstraintValue::Exact { value: carried },
            ConstraintKind::Tolerance => ConstraintValue::Tolerance {
                value: carried,
                tolerance: String::new(),
            },
            ConstraintKind::Range => ConstraintValue::range("", ""),
            ConstraintKind::Contains => ConstraintValue::contains(""),
        };
    }

    /// Set one sub-field from raw user input.
    ///
    /// Returns `false` and leaves the value untouched when the active variant
    /// has no such sub-field.
    pub fn set_field(&mut self, field: SubField, raw: impl Into<String>) -> bool {
        match self.slot_mut(field) {
            Some(slot) => {
                *slot = raw.into();
                true
            }
            None => false,
        }
    }

    /// Read one sub-field, if the active variant has it.
    pub fn get(&self, field: SubField) -> Option<&str> {
        match (self, field) {
            (ConstraintValue::Exact { value }, SubField::Value)
            | (ConstraintValue::Tolerance { value, .. }, SubField::Value) => Some(value.as_str()),
            (ConstraintValue::Tolerance { tolerance, .. }, SubField::Tolerance) => {
                Some(tolerance.as_str())
            }
            (ConstraintValue::Range { min, .. }, SubField::Min) => Some(min.as_str()),
            (ConstraintValue::Range { max, .. }, SubField::Max) => Some(max.as_str()),
            (ConstraintValue::Contains { substring }, SubField::Substring) => {
                Some(substring.as_str())
            }
            _ => None,
        }
    }

    fn slot_mut(&mut self, field: SubField) -> Option<&mut String> {
        match (self, field) {
            (ConstraintValue::Exact { value }, SubField::Value)
            | (ConstraintValue::Tolerance { value, .. }, SubField::Value) => Some(value),
            (ConstraintValue::Tolerance { tolerance, .. }, SubField::Tolerance) => Some(tolerance),
            (ConstraintValue::Range { min, .. }, SubField::Min) => Some(min),
            (ConstraintValue::Range { max, .. }, SubField::Max) => Some(max),
            (ConstraintValue::Contains { substring }, SubField::Substring) => Some(substring),
            _ => None,
        }
    }

    /// True when every sub-field is empty.
    pub fn is_blank(&self) -> bool {
        self.kind()
            .sub_fields()
            .iter()
            .all(|field| self.get(*field).map_or(true, str::is_empty))
    }
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintValue::Exact { value } => write!(f, "{}", value),
            ConstraintValue::Range { min, max } => write!(f, "[{}, {}]", min, max),
            ConstraintValue::Tolerance { value, tolerance } => write!(f, "{} ± {}", value, tolerance),
            ConstraintValue::Contains { substring } => write!(f, "contains '{}'", substring),
        }
    }
}

/// Discriminator for [`ConstraintValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Exact,
    Range,
    Tolerance,
    Contains,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 4] = [
        ConstraintKind::Exact,
        ConstraintKind::Range,
        ConstraintKind::Tolerance,
        ConstraintKind::Contains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Exact => "exact",
            ConstraintKind::Range => "range",
            ConstraintKind::Tolerance => "tolerance",
            ConstraintKind::Contains => "contains",
        }
    }

    /// Sub-fields meaningful for this variant, in display order.
    pub fn sub_fields(&self) -> &'static [SubField] {
        match self {
            ConstraintKind::Exact => &[SubField::Value],
            ConstraintKind::Range => &[SubField::Min, SubField::Max],
            ConstraintKind::Tolerance => &[SubField::Value, SubField::Tolerance],
            ConstraintKind::Contains => &[SubField::Substring],
        }
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConstraintKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" | "value" => Ok(ConstraintKind::Exact),
            "range" => Ok(ConstraintKind::Range),
            "tolerance" => Ok(ConstraintKind::Tolerance),
            "contains" => Ok(ConstraintKind::Contains),
            _ => Err(format!(
                "Invalid constraint kind: '{}'. Expected: exact, range, tolerance, or contains",
                s
            )),
        }
    }
}

/// Individually editable part of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubField {
    Value,
    Min,
    Max,
    Tolerance,
    Substring,
}

impl SubField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubField::Value => "value",
            SubField::Min => "min",
            SubField::Max => "max",
            SubField::Tolerance => "tolerance",
            SubField::Substring => "substring",
        }
    }
}

impl fmt::Display for SubField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "value" => Ok(SubField::Value),
            "min" => Ok(SubField::Min),
            "max" => Ok(SubField::Max),
            "tolerance" => Ok(SubField::Tolerance),
            "substring" | "contains" => Ok(SubField::Substring),
            _ => Err(format!("Invalid constraint sub-field: '{}'", s)),
        }
    }
}
