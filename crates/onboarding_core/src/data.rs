//! crates/onboarding_core/src/data.rs
//!
//! The onboarding data accumulator: the closed set of data fields the wizard
//! collects, the values they can hold, and the merge rules that govern how
//! extraction results are folded into a session's data.

use crate::slots::SlotSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

//=========================================================================================
// Data Fields
//=========================================================================================

/// One of the data points the onboarding conversation collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DataField {
    UserName,
    CompanyName,
    Role,
    Objective,
    #[serde(alias = "inFoodAndBeverage")]
    IndustryConfirmed,
    IdealOutput,
}

impl DataField {
    /// Every field, in the canonical order of the default slot schema.
    pub const ALL: [DataField; 6] = [
        DataField::UserName,
        DataField::CompanyName,
        DataField::Role,
        DataField::Objective,
        DataField::IndustryConfirmed,
        DataField::IdealOutput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataField::UserName => "userName",
            DataField::CompanyName => "companyName",
            DataField::Role => "role",
            DataField::Objective => "objective",
            DataField::IndustryConfirmed => "industryConfirmed",
            DataField::IdealOutput => "idealOutput",
        }
    }
}

impl fmt::Display for DataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown data field: {0}")]
pub struct UnknownFieldError(pub String);

impl FromStr for DataField {
    type Err = UnknownFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "userName" => Ok(DataField::UserName),
            "companyName" => Ok(DataField::CompanyName),
            "role" => Ok(DataField::Role),
            "objective" => Ok(DataField::Objective),
            "industryConfirmed" | "inFoodAndBeverage" => Ok(DataField::IndustryConfirmed),
            "idealOutput" => Ok(DataField::IdealOutput),
            other => Err(UnknownFieldError(other.to_string())),
        }
    }
}

//=========================================================================================
// Field Values
//=========================================================================================

/// A value extracted for a data field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Text(String),
}

impl FieldValue {
    /// Empty or whitespace-only text counts as "nothing extracted".
    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Text(text) if text.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(flag) => write!(f, "{}", flag),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// Interprets a yes/no-like string, as language models tend to answer flags in prose.
fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "yeah" | "yep" | "correct" => Some(true),
        "false" | "no" | "n" | "nope" => Some(false),
        _ => None,
    }
}

//=========================================================================================
// OnboardingData
//=========================================================================================

/// Everything collected so far in one onboarding session.
///
/// A field is `None` until something has been extracted for it. Values only
/// ever change through [`OnboardingData::merge`], which refuses to overwrite
/// with empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "inFoodAndBeverage")]
    pub industry_confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideal_output: Option<String>,
}

impl OnboardingData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: DataField) -> Option<FieldValue> {
        let text = |value: &Option<String>| value.clone().map(FieldValue::Text);
        match field {
            DataField::UserName => text(&self.user_name),
            DataField::CompanyName => text(&self.company_name),
            DataField::Role => text(&self.role),
            DataField::Objective => text(&self.objective),
            DataField::IndustryConfirmed => self.industry_confirmed.map(FieldValue::Flag),
            DataField::IdealOutput => text(&self.ideal_output),
        }
    }

    /// Stores a value, coercing it to the kind the field holds. Text that does
    /// not read as yes/no is dropped for the flag field.
    pub(crate) fn set(&mut self, field: DataField, value: FieldValue) {
        let slot = match field {
            DataField::IndustryConfirmed => {
                let flag = match value {
                    FieldValue::Flag(flag) => Some(flag),
                    FieldValue::Text(text) => parse_flag(&text),
                };
                if flag.is_some() {
                    self.industry_confirmed = flag;
                }
                return;
            }
            DataField::UserName => &mut self.user_name,
            DataField::CompanyName => &mut self.company_name,
            DataField::Role => &mut self.role,
            DataField::Objective => &mut self.objective,
            DataField::IdealOutput => &mut self.ideal_output,
        };
        *slot = Some(value.to_string());
    }

    /// Builder-style variant of `set`, mostly useful for extraction results.
    pub fn with(mut self, field: DataField, value: impl Into<FieldValue>) -> Self {
        self.set(field, value.into());
        self
    }

    pub fn is_filled(&self, field: DataField) -> bool {
        self.get(field).is_some_and(|value| !value.is_empty())
    }

    /// Folds an extraction result into this data. Only present, non-empty
    /// values in `extracted` replace what is already here.
    pub fn merge(&mut self, extracted: &OnboardingData) {
        for field in DataField::ALL {
            if let Some(value) = extracted.get(field).filter(|value| !value.is_empty()) {
                self.set(field, value);
            }
        }
    }

    /// The fields still to be collected, in slot schema order.
    pub fn missing_fields(&self, schema: &SlotSchema) -> Vec<DataField> {
        schema
            .slots()
            .iter()
            .map(|slot| slot.data_field)
            .filter(|field| !self.is_filled(*field))
            .collect()
    }

    pub fn filled_count(&self) -> usize {
        DataField::ALL
            .iter()
            .filter(|field| self.is_filled(**field))
            .count()
    }

    /// Slot index of the first field that has not been collected yet.
    pub fn first_missing_step(&self, schema: &SlotSchema) -> Option<usize> {
        schema
            .slots()
            .iter()
            .position(|slot| !self.is_filled(slot.data_field))
    }

    pub fn is_empty(&self) -> bool {
        self.filled_count() == 0
    }

    /// Reads the `extractedData` object of an AI reply.
    ///
    /// Nulls, empty strings, the literal string "null" and unknown keys are
    /// ignored; anything that is not an object yields empty data.
    pub fn from_ai_json(value: &Value) -> Self {
        let mut data = Self::new();
        let Some(object) = value.as_object() else {
            return data;
        };

        for (key, raw) in object {
            let Ok(field) = key.parse::<DataField>() else {
                debug!("Ignoring unknown extracted field '{}'", key);
                continue;
            };
            let value = match raw {
                Value::Bool(flag) => FieldValue::Flag(*flag),
                Value::String(text)
                    if !text.trim().is_empty() && !text.trim().eq_ignore_ascii_case("null") =>
                {
                    FieldValue::Text(text.trim().to_string())
                }
                Value::Number(number) => FieldValue::Text(number.to_string()),
                _ => continue,
            };
            data.set(field, value);
        }

        data
    }
}

impl From<bool> for FieldValue {
    fn from(flag: bool) -> Self {
        FieldValue::Flag(flag)
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}
