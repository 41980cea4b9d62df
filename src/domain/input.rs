//! Raw and normalized form input.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::age::AgeBracket;
use super::fields::Field;

/// Raw form submission keyed by localized field names.
///
/// Values are free-form JSON; fields belonging to later form steps may be
/// absent or `null`. Unknown keys are tolerated and dropped downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInput {
    fields: Map<String, Value>,
}

impl RawInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object.
    ///
    /// # Errors
    /// Returns error if the text is not a JSON object.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Unit a consumption count was entered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionUnit {
    PerDay,
    PerWeek,
}

/// How the alcohol field is encoded by a form variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlcoholEncoding {
    /// Frequency codes already expressed as occurrences per week.
    WeeklyFrequency,
    /// 0 = no, 1 = yes (occasional, once a week).
    YesNo,
    /// Occurrences per day.
    PerDay,
}

impl AlcoholEncoding {
    /// Codes accepted by [`AlcoholEncoding::WeeklyFrequency`]: none,
    /// occasional (1/week), then 1, 2, 3 and 4-5 times a day.
    pub const WEEKLY_FREQUENCY_CODES: [i64; 6] = [0, 1, 7, 14, 21, 30];
}

/// Contract of the form that produced a raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormVariant {
    pub alcohol: AlcoholEncoding,
    pub fruit: ConsumptionUnit,
    pub vegetables: ConsumptionUnit,
    pub fried_potato: ConsumptionUnit,
}

impl FormVariant {
    /// Multi-step form: fruit and vegetables per day, fried potato per week.
    #[must_use]
    pub const fn multi_step() -> Self {
        Self {
            alcohol: AlcoholEncoding::WeeklyFrequency,
            fruit: ConsumptionUnit::PerDay,
            vegetables: ConsumptionUnit::PerDay,
            fried_potato: ConsumptionUnit::PerWeek,
        }
    }

    /// API form: every count already per week.
    #[must_use]
    pub const fn weekly() -> Self {
        Self {
            alcohol: AlcoholEncoding::WeeklyFrequency,
            fruit: ConsumptionUnit::PerWeek,
            vegetables: ConsumptionUnit::PerWeek,
            fried_potato: ConsumptionUnit::PerWeek,
        }
    }

    /// Simplified form: yes/no alcohol, counts per week.
    #[must_use]
    pub const fn simplified() -> Self {
        Self {
            alcohol: AlcoholEncoding::YesNo,
            fruit: ConsumptionUnit::PerWeek,
            vegetables: ConsumptionUnit::PerWeek,
            fried_potato: ConsumptionUnit::PerWeek,
        }
    }

    /// Declared unit of a consumption field, `None` for other fields.
    #[must_use]
    pub fn consumption_unit(&self, field: Field) -> Option<ConsumptionUnit> {
        match field {
            Field::Fruit => Some(self.fruit),
            Field::Vegetables => Some(self.vegetables),
            Field::FriedPotato => Some(self.fried_potato),
            _ => None,
        }
    }

    /// Fields that must be present before a prediction can be built.
    #[must_use]
    pub fn required_fields(&self) -> &'static [Field] {
        &Field::ALL
    }
}

impl Default for FormVariant {
    fn default() -> Self {
        Self::multi_step()
    }
}

impl FromStr for FormVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multi-step" | "multi_step" | "multistep" => Ok(Self::multi_step()),
            "weekly" => Ok(Self::weekly()),
            "simplified" => Ok(Self::simplified()),
            other => Err(format!(
                "unknown form variant '{other}' (expected multi-step, weekly or simplified)"
            )),
        }
    }
}

/// A value after unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Number(f64),
    Bracket(AgeBracket),
}

impl NormalizedValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Bracket(_) => None,
        }
    }
}

/// Input whose values are expressed in the units the classifier expects.
///
/// Entries keep the order they were produced in. A field may appear more
/// than once only when the raw input used an alias; the builder decides
/// whether the duplicates agree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedInput {
    variant: FormVariant,
    entries: Vec<(Field, NormalizedValue)>,
}

impl NormalizedInput {
    #[must_use]
    pub fn new(variant: FormVariant) -> Self {
        Self {
            variant,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, field: Field, value: NormalizedValue) {
        self.entries.push((field, value));
    }

    #[must_use]
    pub fn variant(&self) -> FormVariant {
        self.variant
    }

    #[must_use]
    pub fn entries(&self) -> &[(Field, NormalizedValue)] {
        &self.entries
    }

    #[must_use]
    pub fn contains(&self, field: Field) -> bool {
        self.entries.iter().any(|(f, _)| *f == field)
    }

    /// First value recorded for `field`.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<NormalizedValue> {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| *v)
    }

    /// Numeric value recorded for `field`.
    #[must_use]
    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(|v| v.as_number())
    }

    /// Required fields that are absent, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<Field> {
        self.variant
            .required_fields()
            .iter()
            .copied()
            .filter(|f| !self.contains(*f))
            .collect()
    }
}
