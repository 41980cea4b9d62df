//! Unit/value normalizer.
//!
//! Converts raw form values into the unit basis the classifier was trained
//! on. The caller declares the unit of every consumption field through the
//! [`FormVariant`]; the normalizer never guesses.

use serde_json::Value;

use super::age::AgeBracket;
use super::fields::{to_canonical, Field, FieldKind};
use super::input::{AlcoholEncoding, ConsumptionUnit, FormVariant, NormalizedInput, NormalizedValue, RawInput};
use crate::{HeartwiseError, Result};

/// Days per week used for per-day to per-week conversion.
pub const DAYS_PER_WEEK: f64 = 7.0;

/// Upper bound for any consumption count once expressed per week.
pub const MAX_WEEKLY_PORTIONS: f64 = 1000.0;

/// Plausible integer age range accepted from the form.
pub const MAX_AGE_YEARS: i64 = 130;

/// Converts a [`RawInput`] into a [`NormalizedInput`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    variant: FormVariant,
}

impl Normalizer {
    #[must_use]
    pub fn new(variant: FormVariant) -> Self {
        Self { variant }
    }

    #[must_use]
    pub fn variant(&self) -> FormVariant {
        self.variant
    }

    /// Normalize every mapped, non-null field of `raw`.
    ///
    /// Absent fields stay absent; completeness is checked by the feature
    /// vector builder. BMI is derived from height and weight when the form
    /// did not send it.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Validation` naming the first offending field.
    pub fn normalize(&self, raw: &RawInput) -> Result<NormalizedInput> {
        let mut out = NormalizedInput::new(self.variant);
        let mut dropped = 0usize;

        for (key, value) in raw.iter() {
            let Some(field) = to_canonical(key).and_then(Field::from_technical) else {
                dropped += 1;
                continue;
            };
            if value.is_null() {
                continue;
            }
            let normalized = self.normalize_value(field, key, value)?;
            out.push(field, normalized);
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Ignored input keys outside the field dictionary");
        }

        if !out.contains(Field::Bmi) {
            if let (Some(height), Some(weight)) =
                (out.number(Field::Height), out.number(Field::Weight))
            {
                let bmi = derive_bmi(height, weight);
                check_range(Field::Bmi, Field::Bmi.localized(), bmi)?;
                tracing::debug!("Derived BMI from height and weight");
                out.push(Field::Bmi, NormalizedValue::Number(bmi));
            }
        }

        Ok(out)
    }

    fn normalize_value(&self, field: Field, key: &str, value: &Value) -> Result<NormalizedValue> {
        let number = match field.kind() {
            FieldKind::Measurement { .. } => {
                let v = coerce_f64(key, value)?;
                check_range(field, key, v)?;
                v
            }
            FieldKind::Code(codes) => {
                let code = coerce_integer(key, value)?;
                check_code(key, code, codes)?;
                code as f64
            }
            FieldKind::Consumption => {
                let unit = self
                    .variant
                    .consumption_unit(field)
                    .unwrap_or(ConsumptionUnit::PerWeek);
                let v = coerce_f64(key, value)?;
                to_weekly(key, v, unit)?
            }
            FieldKind::Alcohol => self.normalize_alcohol(key, value)?,
            FieldKind::AgeCategory => return age_bracket(key, value).map(NormalizedValue::Bracket),
        };
        Ok(NormalizedValue::Number(number))
    }

    fn normalize_alcohol(&self, key: &str, value: &Value) -> Result<f64> {
        match self.variant.alcohol {
            AlcoholEncoding::WeeklyFrequency => {
                let code = coerce_integer(key, value)?;
                check_code(key, code, &AlcoholEncoding::WEEKLY_FREQUENCY_CODES)?;
                Ok(code as f64)
            }
            AlcoholEncoding::YesNo => {
                let code = coerce_integer(key, value)?;
                check_code(key, code, &[0, 1])?;
                Ok(code as f64)
            }
            AlcoholEncoding::PerDay => {
                let v = coerce_f64(key, value)?;
                to_weekly(key, v, ConsumptionUnit::PerDay)
            }
        }
    }
}

/// Body-mass index rounded to two decimals.
#[must_use]
pub fn derive_bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let meters = height_cm / 100.0;
    ((weight_kg / (meters * meters)) * 100.0).round() / 100.0
}

fn to_weekly(key: &str, value: f64, unit: ConsumptionUnit) -> Result<f64> {
    if value < 0.0 {
        return Err(HeartwiseError::validation(key, format!("{value} must not be negative")));
    }
    let weekly = match unit {
        ConsumptionUnit::PerDay => value * DAYS_PER_WEEK,
        ConsumptionUnit::PerWeek => value,
    };
    if weekly > MAX_WEEKLY_PORTIONS {
        return Err(HeartwiseError::validation(
            key,
            format!("{weekly} per week exceeds {MAX_WEEKLY_PORTIONS}"),
        ));
    }
    Ok(weekly)
}

fn check_range(field: Field, key: &str, value: f64) -> Result<()> {
    if let FieldKind::Measurement { min, max } = field.kind() {
        if !(min..=max).contains(&value) {
            return Err(HeartwiseError::validation(
                key,
                format!("{value} out of range [{min}, {max}]"),
            ));
        }
    }
    Ok(())
}

fn check_code(key: &str, code: i64, codes: &[i64]) -> Result<()> {
    if codes.contains(&code) {
        return Ok(());
    }
    let allowed = codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(HeartwiseError::validation(
        key,
        format!("code {code} is not one of {allowed}"),
    ))
}

fn coerce_f64(key: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(HeartwiseError::validation(key, format!("expected a number, got {value}"))),
    }
}

fn coerce_integer(key: &str, value: &Value) -> Result<i64> {
    let v = coerce_f64(key, value)?;
    if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
        return Err(HeartwiseError::validation(key, format!("expected an integer code, got {v}")));
    }
    Ok(v as i64)
}

fn age_bracket(key: &str, value: &Value) -> Result<AgeBracket> {
    if let Value::String(s) = value {
        if let Ok(age) = s.trim().parse::<i64>() {
            return bracket_for_age(key, age);
        }
        return s
            .parse::<AgeBracket>()
            .map_err(|e| HeartwiseError::validation(key, e.to_string()));
    }
    let age = coerce_integer(key, value)?;
    bracket_for_age(key, age)
}

fn bracket_for_age(key: &str, age: i64) -> Result<AgeBracket> {
    if !(0..=MAX_AGE_YEARS).contains(&age) {
        return Err(HeartwiseError::validation(
            key,
            format!("age {age} out of range [0, {MAX_AGE_YEARS}]"),
        ));
    }
    if age < 18 {
        tracing::warn!("Age below 18 mapped into the 18-24 bracket");
    }
    Ok(AgeBracket::from_age(age))
}
