//! Feature vector builder.
//!
//! Assembles the exact numeric row the classifier expects: canonical names,
//! one-hot age brackets, zero-filled missing columns, schema order.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::age::AgeBracket;
use super::fields::{Field, AGE_CATEGORY_PREFIX};
use super::input::{NormalizedInput, NormalizedValue};
use crate::{HeartwiseError, Result};

/// Ordered list of columns the classifier was fit on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    expected_columns: Vec<String>,
}

impl ModelSchema {
    /// Create a schema, rejecting empty or duplicated column lists.
    ///
    /// # Errors
    /// Returns `HeartwiseError::InvariantViolation` for an unusable list.
    pub fn new(expected_columns: Vec<String>) -> Result<Self> {
        if expected_columns.is_empty() {
            return Err(HeartwiseError::InvariantViolation(
                "model schema has no columns".into(),
            ));
        }
        let mut seen = HashSet::with_capacity(expected_columns.len());
        for column in &expected_columns {
            if !seen.insert(column.as_str()) {
                return Err(HeartwiseError::InvariantViolation(format!(
                    "model schema lists column '{column}' twice"
                )));
            }
        }
        Ok(Self { expected_columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.expected_columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.expected_columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expected_columns.is_empty()
    }
}

/// A complete row in the classifier's column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Builds [`FeatureVector`]s for one model schema.
#[derive(Debug, Clone)]
pub struct FeatureVectorBuilder {
    schema: ModelSchema,
}

impl FeatureVectorBuilder {
    #[must_use]
    pub fn new(schema: ModelSchema) -> Self {
        Self { schema }
    }

    #[must_use]
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Build the classifier row for `input`.
    ///
    /// # Errors
    /// - `IncompleteInput` when a field required by the form variant is absent
    /// - `InvariantViolation` when the input carries conflicting values
    ///   (two different age brackets, or two values for the same field)
    pub fn build(&self, input: &NormalizedInput) -> Result<FeatureVector> {
        check_complete(input)?;

        // Steps 1 and 2: canonical names, with the age bracket expanded.
        let mut row: BTreeMap<String, f64> = BTreeMap::new();
        let mut brackets: BTreeSet<AgeBracket> = BTreeSet::new();
        for (field, value) in input.entries() {
            match value {
                NormalizedValue::Bracket(bracket) => {
                    brackets.insert(*bracket);
                }
                NormalizedValue::Number(v) => insert_unique(&mut row, *field, *v)?,
            }
        }
        expand_age_brackets(&mut row, &brackets)?;

        // Steps 3 and 4: zero-fill and reorder, dropping extras.
        let mut filled = Vec::new();
        let values: Vec<f64> = self
            .schema
            .columns()
            .iter()
            .map(|column| {
                row.get(column).copied().unwrap_or_else(|| {
                    filled.push(column.as_str());
                    0.0
                })
            })
            .collect();

        if !filled.is_empty() {
            tracing::debug!(columns = ?filled, "Zero-filled schema columns absent from input");
        }
        let extras = row
            .keys()
            .filter(|k| !self.schema.columns().contains(*k))
            .count();
        if extras > 0 {
            tracing::debug!(extras, "Dropped assembled columns outside the model schema");
        }

        if values.len() != self.schema.len() {
            return Err(HeartwiseError::InvariantViolation(format!(
                "feature vector has {} values for {} schema columns",
                values.len(),
                self.schema.len()
            )));
        }

        Ok(FeatureVector {
            columns: self.schema.columns().to_vec(),
            values,
        })
    }
}

fn check_complete(input: &NormalizedInput) -> Result<()> {
    let missing = input.missing_fields();
    let Some(step) = missing.iter().map(|f| f.form_step()).min() else {
        return Ok(());
    };
    Err(HeartwiseError::IncompleteInput {
        step,
        missing: missing.iter().map(|f| f.localized().to_string()).collect(),
    })
}

fn insert_unique(row: &mut BTreeMap<String, f64>, field: Field, value: f64) -> Result<()> {
    let name = field.technical();
    match row.get(name) {
        Some(existing) if existing.to_bits() != value.to_bits() => {
            Err(HeartwiseError::InvariantViolation(format!(
                "conflicting values for '{name}'"
            )))
        }
        Some(_) => Ok(()),
        None => {
            row.insert(name.to_string(), value);
            Ok(())
        }
    }
}

/// One-hot expand the age category into one column per known bracket.
fn expand_age_brackets(row: &mut BTreeMap<String, f64>, brackets: &BTreeSet<AgeBracket>) -> Result<()> {
    if brackets.len() > 1 {
        let labels: Vec<_> = brackets.iter().map(|b| b.label()).collect();
        return Err(HeartwiseError::InvariantViolation(format!(
            "age category would set several brackets at once: {}",
            labels.join(", ")
        )));
    }
    let Some(selected) = brackets.iter().next().copied() else {
        return Err(HeartwiseError::InvariantViolation(
            "age category missing after completeness check".into(),
        ));
    };

    for bracket in AgeBracket::ALL {
        let hot = if bracket == selected { 1.0 } else { 0.0 };
        row.insert(bracket.column_name(), hot);
    }

    let set = row
        .iter()
        .filter(|(k, v)| k.starts_with(AGE_CATEGORY_PREFIX) && **v != 0.0)
        .count();
    if set != 1 {
        return Err(HeartwiseError::InvariantViolation(format!(
            "expected exactly one age bracket column set, found {set}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::input::FormVariant;

    fn full_schema() -> ModelSchema {
        let mut columns: Vec<String> = Field::ALL
            .iter()
            .filter(|f| **f != Field::AgeCategory)
            .map(|f| f.technical().to_string())
            .collect();
        columns.extend(AgeBracket::ALL.iter().map(|b| b.column_name()));
        ModelSchema::new(columns).expect("valid schema")
    }

    fn complete_input(bracket: AgeBracket) -> NormalizedInput {
        let mut input = NormalizedInput::new(FormVariant::multi_step());
        for (i, field) in Field::ALL.iter().enumerate() {
            let value = if *field == Field::AgeCategory {
                NormalizedValue::Bracket(bracket)
            } else {
                NormalizedValue::Number(i as f64)
            };
            input.push(*field, value);
        }
        input
    }

    #[test]
    fn test_columns_match_schema_order() {
        let schema = full_schema();
        let builder = FeatureVectorBuilder::new(schema.clone());
        let vector = builder
            .build(&complete_input(AgeBracket::From40To44))
            .expect("Should build");

        assert_eq!(vector.columns(), schema.columns());
        assert_eq!(vector.get("AgeCategory_40-44"), Some(1.0));
        let hot: Vec<_> = vector
            .iter()
            .filter(|(c, v)| c.starts_with(AGE_CATEGORY_PREFIX) && *v != 0.0)
            .collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(vector.get("Height_(cm)"), Some(0.0));
        assert_eq!(vector.get("Sex"), Some(15.0));
        assert_eq!(vector.get("AgeCategory"), None);
    }

    #[test]
    fn test_zero_fill_and_extras_dropped() {
        // Schema omits the 18-24 dummy and Height, and adds a column no input supplies.
        let schema = ModelSchema::new(vec![
            "BMI".into(),
            "Cholesterol_Check".into(),
            "AgeCategory_80+".into(),
            "AgeCategory_25-29".into(),
        ])
        .expect("valid schema");
        let builder = FeatureVectorBuilder::new(schema);
        let vector = builder
            .build(&complete_input(AgeBracket::From25To29))
            .expect("Should build");

        assert_eq!(vector.len(), 4);
        assert_eq!(vector.values(), &[2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = FeatureVectorBuilder::new(full_schema());
        let input = complete_input(AgeBracket::From75To79);
        let a = builder.build(&input).expect("Should build");
        let b = builder.build(&input).expect("Should build");
        let bits = |v: &FeatureVector| v.values().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
        assert_eq!(a.columns(), b.columns());
    }

    #[test]
    fn test_incomplete_input_rejected() {
        let mut input = NormalizedInput::new(FormVariant::multi_step());
        for field in Field::ALL {
            if field == Field::Sex || field == Field::Depression {
                continue;
            }
            let value = if field == Field::AgeCategory {
                NormalizedValue::Bracket(AgeBracket::From18To24)
            } else {
                NormalizedValue::Number(1.0)
            };
            input.push(field, value);
        }
        let err = FeatureVectorBuilder::new(full_schema())
            .build(&input)
            .unwrap_err();
        match err {
            HeartwiseError::IncompleteInput { step, missing } => {
                assert_eq!(step, crate::domain::FormStep::General);
                assert_eq!(missing, vec!["depresion".to_string(), "sexo".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_two_brackets_fail_fast() {
        let mut input = complete_input(AgeBracket::From40To44);
        input.push(Field::AgeCategory, NormalizedValue::Bracket(AgeBracket::From50To54));
        let err = FeatureVectorBuilder::new(full_schema())
            .build(&input)
            .unwrap_err();
        assert!(matches!(err, HeartwiseError::InvariantViolation(_)));

        // The same bracket reported twice is not a conflict.
        let mut input = complete_input(AgeBracket::From40To44);
        input.push(Field::AgeCategory, NormalizedValue::Bracket(AgeBracket::From40To44));
        assert!(FeatureVectorBuilder::new(full_schema()).build(&input).is_ok());
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        assert!(ModelSchema::new(vec![]).is_err());
        assert!(ModelSchema::new(vec!["BMI".into(), "BMI".into()]).is_err());
    }
}
