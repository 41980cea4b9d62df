//! Field dictionary: the single authoritative mapping between the localized
//! form identifiers, the technical feature names the classifier was fit on,
//! and the storage column names.
//!
//! Every pipeline stage goes through this module. Lookups are pure and
//! never fail: unknown keys resolve to `None` (or to themselves for storage
//! columns) so raw input can carry forward-compatible extra fields.

use serde::{Deserialize, Serialize};

/// Prefix of the one-hot columns produced from the age category.
pub const AGE_CATEGORY_PREFIX: &str = "AgeCategory_";

/// Form step a field is collected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStep {
    /// Physical measurements and demographics.
    General,
    /// Smoking, alcohol and diet.
    Habits,
    /// Medical history.
    Medical,
}

impl std::fmt::Display for FormStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Habits => write!(f, "habits"),
            Self::Medical => write!(f, "medical"),
        }
    }
}

/// How a field's raw value is interpreted by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Continuous measurement with an inclusive plausible range.
    Measurement { min: f64, max: f64 },
    /// Integer code drawn from a closed set.
    Code(&'static [i64]),
    /// Portion count whose unit is declared by the form variant.
    Consumption,
    /// Alcohol frequency, encoded per the form variant.
    Alcohol,
    /// Integer age or bracket label.
    AgeCategory,
}

const BINARY: &[i64] = &[0, 1];
const FIVE_LEVELS: &[i64] = &[0, 1, 2, 3, 4];
const DIABETES_STAGES: &[i64] = &[0, 1, 2, 3];

/// Input fields known to the classifier pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Height,
    Weight,
    Bmi,
    Alcohol,
    Fruit,
    Vegetables,
    FriedPotato,
    GeneralHealth,
    Checkup,
    Exercise,
    SkinCancer,
    OtherCancer,
    Depression,
    Diabetes,
    Arthritis,
    Sex,
    SmokingHistory,
    AgeCategory,
}

impl Field {
    /// All input fields, in form order.
    pub const ALL: [Field; 18] = [
        Field::Height,
        Field::Weight,
        Field::Bmi,
        Field::Alcohol,
        Field::Fruit,
        Field::Vegetables,
        Field::FriedPotato,
        Field::GeneralHealth,
        Field::Checkup,
        Field::Exercise,
        Field::SkinCancer,
        Field::OtherCancer,
        Field::Depression,
        Field::Diabetes,
        Field::Arthritis,
        Field::Sex,
        Field::SmokingHistory,
        Field::AgeCategory,
    ];

    /// Primary localized identifier used by the form.
    #[must_use]
    pub fn localized(self) -> &'static str {
        match self {
            Self::Height => "altura",
            Self::Weight => "peso",
            Self::Bmi => "imc",
            Self::Alcohol => "consumo_alcohol",
            Self::Fruit => "consumo_fruta",
            Self::Vegetables => "consumo_vegetales",
            Self::FriedPotato => "consumo_papas",
            Self::GeneralHealth => "salud_general",
            Self::Checkup => "chequeo_medico",
            Self::Exercise => "ejercicio",
            Self::SkinCancer => "cancer_piel",
            Self::OtherCancer => "otro_cancer",
            Self::Depression => "depresion",
            Self::Diabetes => "diabetes",
            Self::Arthritis => "artritis",
            Self::Sex => "sexo",
            Self::SmokingHistory => "historial_tabaquismo",
            Self::AgeCategory => "edad",
        }
    }

    /// Additional localized identifiers accepted for the same field.
    #[must_use]
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::AgeCategory => &["rango_edad"],
            _ => &[],
        }
    }

    /// Canonical feature name the classifier was trained on.
    #[must_use]
    pub fn technical(self) -> &'static str {
        match self {
            Self::Height => "Height_(cm)",
            Self::Weight => "Weight_(kg)",
            Self::Bmi => "BMI",
            Self::Alcohol => "Alcohol_Consumption",
            Self::Fruit => "Fruit_Consumption",
            Self::Vegetables => "Green_Vegetables_Consumption",
            Self::FriedPotato => "FriedPotato_Consumption",
            Self::GeneralHealth => "General_Health",
            Self::Checkup => "Checkup",
            Self::Exercise => "Exercise",
            Self::SkinCancer => "Skin_Cancer",
            Self::OtherCancer => "Other_Cancer",
            Self::Depression => "Depression",
            Self::Diabetes => "Diabetes",
            Self::Arthritis => "Arthritis",
            Self::Sex => "Sex",
            Self::SmokingHistory => "Smoking_History",
            Self::AgeCategory => "AgeCategory",
        }
    }

    /// Storage column name.
    #[must_use]
    pub fn storage_column(self) -> &'static str {
        match self {
            Self::Height => "height",
            Self::Weight => "weight",
            Self::Bmi => "bmi",
            Self::Alcohol => "alcohol_consumption",
            Self::Fruit => "fruit_consumption",
            Self::Vegetables => "green_vegetables_consumption",
            Self::FriedPotato => "fried_potato_consumption",
            Self::GeneralHealth => "general_health",
            Self::Checkup => "checkup",
            Self::Exercise => "exercise",
            Self::SkinCancer => "skin_cancer",
            Self::OtherCancer => "other_cancer",
            Self::Depression => "depression",
            Self::Diabetes => "diabetes",
            Self::Arthritis => "arthritis",
            Self::Sex => "sex",
            Self::SmokingHistory => "smoking_history",
            Self::AgeCategory => "age_category",
        }
    }

    #[must_use]
    pub fn form_step(self) -> FormStep {
        match self {
            Self::Height | Self::Weight | Self::Bmi | Self::Sex | Self::AgeCategory => {
                FormStep::General
            }
            Self::SmokingHistory
            | Self::Alcohol
            | Self::Fruit
            | Self::Vegetables
            | Self::FriedPotato => FormStep::Habits,
            _ => FormStep::Medical,
        }
    }

    #[must_use]
    pub fn kind(self) -> FieldKind {
        match self {
            Self::Height => FieldKind::Measurement { min: 50.0, max: 250.0 },
            Self::Weight => FieldKind::Measurement { min: 20.0, max: 350.0 },
            Self::Bmi => FieldKind::Measurement { min: 10.0, max: 100.0 },
            Self::Alcohol => FieldKind::Alcohol,
            Self::Fruit | Self::Vegetables | Self::FriedPotato => FieldKind::Consumption,
            Self::GeneralHealth | Self::Checkup => FieldKind::Code(FIVE_LEVELS),
            Self::Diabetes => FieldKind::Code(DIABETES_STAGES),
            Self::Exercise
            | Self::SkinCancer
            | Self::OtherCancer
            | Self::Depression
            | Self::Arthritis
            | Self::Sex
            | Self::SmokingHistory => FieldKind::Code(BINARY),
            Self::AgeCategory => FieldKind::AgeCategory,
        }
    }

    /// Resolve a localized identifier (primary name or alias).
    #[must_use]
    pub fn from_localized(key: &str) -> Option<Field> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.localized() == key || f.aliases().contains(&key))
    }

    /// Resolve a technical feature name.
    #[must_use]
    pub fn from_technical(name: &str) -> Option<Field> {
        Self::ALL.iter().copied().find(|f| f.technical() == name)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.localized())
    }
}

/// Outcome entries: (localized, technical, storage).
pub const OUTCOME_ENTRIES: [(&str, &str, &str); 3] = [
    ("resultado", "prediction_result", "prediction_result"),
    ("probabilidad", "probability", "probability"),
    ("probabilidad_mostrada", "display_probability", "display_probability"),
];

/// Map a localized key to its technical name.
///
/// Returns `None` for keys the dictionary does not know.
#[must_use]
pub fn to_canonical(localized: &str) -> Option<&'static str> {
    if let Some(field) = Field::from_localized(localized) {
        return Some(field.technical());
    }
    OUTCOME_ENTRIES
        .iter()
        .find(|(l, _, _)| *l == localized)
        .map(|(_, t, _)| *t)
}

/// Map a technical name to its storage column, or return it unchanged.
#[must_use]
pub fn to_storage_column(technical: &str) -> &str {
    if let Some(field) = Field::from_technical(technical) {
        return field.storage_column();
    }
    OUTCOME_ENTRIES
        .iter()
        .find(|(_, t, _)| *t == technical)
        .map_or(technical, |(_, _, s)| *s)
}

/// Every storage column the dictionary can produce, inputs first.
#[must_use]
pub fn storage_columns() -> Vec<&'static str> {
    Field::ALL
        .iter()
        .map(|f| f.storage_column())
        .chain(OUTCOME_ENTRIES.iter().map(|(_, _, s)| *s))
        .collect()
}
