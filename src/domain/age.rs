//! Age brackets used as a categorical predictor.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::fields::AGE_CATEGORY_PREFIX;

/// One of the fixed, non-overlapping age ranges the classifier knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeBracket {
    #[serde(rename = "18-24")]
    From18To24,
    #[serde(rename = "25-29")]
    From25To29,
    #[serde(rename = "30-34")]
    From30To34,
    #[serde(rename = "35-39")]
    From35To39,
    #[serde(rename = "40-44")]
    From40To44,
    #[serde(rename = "45-49")]
    From45To49,
    #[serde(rename = "50-54")]
    From50To54,
    #[serde(rename = "55-59")]
    From55To59,
    #[serde(rename = "60-64")]
    From60To64,
    #[serde(rename = "65-69")]
    From65To69,
    #[serde(rename = "70-74")]
    From70To74,
    #[serde(rename = "75-79")]
    From75To79,
    #[serde(rename = "80+")]
    From80,
}

impl AgeBracket {
    /// All brackets in ascending order.
    pub const ALL: [AgeBracket; 13] = [
        AgeBracket::From18To24,
        AgeBracket::From25To29,
        AgeBracket::From30To34,
        AgeBracket::From35To39,
        AgeBracket::From40To44,
        AgeBracket::From45To49,
        AgeBracket::From50To54,
        AgeBracket::From55To59,
        AgeBracket::From60To64,
        AgeBracket::From65To69,
        AgeBracket::From70To74,
        AgeBracket::From75To79,
        AgeBracket::From80,
    ];

    /// Map an integer age to its bracket.
    ///
    /// Total over `i64`: ages below 18 clamp into `18-24`, 80 and above
    /// land in `80+`. Every other bracket spans five years starting at 25.
    #[must_use]
    pub fn from_age(age: i64) -> Self {
        if age < 25 {
            return Self::From18To24;
        }
        if age >= 80 {
            return Self::From80;
        }
        // 25..=79 -> indices 1..=11
        let index = ((age - 25) / 5 + 1) as usize;
        Self::ALL[index]
    }

    /// Display label, e.g. `"40-44"`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::From18To24 => "18-24",
            Self::From25To29 => "25-29",
            Self::From30To34 => "30-34",
            Self::From35To39 => "35-39",
            Self::From40To44 => "40-44",
            Self::From45To49 => "45-49",
            Self::From50To54 => "50-54",
            Self::From55To59 => "55-59",
            Self::From60To64 => "60-64",
            Self::From65To69 => "65-69",
            Self::From70To74 => "70-74",
            Self::From75To79 => "75-79",
            Self::From80 => "80+",
        }
    }

    /// One-hot column name, e.g. `"AgeCategory_40-44"`.
    #[must_use]
    pub fn column_name(self) -> String {
        format!("{AGE_CATEGORY_PREFIX}{}", self.label())
    }
}

impl std::fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for labels outside the known bracket set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown age bracket '{0}'")]
pub struct UnknownAgeBracket(pub String);

impl FromStr for AgeBracket {
    type Err = UnknownAgeBracket;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.label() == trimmed)
            .ok_or_else(|| UnknownAgeBracket(trimmed.to_string()))
    }
}
