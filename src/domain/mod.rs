//! Domain layer: Core types and the pure pipeline stages.
//!
//! Nothing in here performs I/O. Each stage takes an immutable input and
//! returns a new value.

mod age;
mod features;
pub mod fields;
mod input;
mod normalize;
mod prediction;
mod record;

pub use age::{AgeBracket, UnknownAgeBracket};
pub use features::{FeatureVector, FeatureVectorBuilder, ModelSchema};
pub use fields::{Field, FieldKind, FormStep};
pub use input::{
    AlcoholEncoding, ConsumptionUnit, FormVariant, NormalizedInput, NormalizedValue, RawInput,
};
pub use normalize::{derive_bmi, Normalizer};
pub use prediction::{display_probability, PredictionResponse, PredictionResult, RiskLabel};
pub use record::{PersistedRecord, RecordId, StorageValue, StoredPrediction};
