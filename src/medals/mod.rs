//! Achievement medals.
//!
//! A fixed catalog of threshold rules evaluated against aggregate stats.
//! Each medal unlocks at most once per user.

pub mod evaluator;
pub mod types;

pub use evaluator::{MedalError, MedalEvaluator};
pub use types::{
    default_medals, EarnedMedal, MedalCategory, MedalDefinition, MedalProgress, RequirementType,
    UnlockedMedal,
};
