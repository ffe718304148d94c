//! clbprep-core — Assessment schemas, prompts and flow orchestration.
//!
//! This crate defines the request and result types for the four language
//! skills, validates submissions, renders prompts and turns a generation
//! service's reply into a checked, typed assessment.

pub mod assessor;
pub mod error;
pub mod fixtures;
pub mod flow;
pub mod model;
pub mod prompt;
pub mod schema;
pub mod traits;
pub mod validate;

pub use assessor::{Assessor, AssessorConfig, NoOfflineFixture};
pub use error::{AssessmentError, ProviderError, ValidationErrors};
pub use model::{Assessment, Score, Skill};
pub use validate::{FromRaw, Validate};
