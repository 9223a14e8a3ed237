//! Normalizes heterogeneous chat datasets (OpenAI `messages`, ShareGPT
//! `conversations`) into a single target schema.

pub mod content;
pub mod driver;
pub mod error;
pub mod inspect;
pub mod normalize;
pub mod roles;
pub mod samples;

pub use driver::{convert_file, convert_records, ConversionReport, ConvertJob, SkippedRecord};
pub use error::{ConvertError, Result};
pub use inspect::{inspect_file, inspect_records, DatasetSummary};
pub use normalize::{normalize_record, ConvertOptions, Outcome, SkipReason};
pub use roles::RoleMap;
