//! Publishing fine-tuned adapters to a Hugging Face compatible hub.

pub mod card;
pub mod client;
pub mod error;
pub mod repo;
pub mod upload;

pub use card::{usage_snippet, ModelCard, DEFAULT_BASE_MODEL, DEFAULT_LORA_RANK};
pub use client::{
    push_adapter, resolve_token, HubClient, PushOptions, PushReport, RepoStatus, UploadSummary,
    DEFAULT_ENDPOINT,
};
pub use error::{HubError, Result};
pub use repo::RepoId;
