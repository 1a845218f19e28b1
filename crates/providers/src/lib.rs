//! Completion provider implementations for Huddle.
//!
//! All providers implement the `huddle_core::CompletionProvider` trait.
//! The router selects the correct provider based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, default_from_config};
