//! AI metadata generation with a prioritized provider chain.
//!
//! Hosted providers (OpenAI, Anthropic) are tried in priority order; any
//! failure logs and moves on, and [`local::LocalAnalyzer`] closes the chain
//! so metadata generation as a whole cannot fail. Whichever provider wins,
//! [`chain::ProviderChain`] enriches the draft with uniform derived fields
//! and provenance.

pub mod anthropic;
pub mod chain;
pub mod local;
pub mod openai;
mod prompt;
pub mod provider;

pub use anthropic::AnthropicProvider;
pub use chain::{GeneratedMetadata, ProviderChain};
pub use local::LocalAnalyzer;
pub use openai::OpenAiProvider;
pub use provider::{DraftMetadata, MetadataProvider, ProviderError};
