//! LLM integration crate for MedAssist.
//!
//! This crate provides a provider-agnostic abstraction over completion
//! services behind the [`LlmClient`] trait.
//!
//! # Providers
//! - **Groq**: hosted OpenAI-compatible chat completions (default)
//! - **Ollama**: local LLM runtime
//!
//! # Example
//! ```no_run
//! use medassist_llm::{LlmClient, LlmRequest, providers::GroqClient};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GroqClient::new("gsk-...", Duration::from_secs(60))?;
//! let request = LlmRequest::new("What is a migraine?", "llama-3.1-8b-instant");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GroqClient, OllamaClient};
pub use types::ProviderType;
