//! LLM integration crate for the cardiac knowledge assistant.
//!
//! This crate provides a provider-agnostic abstraction for text generation.
//! The knowledge engine only sees the [`LlmClient`] trait, so tests can swap
//! in scripted clients and deployments can point at any OpenAI-compatible
//! endpoint.
//!
//! # Example
//! ```no_run
//! use cardio_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...")?;
//! let request = LlmRequest::new("Qu'est-ce que l'angine de poitrine ?", "gpt-3.5-turbo");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::OpenAiClient;
