//! Prompt system for the cardiac knowledge assistant.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in defaults compiled into the binary
//! - Workspace overrides under `.cardio/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{builtin_prompt, list_prompts, load_prompt, BUILTIN_PROMPT_IDS};
pub use types::{BuiltPrompt, PromptDefinition};

/// Grounded question-answering prompt.
pub const MEDICAL_QA: &str = "medical.qa";

/// Shortened prompt used for the single retry after a generation failure.
pub const MEDICAL_QA_SIMPLIFIED: &str = "medical.qa.simplified";
