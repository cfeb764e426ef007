//! Command handlers for the cardio CLI.

pub mod ask;
pub mod index;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use index::IndexCommand;
pub use prompts::PromptsCommand;
