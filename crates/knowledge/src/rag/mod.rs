//! Retrieval-augmented answering: synthesis, safety and fallbacks.

pub mod fallback;
pub mod safety;
pub mod synthesizer;

pub use fallback::FallbackTable;
pub use synthesizer::{GenerationSettings, Synthesizer};
