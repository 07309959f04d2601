//! Prompt construction for classification, condensation, and grounded answers

pub mod prompt;

pub use prompt::PromptBuilder;
