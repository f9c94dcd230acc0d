//! Prompt system for the CodeLogic service.
//!
//! This crate provides:
//! - Built-in prompts for conversational retrieval QA
//! - YAML prompt overrides loaded from the workspace
//! - Handlebars template rendering

pub mod builder;
pub mod builtin;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, render_template};
pub use builtin::{builtin, ANSWER_PROMPT_ID, CONDENSE_PROMPT_ID};
pub use loader::{list_prompts, load_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
