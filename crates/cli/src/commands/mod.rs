//! Command handlers for the CodeLogic CLI.

pub mod ask;
pub mod categories;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use categories::CategoriesCommand;
pub use serve::ServeCommand;
