pub mod completions;

pub use completions::CompletionsCommand;
