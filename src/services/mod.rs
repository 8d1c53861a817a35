pub mod cast;
pub mod chain;
pub mod image;
pub mod llm;
pub mod pacing;
pub mod prompt;
pub mod render;
pub mod workflow;
pub mod writer;
