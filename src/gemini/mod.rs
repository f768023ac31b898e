//! Gemini `generateContent` client: grounded search and schema-constrained JSON generation.

pub mod client;
mod grounding;
pub mod types;

pub use client::{GeminiClient, GeminiError, GenerativeClient};
