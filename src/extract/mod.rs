// src/extract/mod.rs
//! Extraction strategies shared by the source adapters.

pub mod dom;
pub mod generative;
pub mod jsonld;
pub mod recurrence;
pub mod text;
pub mod translate;

pub use generative::{CachedExtractor, ExtractedEntry, GenerativeExtractor, OpenAiExtractor};
pub use recurrence::RecurringService;
