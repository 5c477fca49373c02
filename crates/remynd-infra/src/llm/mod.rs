//! LLM-backed capability implementations.
//!
//! Contains the concrete [`Extractor`](remynd_core::extract::Extractor) and
//! [`MessageRenderer`](remynd_core::render::MessageRenderer) implementations
//! built on a minimal OpenAI-compatible chat-completions client. The
//! scheduling and recurrence core never sees any of this -- a backend outage
//! degrades extraction into an apology reply and rendering into the
//! deterministic template.

pub mod client;
pub mod extractor;
pub mod renderer;

pub use client::ChatClient;
pub use extractor::LlmExtractor;
pub use renderer::LlmRenderer;
