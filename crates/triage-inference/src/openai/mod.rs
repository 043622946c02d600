//! OpenAI-compatible chat backend.
//!
//! Works with any endpoint exposing `/chat/completions`: OpenAI, Azure OpenAI,
//! OpenRouter, Ollama in compatibility mode, vLLM, LM Studio.
//!
//! # Example
//!
//! ```rust,no_run
//! use triage_core::{ChatBackend, ChatRequest};
//! use triage_inference::openai::OpenAIChatBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = OpenAIChatBackend::from_env().unwrap();
//!     let request = ChatRequest {
//!         system: None,
//!         prompt: "Say hello".to_string(),
//!         model: backend.model_name().to_string(),
//!         temperature: 0.3,
//!         max_tokens: 50,
//!     };
//!     let completion = backend.complete(&request).await.unwrap();
//!     println!("{}", completion.text);
//! }
//! ```

mod backend;
mod error;
mod types;

pub use backend::{OpenAIChatBackend, OpenAIConfig};
pub use error::{to_triage_error, OpenAIErrorCode};
pub use types::*;
