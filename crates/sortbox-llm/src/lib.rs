//! LLM provider abstraction for sortbox.
//!
//! The classifier makes one non-streaming chat completion per batch attempt
//! and asks for a strict JSON schema answer. This crate is that call and
//! nothing more; it has no dependencies on other sortbox crates.
//!
//! - [`Provider`] is the seam the classifier is generic over
//! - [`OpenAiCompatProvider`] posts to `{base_url}/chat/completions`
//! - [`LlmProviderConfig`] is the endpoint, key variable and timeout
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sortbox_llm::{ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider};
//!
//! let provider = OpenAiCompatProvider::new(LlmProviderConfig {
//!     name: "openai".into(),
//!     base_url: "https://api.openai.com/v1".into(),
//!     api_key_env: "OPENAI_API_KEY".into(),
//!     headers: Default::default(),
//!     timeout_secs: Some(60),
//! });
//! let request = ChatRequest::new("gpt-4o-mini", vec![
//!     ChatMessage::system("You are an email classifier."),
//!     ChatMessage::user("Thread ID: t-1 ..."),
//! ]);
//!
//! let response = provider.complete(&request).await?;
//! println!("{}", response.choices[0].message.content);
//! ```

pub mod config;
pub mod error;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use config::LlmProviderConfig;
pub use error::{ProviderError, Result};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::Provider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, Usage};
