//! # restorer-genai
//!
//! Sends one image plus a text instruction to a generative model and hands
//! back the reply as typed parts. The first image part is the result; the
//! first text part is what the model said about it.
//!
//! [`GeminiClient`] talks to the Gemini `generateContent` REST API.
//! [`StaticImageModel`] and [`FailingImageModel`] stand in for it in tests.

mod config;
mod error;
mod gemini;
mod mock;
mod model;
mod types;

pub use config::{GeminiConfig, API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::{GenAiError, GenAiResult};
pub use gemini::GeminiClient;
pub use mock::{FailingImageModel, StaticImageModel};
pub use model::{
    GeneratedImage, ImageModel, ImageRequest, ModelReply, ResponsePart, DEFAULT_INPUT_MIME,
    DEFAULT_OUTPUT_MIME,
};
