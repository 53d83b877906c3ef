//! HTTP completion client for the hosted Gemini models.

mod client;
mod wire;

pub use client::GeminiClient;
