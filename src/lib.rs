#![deny(missing_docs)]
//! Chat Relay Bot
//!
//! A Telegram bot that forwards free text to an OpenAI-compatible chat completion
//! endpoint and `/generate <prompt>` requests to an image generation endpoint.

/// Telegram-facing routing, handlers and reply transport
pub mod bot;
/// Configuration management
pub mod config;
/// Completion and image generation clients
pub mod llm;
/// Log redaction for secrets
pub mod redact;
/// Telegram runtime entrypoint
pub mod runner;
