//! Resume Tailor Engine
//!
//! Runs dependency-ordered AI generation workflows with support for:
//! - Parallel batches of independent steps with per-step failure isolation
//! - `{placeholder}` prompt templating over named inputs and upstream results
//! - OpenAI, Anthropic, Gemini and custom generation providers
//! - Live step status reporting

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
