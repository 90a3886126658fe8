//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate archive engine calls into use-case level APIs.
//! - Keep the CLI decoupled from storage and archive details.

pub mod archive_service;
