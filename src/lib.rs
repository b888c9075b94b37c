//! Ghostypedia AI service
//!
//! LLM-backed orchestration layer for a paranormal-content encyclopedia:
//! a recommendation engine (cold-start vs. personalized prompts, response
//! parsing, diversity balancing, per-user caching) and a conversational
//! "digital twin" persona with graceful degradation when the upstream
//! generation endpoint is slow or unavailable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
