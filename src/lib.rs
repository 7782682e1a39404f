//! Amity - heart-centered AI companion for your terminal
//!
//! This library provides a chat front end for a tool-augmented LLM agent:
//! Google OAuth login with a 30-day local auth cache, a per-session chat
//! transcript, and streaming turn orchestration.

pub mod agent;
pub mod adapters;
pub mod auth;
pub mod chat;
pub mod config;
pub mod error;
pub mod memory;
pub mod tools;
pub mod ui;

pub use error::{Error, Result};
