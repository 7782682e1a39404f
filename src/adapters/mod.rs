//! Adapters module — user-facing chat surfaces.
//!
//! The CLI is the only surface; it wires terminal input and progressive
//! output to the chat orchestrator.

pub mod cli;
