//! Chat module — session state and turn orchestration.
//!
//! The transcript is the ordered record of one browser-session-equivalent
//! conversation; the orchestrator drives turns through the agent and
//! applies streamed chunks to the transcript.

mod orchestrator;
mod transcript;

pub use orchestrator::{ChatOrchestrator, Session, SessionState};
pub use transcript::{ChatMessage, Role, Transcript};
