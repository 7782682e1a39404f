//! Chat session orchestrator
//!
//! Drives one conversation: resolves identity, allocates the session
//! thread id on the first turn, forwards input to the agent and applies
//! the streamed chunks to the transcript. Turns are strictly sequential;
//! `submit` takes `&mut self`, so a new turn cannot start while a prior
//! turn's stream is open.

use futures_util::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::{Agent, AgentChunk, Message};
use crate::auth::{AuthStore, Profile};
use crate::error::Error;
use crate::memory::MemoryClient;
use crate::Result;

use super::transcript::{ChatMessage, Role, Transcript};

/// Per-session chat state: correlation key plus the ordered transcript.
#[derive(Debug, Default)]
pub struct Session {
    pub thread_id: Option<Uuid>,
    pub transcript: Transcript,
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    SessionActive,
}

/// The orchestrator owns the session, the auth store and the agent for
/// the lifetime of one conversation.
pub struct ChatOrchestrator<A: Agent> {
    agent: A,
    store: AuthStore,
    memory: Option<MemoryClient>,
    session: Session,
}

impl<A: Agent> ChatOrchestrator<A> {
    pub fn new(agent: A, store: AuthStore, memory: Option<MemoryClient>) -> Self {
        Self {
            agent,
            store,
            memory,
            session: Session::default(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&mut self) -> SessionState {
        if self.store.resolve().is_none() {
            SessionState::Unauthenticated
        } else if self.session.thread_id.is_none() {
            SessionState::Authenticated
        } else {
            SessionState::SessionActive
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.session.transcript
    }

    pub fn thread_id(&self) -> Option<Uuid> {
        self.session.thread_id
    }

    /// Resolve the signed-in profile, syncing it to the memory service.
    ///
    /// Call once before the first turn. Memory-service failures are
    /// non-fatal; only continuity across sessions is lost.
    pub async fn prepare(&mut self) -> Option<Profile> {
        let profile = self.store.resolve()?;

        if let Some(memory) = &self.memory {
            if let Err(e) = memory.ensure_user(&profile).await {
                warn!("Memory service user sync failed: {e}");
            }
        }

        Some(profile)
    }

    /// Run one turn: append the human message, stream the agent's reply
    /// into the trailing assistant message, invoking `render` with the
    /// accumulated text after every chunk.
    pub async fn submit(&mut self, input: &str, mut render: impl FnMut(&str)) -> Result<()> {
        let profile = self
            .store
            .resolve()
            .ok_or_else(|| Error::Auth("Not signed in".to_string()))?;

        let thread_id = self.thread_id_for_turn(&profile).await;

        // History excludes the message being submitted.
        let history = llm_history(&self.session.transcript);

        // The user sees their own input before any network activity.
        self.session.transcript.push(ChatMessage::human(input));

        let mut reply = String::new();
        let mut reply_started = false;

        let mut stream = self.agent.stream(&history, input, thread_id);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(AgentChunk::Text(text)) => {
                    reply.push_str(&text);
                    if !reply_started {
                        // All later text chunks mutate this same message.
                        self.session.transcript.push(ChatMessage::ai(""));
                        reply_started = true;
                    }
                    self.session.transcript.update_tail(&reply);
                    render(&reply);
                }
                Ok(other) => {
                    warn!(kind = other.kind(), "Skipping non-text chunk");
                }
                Err(e) => {
                    // A failed turn must not leave a phantom reply.
                    if reply_started {
                        self.session.transcript.pop();
                    }
                    return Err(e);
                }
            }
        }

        // A turn with no text chunks still closes with one (empty) reply.
        if !reply_started {
            self.session.transcript.push(ChatMessage::ai(""));
        }

        Ok(())
    }

    /// Reset to the unauthenticated state: forget the login, the
    /// transcript and the thread id. Idempotent.
    pub fn logout(&mut self) {
        self.store.clear();
        self.session = Session::default();
        info!("Logged out, session cleared");
    }

    /// The stable correlation key for this session, allocated on the
    /// first turn and registered with the memory service.
    async fn thread_id_for_turn(&mut self, profile: &Profile) -> Uuid {
        if let Some(id) = self.session.thread_id {
            return id;
        }

        let id = Uuid::new_v4();
        self.session.thread_id = Some(id);
        info!(%id, "Allocated session thread");

        if let Some(memory) = &self.memory {
            if let Err(e) = memory.register_session(&id, &profile.email).await {
                warn!("Failed to register session with memory service: {e}");
            }
        }

        id
    }
}

/// Project the transcript into LLM-layer history.
fn llm_history(transcript: &Transcript) -> Vec<Message> {
    transcript
        .iter()
        .map(|m| match m.role {
            Role::Human => Message::user(&m.content),
            Role::Ai => Message::assistant(&m.content),
        })
        .collect()
}
