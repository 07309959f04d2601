//! Conversational question answering with per-session memory

pub mod engine;
pub mod memory;
pub mod session;

pub use engine::ConversationManager;
pub use memory::{ChatMemoryBuffer, ChatMessage, Role};
pub use session::SessionStore;
