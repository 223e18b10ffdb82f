//! Agent context domain - JSON payloads tagged by memory type

mod entity;
mod repository;

pub use entity::{AgentContext, ContextFilter, MemoryType, NewAgentContext};
pub use repository::ContextRepository;

#[cfg(test)]
pub use repository::MockContextRepository;
