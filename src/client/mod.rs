//! Client side of meal generation: local state, the orchestrator and the chat loop.

pub mod backend;
pub mod chat;
pub mod error;
pub mod kv;
pub mod meal_store;
pub mod orchestrator;
pub mod settings_store;
pub mod subject;

#[cfg(test)]
pub(crate) mod testing;
