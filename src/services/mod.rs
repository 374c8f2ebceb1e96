// src/services/mod.rs

pub mod analytics;
pub mod auto_reply;
pub mod comments;
pub mod gemini;
pub mod hierarchy;
pub mod moderation;
pub mod queue;
pub mod store;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
