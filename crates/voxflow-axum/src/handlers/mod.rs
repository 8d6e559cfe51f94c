//! HTTP handlers, one module per resource.

pub mod audio;
pub mod chat;
pub mod health;
pub mod sessions;
pub mod speech;
