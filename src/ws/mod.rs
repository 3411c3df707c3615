//! WebSocket transport for combat participants

pub mod handler;
pub mod protocol;
