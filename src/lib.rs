//! Arena Combat Server - authoritative real-time duels between two board units
//!
//! The strategy layer asks for a combat over a signed internal endpoint, both
//! players stream their inputs over WebSocket, and the result is reported
//! back once one unit falls.

pub mod app;
pub mod combat;
pub mod config;
pub mod http;
pub mod strategy;
pub mod util;
pub mod ws;
