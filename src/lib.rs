//! Bengkel Auth - authentication and presence server for a vehicle repair shop
//!
//! Account registration, single-session login with JWT access/refresh tokens,
//! and a WebSocket "online users" presence feed, served over axum.

pub mod app;
pub mod core;
