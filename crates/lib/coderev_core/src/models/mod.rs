//! Domain models shared by the session and review subsystems.

pub mod auth;
pub mod review;
