//! HTTP route modules.

pub mod game;
pub mod health;
pub mod system;
