//! Real-time chat delivery server.
//!
//! Tracks which live connections are joined to which chat rooms, persists
//! messages through a storage collaborator and fans each one out to the
//! members of its room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
