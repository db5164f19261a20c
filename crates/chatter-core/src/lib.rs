//! # chatter-core
//!
//! Core types, traits, configuration, and error handling for the Chatter relay.

pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod message;
pub mod traits;
