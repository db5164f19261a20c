//! # chatter-channels
//!
//! Telegram integration and platform-safe message formatting for Chatter.

pub mod format;
pub mod telegram;
