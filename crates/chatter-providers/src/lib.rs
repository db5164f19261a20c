//! # chatter-providers
//!
//! Model backend implementations for Chatter.

pub mod openai;
