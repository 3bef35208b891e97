//! Registration Assist: conversational name/email registration.

pub mod config;
pub mod error;
pub mod llm;
pub mod registration;
pub mod repl;
pub mod server;
pub mod session;
