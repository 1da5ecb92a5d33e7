//! # Download Events
//!
//! Everything the download step has to tell a human travels through an [EventChannel] as a
//! self-contained [event::Event]. Events are advisory: nothing in the control flow of a download
//! depends on whether anyone is listening.
//!
mod channel;
mod consumer;
pub mod event;

pub use channel::*;
pub use consumer::*;
