//! Transport layer: the WebSocket channel and its trait seams.
//!
//! The engine only ever sees [`MessageSink`] and [`MessageSource`];
//! [`channel::connect`] supplies the real WebSocket-backed pair.

pub mod channel;

pub use channel::{MessageSink, MessageSource, WsSink, WsSource, connect};
