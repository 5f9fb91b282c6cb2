//! Live-reload transport.
//!
//! WebSocket-based reload channel plus the development HTTP server. The
//! project depends only on the transport operations: `init` (serve the
//! output directory and accept reload clients), `reload` (notify connected
//! browsers, optionally scoped to a stylesheet target) and `exit` (tear
//! every connection down). The `watch` half of the dev loop lives in the
//! `watch` module and feeds its reactions back through the project driver.

pub mod message;
pub mod server;

pub use message::ReloadMessage;
pub use server::{DevServer, ServerOptions};
