//! Connection driver for the client side.
//!
//! [`ClientConnection`] frames a split stream with the request encoder and the response
//! decoder and runs one exchange on it.

mod client_connection;

pub use client_connection::ClientConnection;
