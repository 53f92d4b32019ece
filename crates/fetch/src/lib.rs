//! An async HTTP client whose responses resolve lazily.
//!
//! A call on [`Client`] registers the transfer and returns an [`AsyncResponse`] right away.
//! The transfer runs on the client's [`Scheduler`] while the caller goes on, the response is
//! only waited for when one of its accessors is first used. Several calls in a row therefore
//! run concurrently without any explicit joining.
//!
//! # Example
//!
//! ```no_run
//! use micro_fetch::{Client, ClientOptions};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), micro_fetch::ClientError> {
//! let client = Client::with_options(ClientOptions::new().with_user_agent("micro-fetch/0.1"))?;
//!
//! let mut page = client.get("http://127.0.0.1:8080/")?;
//! let mut saved = client.post_with(
//!     "http://127.0.0.1:8080/items",
//!     json!({ "name": "lazy" }),
//!     json!({ "headers": ["Content-Type: application/json"], "timeoutMs": 500 }),
//! )?;
//!
//! println!("{}", page.text().await?);
//! println!("{}", saved.status().await?);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - options: [`ClientOptions`], layered per call with [`ClientOptions::resolve`]
//! - middleware: [`Middleware`] links around every dispatch
//! - transfer: the engine behind [`Transport`], plain HTTP/1.1 by default
//! - response: the lazy [`AsyncResponse`] handle

mod client;
mod encoding;
mod error;
mod middleware;
mod options;
mod request;
mod response;
mod scheduler;
mod transfer;

pub use client::Client;
pub use client::ClientBuilder;
pub use error::ClientError;
pub use error::OptionError;
pub use error::RequestError;
pub use error::TransferError;
pub use middleware::Middleware;
pub use middleware::Next;
pub use options::ClientOptions;
pub use options::IntoOptions;
pub use options::OPTION_NAMES;
pub use request::Payload;
pub use request::TransferRequest;
pub use request::{apply_defaults, encode_payload, parse_header_lines};
pub use response::AsyncResponse;
pub use scheduler::Scheduler;
pub use transfer::HttpTransport;
pub use transfer::Transport;
pub use transfer::begin;
