//! Protocol types shared by the client codecs and the connection driver.
//!
//! - [`Message`], [`PayloadItem`] and [`PayloadSize`] describe what flows through the codecs
//! - [`RequestHead`] and [`ResponseHead`] are the message heads
//! - [`HttpError`], [`ParseError`] and [`SendError`] are the failures of one exchange

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHead;
pub use request::expects_body;

mod response;
pub use response::ResponseHead;
pub use response::is_bodiless;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
