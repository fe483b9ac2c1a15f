//! Administrative Shell
//!
//! Configuration and read operations on top of the region validator and
//! the bounded reader.
//!
//! # Current Operations
//! - configure(`<hex-address>[:<hex-length>]`) - replace the pending request
//! - read() - read every word of the pending request

mod request;
mod result;
mod service;

pub use request::{ConfigParseError, PeekRequest, RequestField, MAX_CONFIG_LEN};
pub use result::{PeekResult, PeekWord};
pub use service::{AdminInterface, PeekService};
