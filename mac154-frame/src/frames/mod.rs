//! Frame-type specific readers.
//!
//! These wrap the generic [`Frame`] reader and add the validation rules
//! that depend on the frame type: payload presence, per-command content
//! and addressing constraints, and the legacy beacon field layout.
//!
//! [`Frame`]: crate::Frame

mod ack;
pub use ack::*;

mod beacon;
pub use beacon::*;

mod data;
pub use data::*;

mod command;
pub use command::*;
