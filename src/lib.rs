//! A typed async client for the beanstalkd work-queue protocol.
//!
//! Requests are modelled as [`Command`] values which know how to phrase
//! themselves on the wire and how to interpret the server's reply. A
//! [`Connection`] executes them one at a time, and [`Job`] wraps a reserved or
//! peeked job with its lifecycle operations.
pub mod connection;
pub mod error;
pub mod line_reader;
pub mod parser;
pub mod types;
pub mod util;

pub use connection::{Connection, JobControl};
pub use error::{Error, Result};
pub use types::job::{Job, Message};
pub use types::protocol::{Command, Reply};
pub use types::states::JobState;
pub use types::stats::{JobStats, ServerStats, TubeStats};
pub use types::tube::Tube;
