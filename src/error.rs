//! Failure kinds surfaced by commands, jobs and the connection.
use std::io;

use thiserror::Error;

use crate::types::tube::MAX_TUBE_NAME_LEN;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Raised when building a command, before anything is sent.
    #[error("tube name is {len} bytes, at most {} allowed", MAX_TUBE_NAME_LEN)]
    TubeNameTooLong { len: usize },
    /// The name contains whitespace or a control character, which would split
    /// the request line it is sent on.
    #[error("tube name {name:?} contains whitespace or control characters")]
    InvalidTubeName { name: String },

    /// The job doesn't exist, or isn't in a state the command applies to
    /// (e.g. not reserved by this client, or neither buried nor delayed for
    /// `kick-job`). Also returned for unknown tubes by `stats-tube` and
    /// `pause-tube`, and when nothing matches a `peek-*` command.
    #[error("not found")]
    NotFound,
    /// `ignore` would have left the watch list empty.
    #[error("refusing to ignore the last watched tube")]
    NotIgnored,
    /// The server ran out of memory growing a priority queue and buried the
    /// job instead of queueing it.
    #[error("job {id} was buried by the server")]
    Buried { id: u64 },
    #[error("timed out waiting for a job")]
    TimedOut,
    /// A job reserved by this client is about to exceed its time-to-run.
    #[error("deadline soon")]
    DeadlineSoon,

    #[error("job body was not terminated by CRLF")]
    ExpectedCrlf,
    #[error("job body exceeds the server's maximum job size")]
    JobTooBig,
    #[error("server is draining and not accepting new jobs")]
    Draining,

    #[error("server out of memory")]
    OutOfMemory,
    #[error("server internal error")]
    InternalError,
    #[error("server rejected the request as badly formatted")]
    BadFormat,
    #[error("server did not recognise the command")]
    UnknownCommand,

    /// The response matched none of the grammars known for the command.
    #[error("unknown response: {line:?}")]
    Unknown { line: String },
    #[error("invalid stats payload: {0}")]
    InvalidStats(#[from] serde_yaml::Error),
    #[error("`{command}` decoded to a reply of the wrong shape")]
    UnexpectedReply { command: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("connection closed by server")]
    ConnectionClosed,
}

impl Error {
    pub(crate) fn unknown(line: &[u8]) -> Self {
        Self::Unknown {
            line: String::from_utf8_lossy(line).into_owned(),
        }
    }
}
