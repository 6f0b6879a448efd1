//! implements a parser for beanstalkd status lines.
use std::fmt;

use crate::types::protocol::Status;
use crate::types::tube::MAX_TUBE_NAME_LEN;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsingError {
    BadFormat,
    UnknownStatus,
}

impl fmt::Display for ParsingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Self::BadFormat => "bad format",
            Self::UnknownStatus => "unknown status",
        })
    }
}

/// Provides a custom, minimal, zero-copy parser of byte slices.
struct ParseState<'a> {
    from: &'a [u8],
}

impl<'a> ParseState<'a> {
    /// Asserts there's no more input to take, returning `result` if so, and a
    /// `BadFormat` error otherwise.
    fn expect_done_and<R>(&self, result: R) -> Result<R, ParsingError> {
        if self.from.is_empty() {
            Ok(result)
        } else {
            Err(ParsingError::BadFormat)
        }
    }

    /// Consumes from the input, expecting a token of non-zero length.
    fn expect_next_token(&mut self) -> Result<&'a [u8], ParsingError> {
        match self.next_token() {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ParsingError::BadFormat),
        }
    }

    /// Consumes from the input, expecting a space then a decimal number that
    /// fits in a `u64`.
    fn expect_next_u64(&mut self) -> Result<u64, ParsingError> {
        self.expect_space()?;

        let token = self.expect_next_token()?;

        let mut r = 0u64;
        for v in token {
            match v {
                b'0'..=b'9' => {
                    r = r
                        .checked_mul(10)
                        .ok_or(ParsingError::BadFormat)?
                        .checked_add((*v - b'0') as u64)
                        .ok_or(ParsingError::BadFormat)?
                },
                _ => return Err(ParsingError::BadFormat),
            };
        }

        Ok(r)
    }

    /// Consumes from the input, expecting a space then a u32.
    fn expect_next_u32(&mut self) -> Result<u32, ParsingError> {
        self.expect_next_u64()?
            .try_into()
            .map_err(|_| ParsingError::BadFormat)
    }

    /// Consumes from the input, expecting a space then a tube name.
    fn expect_next_name(&mut self) -> Result<String, ParsingError> {
        self.expect_space()?;

        let token = self.expect_next_token()?;

        if token.len() > MAX_TUBE_NAME_LEN {
            return Err(ParsingError::BadFormat);
        }

        String::from_utf8(token.to_vec()).map_err(|_| ParsingError::BadFormat)
    }

    /// Consumes a space.
    fn expect_space(&mut self) -> Result<(), ParsingError> {
        match self.from.first() {
            Some(b' ') => {
                self.from = &self.from[1..];
                Ok(())
            },
            _ => Err(ParsingError::BadFormat),
        }
    }

    /// Consumes from this ParseState until reaching a space byte or the end of
    /// the input. It returns None at the end of the input. On consecutive space
    /// bytes, it returns a zero-length slice.
    ///
    /// Tokens borrow from the input rather than the ParseState, so a token can
    /// be inspected while parsing continues.
    fn next_token(&mut self) -> Option<&'a [u8]> {
        let from = self.from;
        if from.is_empty() {
            return None;
        }

        let idx = from.iter().position(|c| *c == b' ').unwrap_or(from.len());

        let token = &from[..idx];
        self.from = &from[idx..];

        Some(token)
    }
}

impl<'a> From<&'a [u8]> for ParseState<'a> {
    fn from(from: &'a [u8]) -> Self {
        ParseState { from }
    }
}

// Parsing is implemented to fulfil the TryFrom trait. The line must not
// include its trailing CRLF.
impl TryFrom<&[u8]> for Status {
    type Error = ParsingError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        use Status::*;

        let mut ps: ParseState = value.into();

        let status = match ps.expect_next_token()? {
            // <status>
            b"OUT_OF_MEMORY" => OutOfMemory,
            b"INTERNAL_ERROR" => InternalError,
            b"BAD_FORMAT" => BadFormat,
            b"UNKNOWN_COMMAND" => UnknownCommand,
            b"EXPECTED_CRLF" => ExpectedCrlf,
            b"JOB_TOO_BIG" => JobTooBig,
            b"DRAINING" => Draining,
            b"DEADLINE_SOON" => DeadlineSoon,
            b"TIMED_OUT" => TimedOut,
            b"NOT_FOUND" => NotFound,
            b"DELETED" => Deleted,
            b"RELEASED" => Released,
            b"TOUCHED" => Touched,
            b"NOT_IGNORED" => NotIgnored,
            b"PAUSED" => Paused,

            // <status> [<n>]: the bare form answers bury/release and
            // kick-job, the numbered form answers put and kick.
            b"BURIED" if ps.from.is_empty() => Buried,
            b"BURIED" => BuriedId {
                id: ps.expect_next_u64()?,
            },
            b"KICKED" if ps.from.is_empty() => Kicked,
            b"KICKED" => KickedCount {
                count: ps.expect_next_u64()?,
            },

            // <status> <n>
            b"INSERTED" => Inserted {
                id: ps.expect_next_u64()?,
            },
            b"WATCHING" => Watching {
                count: ps.expect_next_u32()?,
            },
            b"OK" => Ok {
                n_bytes: ps.expect_next_u32()?,
            },

            // <status> <tube>
            b"USING" => Using {
                tube: ps.expect_next_name()?,
            },

            // <status> <id> <n_bytes>
            b"RESERVED" => Reserved {
                id: ps.expect_next_u64()?,
                n_bytes: ps.expect_next_u32()?,
            },
            b"FOUND" => Found {
                id: ps.expect_next_u64()?,
                n_bytes: ps.expect_next_u32()?,
            },

            _ => return Err(ParsingError::UnknownStatus),
        };

        ps.expect_done_and(status)
    }
}

/// Returns the length of the payload that follows `line`, if the line is a
/// well-formed data-bearing status.
pub fn data_len(line: &[u8]) -> Option<usize> {
    Status::try_from(line).ok()?.data_len()
}
