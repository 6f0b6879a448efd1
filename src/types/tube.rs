use std::fmt;

use crate::error::{Error, Result};

/// Longest tube name the server accepts, in bytes.
pub const MAX_TUBE_NAME_LEN: usize = 200;

/// A tube name short enough to be sent to the server.
///
/// Commands that name a tube only accept a `Tube`, so an oversized name is
/// rejected when the command is built rather than by a `BAD_FORMAT` reply.
/// So is a name containing whitespace or control bytes, which would split the
/// request line it is written into.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Tube(String);

impl Tube {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        if name.len() > MAX_TUBE_NAME_LEN {
            Err(Error::TubeNameTooLong { len: name.len() })
        } else if !name.bytes().all(byte_is_name_safe) {
            Err(Error::InvalidTubeName { name })
        } else {
            Ok(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Anything but whitespace and control bytes. The server applies a stricter
/// character set of its own and answers `BAD_FORMAT` to the rest.
fn byte_is_name_safe(c: u8) -> bool {
    !(c.is_ascii_whitespace() || c.is_ascii_control())
}

impl TryFrom<&str> for Tube {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for Tube {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl AsRef<str> for Tube {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tube {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
