use std::fmt;

use serde::Deserialize;

/// A job's state as last reported by the server in `stats-job`. The client
/// never tracks this itself.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Ready,
    Delayed,
    Reserved,
    Buried,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use JobState::*;

        f.write_str(match self {
            Ready => "ready",
            Delayed => "delayed",
            Reserved => "reserved",
            Buried => "buried",
        })
    }
}
