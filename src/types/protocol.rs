use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::serialisable::BeanstalkSerialisable;
use super::stats::{JobStats, ServerStats, TubeStats};
use super::tube::Tube;
use crate::error::{Error, Result};

/// A command sent by the client to the server.
///
/// Each variant knows how it is phrased on the wire ([`Command::encode`]) and
/// which replies it can receive ([`Command::decode`]).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// Places a job onto the currently `use`d tube. Returns `INSERTED <id>`,
    /// or `BURIED <id>` if the server couldn't grow its priority queue.
    ///
    /// On the wire: `put <pri> <delay> <ttr> <n_bytes>` followed by the body.
    Put {
        pri: u32,
        delay: u32,
        ttr: u32,
        data: Bytes,
    },
    /// Selects the tube later `put`s go to. Returns `USING <tube>`.
    ///
    /// On the wire: `use <tube>`
    Use { tube: Tube },
    /// Awaits a job from all the `watch`ed tubes, blocking until one appears.
    ///
    /// On the wire: `reserve`
    Reserve,
    /// As `reserve`, but after `timeout` seconds pass, a `TIMED_OUT` response
    /// is sent instead.
    ///
    /// On the wire: `reserve-with-timeout <seconds>`
    ReserveWithTimeout { timeout: u32 },
    /// Reserves a job by ID if it exists and is not already reserved,
    /// otherwise returning `NOT_FOUND`.
    ///
    /// On the wire: `reserve-job <id>`
    ReserveJob { id: u64 },
    /// Deletes a job reserved by this client, or in the ready, buried, or
    /// delayed states. Returns `DELETED` or `NOT_FOUND`.
    ///
    /// On the wire: `delete <id>`
    Delete { id: u64 },
    /// Returns a job reserved by this client to the ready queue (or to the
    /// delayed set if `delay` is non-zero). Returns `RELEASED` or `NOT_FOUND`
    /// in most cases, but can also return `BURIED` if the server was unable
    /// to expand the priority queue data structure.
    ///
    /// On the wire: `release <id> <pri> <delay>`
    Release { id: u64, pri: u32, delay: u32 },
    /// Buries a job reserved by this client. Returns `BURIED` or
    /// `NOT_FOUND`.
    ///
    /// On the wire: `bury <id> <pri>`
    Bury { id: u64, pri: u32 },
    /// Refreshes the time-to-run of a job reserved by this client. Returns
    /// `TOUCHED` or `NOT_FOUND`.
    ///
    /// On the wire: `touch <id>`
    Touch { id: u64 },
    /// Adds a tube to the watch list. Always replies with
    /// `WATCHING <number of watched tubes>`.
    ///
    /// On the wire: `watch <tube>`
    Watch { tube: Tube },
    /// Reverses the effect of `watch`. Returns `WATCHING <n>` or
    /// `NOT_IGNORED` if this would remove the last tube in the watch list.
    ///
    /// On the wire: `ignore <tube>`
    Ignore { tube: Tube },
    /// Returns the job with this ID regardless of its state, as
    /// `FOUND <id> <bytes>` or `NOT_FOUND`, in common with the whole `peek`
    /// family.
    ///
    /// On the wire: `peek <id>`
    Peek { id: u64 },
    /// On the wire: `peek-ready`
    PeekReady,
    /// On the wire: `peek-delayed`
    PeekDelayed,
    /// On the wire: `peek-buried`
    PeekBuried,
    /// Promotes up to `bound` jobs on the used tube from buried (or, if none
    /// are buried, delayed) to ready. Returns `KICKED <count>`.
    ///
    /// On the wire: `kick <bound>`
    Kick { bound: u64 },
    /// Promotes a single buried or delayed job to ready. Returns `KICKED`, or
    /// `NOT_FOUND` both when the job is unknown and when it is not kickable.
    ///
    /// On the wire: `kick-job <id>`
    KickJob { id: u64 },
    /// On the wire: `stats-job <id>`, answered by `OK <n_bytes>` and a YAML
    /// dictionary.
    StatsJob { id: u64 },
    /// On the wire: `stats-tube <tube>`
    StatsTube { tube: Tube },
    /// On the wire: `stats`
    Stats,
    /// Lists every existing tube as `OK <n_bytes>` and a YAML list.
    ///
    /// On the wire: `list-tubes`
    ListTubes,
    /// Returns the tube this client is using as `USING <tube>`.
    ///
    /// On the wire: `list-tube-used`
    ListTubeUsed,
    /// On the wire: `list-tubes-watched`
    ListTubesWatched,
    /// Stops new reservations from a tube for `delay` seconds. Returns
    /// `PAUSED` or `NOT_FOUND`.
    ///
    /// On the wire: `pause-tube <tube> <delay>`
    PauseTube { tube: Tube, delay: u32 },
    /// Asks the server to close the connection. There is no reply.
    ///
    /// On the wire: `quit`
    Quit,
}

/// A successfully decoded server reply.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    Inserted { id: u64 },
    Using { tube: String },
    /// A job handed back by the `reserve` or `peek` families.
    Job { id: u64, body: Bytes },
    Deleted,
    Released,
    Buried,
    Touched,
    Watching { count: u32 },
    KickedCount { count: u64 },
    Kicked,
    JobStats(JobStats),
    TubeStats(TubeStats),
    ServerStats(ServerStats),
    Tubes(Vec<String>),
    Paused,
}

/// Every status line the server can send. Data-bearing statuses carry the
/// declared payload length; the payload itself is read by the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// On the wire: `OUT_OF_MEMORY`
    OutOfMemory,
    /// On the wire: `INTERNAL_ERROR`
    InternalError,
    /// On the wire: `BAD_FORMAT`
    BadFormat,
    /// On the wire: `UNKNOWN_COMMAND`
    UnknownCommand,
    /// On the wire: `INSERTED <id>`
    Inserted { id: u64 },
    /// On the wire: `BURIED <id>`, in response to a `put`.
    BuriedId { id: u64 },
    /// On the wire: `EXPECTED_CRLF`
    ExpectedCrlf,
    /// On the wire: `JOB_TOO_BIG`
    JobTooBig,
    /// On the wire: `DRAINING`
    Draining,
    /// On the wire: `USING <tube>`
    Using { tube: String },
    /// On the wire: `DEADLINE_SOON`
    DeadlineSoon,
    /// On the wire: `TIMED_OUT`
    TimedOut,
    /// On the wire: `RESERVED <id> <n_bytes>`
    Reserved { id: u64, n_bytes: u32 },
    /// On the wire: `NOT_FOUND`
    NotFound,
    /// On the wire: `DELETED`
    Deleted,
    /// On the wire: `RELEASED`
    Released,
    /// On the wire: `BURIED`
    Buried,
    /// On the wire: `TOUCHED`
    Touched,
    /// On the wire: `WATCHING <count>`
    Watching { count: u32 },
    /// On the wire: `NOT_IGNORED`
    NotIgnored,
    /// On the wire: `FOUND <id> <n_bytes>`
    Found { id: u64, n_bytes: u32 },
    /// On the wire: `KICKED <count>`, in response to a `kick`.
    KickedCount { count: u64 },
    /// On the wire: `KICKED`, in response to a `kick-job`.
    Kicked,
    /// On the wire: `OK <n_bytes>`
    Ok { n_bytes: u32 },
    /// On the wire: `PAUSED`
    Paused,
}

impl Status {
    /// The length of the payload following this status line, if any.
    pub fn data_len(&self) -> Option<usize> {
        match self {
            Self::Reserved { n_bytes, .. }
            | Self::Found { n_bytes, .. }
            | Self::Ok { n_bytes } => Some(*n_bytes as usize),
            _ => None,
        }
    }
}

impl Command {
    pub fn put(pri: u32, delay: u32, ttr: u32, data: impl Into<Bytes>) -> Self {
        Self::Put {
            pri,
            delay,
            ttr,
            data: data.into(),
        }
    }

    pub fn use_tube(tube: impl Into<String>) -> Result<Self> {
        Ok(Self::Use {
            tube: Tube::new(tube)?,
        })
    }

    pub fn watch(tube: impl Into<String>) -> Result<Self> {
        Ok(Self::Watch {
            tube: Tube::new(tube)?,
        })
    }

    pub fn ignore(tube: impl Into<String>) -> Result<Self> {
        Ok(Self::Ignore {
            tube: Tube::new(tube)?,
        })
    }

    pub fn stats_tube(tube: impl Into<String>) -> Result<Self> {
        Ok(Self::StatsTube {
            tube: Tube::new(tube)?,
        })
    }

    pub fn pause_tube(tube: impl Into<String>, delay: u32) -> Result<Self> {
        Ok(Self::PauseTube {
            tube: Tube::new(tube)?,
            delay,
        })
    }

    /// The command's name as sent on the wire.
    pub fn verb(&self) -> &'static str {
        use Command::*;

        match self {
            Put { .. } => "put",
            Use { .. } => "use",
            Reserve => "reserve",
            ReserveWithTimeout { .. } => "reserve-with-timeout",
            ReserveJob { .. } => "reserve-job",
            Delete { .. } => "delete",
            Release { .. } => "release",
            Bury { .. } => "bury",
            Touch { .. } => "touch",
            Watch { .. } => "watch",
            Ignore { .. } => "ignore",
            Peek { .. } => "peek",
            PeekReady => "peek-ready",
            PeekDelayed => "peek-delayed",
            PeekBuried => "peek-buried",
            Kick { .. } => "kick",
            KickJob { .. } => "kick-job",
            StatsJob { .. } => "stats-job",
            StatsTube { .. } => "stats-tube",
            Stats => "stats",
            ListTubes => "list-tubes",
            ListTubeUsed => "list-tube-used",
            ListTubesWatched => "list-tubes-watched",
            PauseTube { .. } => "pause-tube",
            Quit => "quit",
        }
    }

    /// Builds the request line, without its trailing CRLF or any body.
    pub fn encode(&self) -> String {
        use Command::*;

        let verb = self.verb();
        match self {
            Put {
                pri,
                delay,
                ttr,
                data,
            } => format!("{verb} {pri} {delay} {ttr} {}", data.len()),
            Use { tube }
            | Watch { tube }
            | Ignore { tube }
            | StatsTube { tube } => format!("{verb} {tube}"),
            ReserveWithTimeout { timeout } => format!("{verb} {timeout}"),
            ReserveJob { id }
            | Delete { id }
            | Touch { id }
            | Peek { id }
            | KickJob { id }
            | StatsJob { id } => format!("{verb} {id}"),
            Release { id, pri, delay } => format!("{verb} {id} {pri} {delay}"),
            Bury { id, pri } => format!("{verb} {id} {pri}"),
            Kick { bound } => format!("{verb} {bound}"),
            PauseTube { tube, delay } => format!("{verb} {tube} {delay}"),
            Reserve | PeekReady | PeekDelayed | PeekBuried | Stats
            | ListTubes | ListTubeUsed | ListTubesWatched | Quit => {
                verb.to_owned()
            },
        }
    }

    /// Interprets the server's reply to this command.
    ///
    /// `line` is the status line without its CRLF; `data` is the payload the
    /// status line declared, if any. Replies outside this command's grammar
    /// fail with [`Error::Unknown`], carrying the raw line.
    ///
    /// The server-wide error keywords (`OUT_OF_MEMORY`, `INTERNAL_ERROR`,
    /// `BAD_FORMAT`, `UNKNOWN_COMMAND`) belong to every command's grammar, so
    /// e.g. `watch` decodes them to their own errors rather than `Unknown`.
    pub fn decode(&self, line: &[u8], data: Option<Bytes>) -> Result<Reply> {
        use Command as C;
        use Status as S;

        let status = match Status::try_from(line) {
            Ok(status) => status,
            Err(_) => return Err(Error::unknown(line)),
        };

        let reply = match (self, status) {
            (C::Put { .. }, S::Inserted { id }) => Reply::Inserted { id },
            (C::Use { .. } | C::ListTubeUsed, S::Using { tube }) => {
                Reply::Using { tube }
            },
            (
                C::Reserve | C::ReserveWithTimeout { .. } | C::ReserveJob { .. },
                S::Reserved { id, n_bytes },
            )
            | (
                C::Peek { .. } | C::PeekReady | C::PeekDelayed | C::PeekBuried,
                S::Found { id, n_bytes },
            ) => Reply::Job {
                id,
                body: payload(line, data, n_bytes)?,
            },
            (C::Delete { .. }, S::Deleted) => Reply::Deleted,
            (C::Release { .. }, S::Released) => Reply::Released,
            (C::Bury { .. }, S::Buried) => Reply::Buried,
            (C::Touch { .. }, S::Touched) => Reply::Touched,
            (C::Watch { .. } | C::Ignore { .. }, S::Watching { count }) => {
                Reply::Watching { count }
            },
            (C::Kick { .. }, S::KickedCount { count }) => {
                Reply::KickedCount { count }
            },
            (C::KickJob { .. }, S::Kicked) => Reply::Kicked,
            (C::StatsJob { .. }, S::Ok { n_bytes }) => {
                Reply::JobStats(yaml(line, data, n_bytes)?)
            },
            (C::StatsTube { .. }, S::Ok { n_bytes }) => {
                Reply::TubeStats(yaml(line, data, n_bytes)?)
            },
            (C::Stats, S::Ok { n_bytes }) => {
                Reply::ServerStats(yaml(line, data, n_bytes)?)
            },
            (C::ListTubes | C::ListTubesWatched, S::Ok { n_bytes }) => {
                Reply::Tubes(yaml(line, data, n_bytes)?)
            },
            (C::PauseTube { .. }, S::Paused) => Reply::Paused,
            (_, status) => return Err(self.failure(status, line)),
        };

        Ok(reply)
    }

    /// Classifies a status that isn't a success for this command.
    fn failure(&self, status: Status, line: &[u8]) -> Error {
        use Command as C;
        use Status as S;

        match (self, status) {
            (_, S::OutOfMemory) => Error::OutOfMemory,
            (_, S::InternalError) => Error::InternalError,
            (_, S::BadFormat) => Error::BadFormat,
            (_, S::UnknownCommand) => Error::UnknownCommand,

            (C::Put { .. }, S::BuriedId { id }) => Error::Buried { id },
            (C::Put { .. }, S::ExpectedCrlf) => Error::ExpectedCrlf,
            (C::Put { .. }, S::JobTooBig) => Error::JobTooBig,
            (C::Put { .. }, S::Draining) => Error::Draining,

            (C::Reserve | C::ReserveWithTimeout { .. }, S::DeadlineSoon) => {
                Error::DeadlineSoon
            },
            (C::ReserveWithTimeout { .. }, S::TimedOut) => Error::TimedOut,

            (C::Release { id, .. }, S::Buried) => Error::Buried { id: *id },
            (C::Ignore { .. }, S::NotIgnored) => Error::NotIgnored,

            (
                C::ReserveJob { .. }
                | C::Delete { .. }
                | C::Release { .. }
                | C::Bury { .. }
                | C::Touch { .. }
                | C::Peek { .. }
                | C::PeekReady
                | C::PeekDelayed
                | C::PeekBuried
                | C::KickJob { .. }
                | C::StatsJob { .. }
                | C::StatsTube { .. }
                | C::PauseTube { .. },
                S::NotFound,
            ) => Error::NotFound,

            _ => Error::unknown(line),
        }
    }
}

/// Checks the payload is present and of the declared length.
fn payload(line: &[u8], data: Option<Bytes>, n_bytes: u32) -> Result<Bytes> {
    match data {
        Some(data) if data.len() == n_bytes as usize => Ok(data),
        _ => Err(Error::unknown(line)),
    }
}

fn yaml<T: DeserializeOwned>(
    line: &[u8],
    data: Option<Bytes>,
    n_bytes: u32,
) -> Result<T> {
    let data = payload(line, data, n_bytes)?;
    Ok(serde_yaml::from_slice(&data)?)
}

impl BeanstalkSerialisable for Command {
    fn serialise_beanstalk(&self) -> Vec<u8> {
        let mut frame = self.encode().into_bytes();
        frame.extend_from_slice(b"\r\n");

        if let Command::Put { data, .. } = self {
            frame.extend_from_slice(data);
            frame.extend_from_slice(b"\r\n");
        }

        frame
    }
}
