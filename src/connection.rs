//! A connection to a beanstalkd server.
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};
use crate::line_reader::LineReader;
use crate::parser;
use crate::types::job::Job;
use crate::types::protocol::{Command, Reply};
use crate::types::serialisable::BeanstalkSerialisable;
use crate::types::stats::{JobStats, ServerStats, TubeStats};
use crate::util::bytes_to_human_str;

/// The operations a [`Job`] needs from the connection it came from.
#[async_trait]
pub trait JobControl: Send + Sync {
    async fn delete(&self, id: u64) -> Result<()>;
    async fn touch(&self, id: u64) -> Result<()>;
    async fn release(&self, id: u64, pri: u32, delay: u32) -> Result<()>;
    async fn bury(&self, id: u64, pri: u32) -> Result<()>;
    async fn kick_job(&self, id: u64) -> Result<()>;
    async fn stats_job(&self, id: u64) -> Result<JobStats>;
}

/// One client connection. Commands are executed strictly one at a time: a
/// command is written only once the previous reply has been read in full,
/// and concurrent callers queue on an internal lock.
///
/// Dropping a command's future part way through leaves the stream out of
/// step with the server; the connection should be discarded after that.
pub struct Connection<S = TcpStream>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    stream: Mutex<LineReader<S>>,
}

impl Connection<TcpStream> {
    /// Connects over TCP with Nagle's algorithm disabled, as every exchange
    /// is a short request awaiting a short reply.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = %stream.peer_addr()?, "connected");

        Ok(Self::new(stream))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: Mutex::new(stream.into()),
        }
    }

    /// Sends a command and decodes the server's reply to it.
    ///
    /// Any payload the status line declares is read before decoding, so the
    /// stream stays in step even when the reply is an error for this command.
    #[instrument(level = "trace", skip_all, fields(cmd = cmd.verb()))]
    pub async fn execute(&self, cmd: &Command) -> Result<Reply> {
        let mut stream = self.stream.lock().await;

        trace!(line = bytes_to_human_str(cmd.encode().as_bytes()), "sending");
        let w = stream.get_mut();
        w.write_all(&cmd.serialise_beanstalk()).await?;
        w.flush().await?;

        let line = stream.read_line().await?.ok_or(Error::ConnectionClosed)?;
        trace!(line = bytes_to_human_str(&line), "received");

        let data = match parser::data_len(&line) {
            Some(len) => Some(
                stream
                    .read_data(len)
                    .await?
                    .ok_or(Error::ConnectionClosed)?,
            ),
            None => None,
        };

        cmd.decode(&line, data)
    }

    /// Queues a job on the used tube, returning its ID.
    pub async fn put(
        &self,
        pri: u32,
        delay: u32,
        ttr: u32,
        data: impl Into<Bytes>,
    ) -> Result<u64> {
        let cmd = Command::put(pri, delay, ttr, data);
        match self.execute(&cmd).await? {
            Reply::Inserted { id } => Ok(id),
            _ => Err(unexpected(&cmd)),
        }
    }

    /// Selects the tube `put` adds jobs to, returning its name.
    pub async fn use_tube(&self, tube: impl Into<String>) -> Result<String> {
        let cmd = Command::use_tube(tube)?;
        self.using(&cmd).await
    }

    pub async fn reserve(&self) -> Result<Job<'_, Self>> {
        self.job(&Command::Reserve).await
    }

    /// As [`Connection::reserve`], but fails with [`Error::TimedOut`] if no
    /// job arrives within `timeout` seconds.
    pub async fn reserve_with_timeout(
        &self,
        timeout: u32,
    ) -> Result<Job<'_, Self>> {
        self.job(&Command::ReserveWithTimeout { timeout }).await
    }

    pub async fn reserve_job(&self, id: u64) -> Result<Job<'_, Self>> {
        self.job(&Command::ReserveJob { id }).await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.expect(&Command::Delete { id }, Reply::Deleted).await
    }

    pub async fn release(&self, id: u64, pri: u32, delay: u32) -> Result<()> {
        self.expect(&Command::Release { id, pri, delay }, Reply::Released)
            .await
    }

    pub async fn bury(&self, id: u64, pri: u32) -> Result<()> {
        self.expect(&Command::Bury { id, pri }, Reply::Buried).await
    }

    pub async fn touch(&self, id: u64) -> Result<()> {
        self.expect(&Command::Touch { id }, Reply::Touched).await
    }

    /// Adds a tube to the watch list, returning how many tubes are watched.
    pub async fn watch(&self, tube: impl Into<String>) -> Result<u32> {
        let cmd = Command::watch(tube)?;
        self.watching(&cmd).await
    }

    /// Removes a tube from the watch list, returning how many tubes are still
    /// watched.
    pub async fn ignore(&self, tube: impl Into<String>) -> Result<u32> {
        let cmd = Command::ignore(tube)?;
        self.watching(&cmd).await
    }

    pub async fn peek(&self, id: u64) -> Result<Job<'_, Self>> {
        self.job(&Command::Peek { id }).await
    }

    pub async fn peek_ready(&self) -> Result<Job<'_, Self>> {
        self.job(&Command::PeekReady).await
    }

    pub async fn peek_delayed(&self) -> Result<Job<'_, Self>> {
        self.job(&Command::PeekDelayed).await
    }

    pub async fn peek_buried(&self) -> Result<Job<'_, Self>> {
        self.job(&Command::PeekBuried).await
    }

    /// Kicks up to `bound` jobs on the used tube, returning how many were
    /// kicked.
    pub async fn kick(&self, bound: u64) -> Result<u64> {
        let cmd = Command::Kick { bound };
        match self.execute(&cmd).await? {
            Reply::KickedCount { count } => Ok(count),
            _ => Err(unexpected(&cmd)),
        }
    }

    pub async fn kick_job(&self, id: u64) -> Result<()> {
        self.expect(&Command::KickJob { id }, Reply::Kicked).await
    }

    pub async fn stats_job(&self, id: u64) -> Result<JobStats> {
        let cmd = Command::StatsJob { id };
        match self.execute(&cmd).await? {
            Reply::JobStats(stats) => Ok(stats),
            _ => Err(unexpected(&cmd)),
        }
    }

    pub async fn stats_tube(
        &self,
        tube: impl Into<String>,
    ) -> Result<TubeStats> {
        let cmd = Command::stats_tube(tube)?;
        match self.execute(&cmd).await? {
            Reply::TubeStats(stats) => Ok(stats),
            _ => Err(unexpected(&cmd)),
        }
    }

    pub async fn stats(&self) -> Result<ServerStats> {
        let cmd = Command::Stats;
        match self.execute(&cmd).await? {
            Reply::ServerStats(stats) => Ok(stats),
            _ => Err(unexpected(&cmd)),
        }
    }

    pub async fn list_tubes(&self) -> Result<Vec<String>> {
        self.tubes(&Command::ListTubes).await
    }

    pub async fn list_tube_used(&self) -> Result<String> {
        self.using(&Command::ListTubeUsed).await
    }

    pub async fn list_tubes_watched(&self) -> Result<Vec<String>> {
        self.tubes(&Command::ListTubesWatched).await
    }

    /// Stops jobs being reserved from `tube` for `delay` seconds.
    pub async fn pause_tube(
        &self,
        tube: impl Into<String>,
        delay: u32,
    ) -> Result<()> {
        let cmd = Command::pause_tube(tube, delay)?;
        self.expect(&cmd, Reply::Paused).await
    }

    /// Asks the server to close the connection, then shuts down our side.
    /// The server sends no reply.
    pub async fn quit(self) -> Result<()> {
        let mut stream = self.stream.into_inner();
        let w = stream.get_mut();
        w.write_all(&Command::Quit.serialise_beanstalk()).await?;
        w.shutdown().await?;
        debug!("quit");

        Ok(())
    }

    async fn expect(&self, cmd: &Command, want: Reply) -> Result<()> {
        if self.execute(cmd).await? == want {
            Ok(())
        } else {
            Err(unexpected(cmd))
        }
    }

    async fn job(&self, cmd: &Command) -> Result<Job<'_, Self>> {
        match self.execute(cmd).await? {
            Reply::Job { id, body } => Ok(Job::new(self, id, body)),
            _ => Err(unexpected(cmd)),
        }
    }

    async fn using(&self, cmd: &Command) -> Result<String> {
        match self.execute(cmd).await? {
            Reply::Using { tube } => Ok(tube),
            _ => Err(unexpected(cmd)),
        }
    }

    async fn watching(&self, cmd: &Command) -> Result<u32> {
        match self.execute(cmd).await? {
            Reply::Watching { count } => Ok(count),
            _ => Err(unexpected(cmd)),
        }
    }

    async fn tubes(&self, cmd: &Command) -> Result<Vec<String>> {
        match self.execute(cmd).await? {
            Reply::Tubes(tubes) => Ok(tubes),
            _ => Err(unexpected(cmd)),
        }
    }
}

fn unexpected(cmd: &Command) -> Error {
    Error::UnexpectedReply {
        command: cmd.verb(),
    }
}

#[async_trait]
impl<S> JobControl for Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn delete(&self, id: u64) -> Result<()> {
        Connection::delete(self, id).await
    }

    async fn touch(&self, id: u64) -> Result<()> {
        Connection::touch(self, id).await
    }

    async fn release(&self, id: u64, pri: u32, delay: u32) -> Result<()> {
        Connection::release(self, id, pri, delay).await
    }

    async fn bury(&self, id: u64, pri: u32) -> Result<()> {
        Connection::bury(self, id, pri).await
    }

    async fn kick_job(&self, id: u64) -> Result<()> {
        Connection::kick_job(self, id).await
    }

    async fn stats_job(&self, id: u64) -> Result<JobStats> {
        Connection::stats_job(self, id).await
    }
}
