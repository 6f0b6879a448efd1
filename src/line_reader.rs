use std::io;

use bytes::{Bytes, BytesMut};
use itertools::Itertools;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Most `read_data` will reserve ahead of the bytes it has received.
const MAX_RESERVE: usize = 64 * 1024;

/// Reads CRLF-terminated status lines, and the fixed-size data blocks some of
/// them announce, from a stream.
pub struct LineReader<T: AsyncRead + Unpin> {
    /// Stores data that's been read in but not yet returned.
    buf: BytesMut,
    /// Index in buf from which a valid CRLF pair may appear (and before which
    /// a CRLF sequence hasn't been seen).
    maybe_crlf_from: usize,
    /// Data source
    reader: T,
}

impl<T: AsyncRead + Unpin> LineReader<T> {
    /// Reads a line from the internal buffer and/or reader, without its CRLF.
    /// On an end-of-stream condition, returns a None result, discarding any
    /// partly-read line in the internal buffer.
    ///
    /// This function is cancel-safe: its only async operation is a `read_buf`
    /// against the internal `reader`, and so it has the same guarantees:
    /// either a complete read occurs and is processed, or this is cancelled.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            // Scan only from one byte before the newest data, in case a \r
            // arrived at the end of the previous read and the \n in this one.
            if let Some(eol) = self
                .buf
                .iter()
                .skip(self.maybe_crlf_from)
                .tuple_windows::<(_, _)>()
                .position(|x| x == (&b'\r', &b'\n'))
            {
                let line =
                    self.buf.split_to(self.maybe_crlf_from + eol + 2).freeze();

                // Restart scanning from the start of the unread remainder.
                self.maybe_crlf_from = 0;

                return Ok(Some(line.slice(0..line.len() - 2)));
            }

            // Nothing complete buffered: read more, treating a zero-byte read
            // as the peer closing the stream.
            let n_bytes_read = self.reader.read_buf(&mut self.buf).await?;
            if n_bytes_read == 0 {
                return Ok(None);
            }

            self.maybe_crlf_from =
                self.buf.len().saturating_sub(n_bytes_read + 1);
        }
    }

    /// Reads a data block of exactly `len` bytes followed by CRLF, returning
    /// the block without its CRLF. Returns None if the stream ends first.
    ///
    /// Unlike [`LineReader::read_line`], this is not cancel-safe once any of
    /// the block has been consumed from the stream.
    pub async fn read_data(&mut self, len: usize) -> io::Result<Option<Bytes>> {
        let want = len + 2;

        // `len` comes from the server: grow with the data actually received
        // rather than reserving all of it up front.
        while self.buf.len() < want {
            self.buf.reserve((want - self.buf.len()).min(MAX_RESERVE));
            if self.reader.read_buf(&mut self.buf).await? == 0 {
                return Ok(None);
            }
        }

        let block = self.buf.split_to(want).freeze();
        self.maybe_crlf_from = 0;

        if &block[len..] != b"\r\n" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "data block not terminated by CRLF",
            ));
        }

        Ok(Some(block.slice(0..len)))
    }

    /// Gives access to the underlying stream, e.g. to write requests to it.
    /// Reading from it directly would bypass the internal buffer.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.reader
    }
}

impl<T: AsyncRead + Unpin> From<T> for LineReader<T> {
    fn from(value: T) -> Self {
        Self {
            buf: BytesMut::new(),
            maybe_crlf_from: 0,
            reader: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{self, AsyncWriteExt};
    use tokio::task::yield_now;

    #[tokio::test]
    async fn test_read_line() {
        // When properly read, each nth line should read b"test:{n}".
        let tests: &[&[u8]] = &[
            // Simple reassembly
            b"test:",
            b"1\r\n",
            // Split LF
            b"test:",
            b"2\r",
            b"\n",
            // Split CRLF
            b"test:",
            b"3",
            b"\r",
            b"\n",
            // Several lines in one read
            b"test:4\r\ntest:5\r\n",
            // Split LF
            b"test:6\r",
            b"\ntest:7\r\n",
            // Split CRLF
            b"test:8",
            b"\r\ntest:9\r\n",
        ];

        // Set the buffer large enough that our tests will never overflow it.
        // We can ensure correct fragmentation of reads by explicitly yielding
        // between each.
        let (mut server, client) = io::duplex(4096);

        tokio::spawn(async move {
            for buf in tests {
                server.write_all(buf).await.unwrap();
                yield_now().await;
            }
        });

        let mut lr: LineReader<_> = client.into();

        for n in 1..=9 {
            assert_eq!(
                lr.read_line().await.unwrap().unwrap(),
                format!("test:{n}")
            );
        }

        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_data() {
        let chunks: &'static [&'static [u8]] = &[
            // A payload containing CRLF, split across reads.
            b"RESERVED 1 7\r\nab",
            b"\r\ncd",
            b"e\r",
            b"\nFOUND 2 0\r\n\r\n",
            // Payload and following line in one read.
            b"OK 3\r\nxyz\r\nWATCHING 1\r\n",
        ];

        let (mut server, client) = io::duplex(4096);

        tokio::spawn(async move {
            for buf in chunks {
                server.write_all(buf).await.unwrap();
                yield_now().await;
            }
        });

        let mut lr: LineReader<_> = client.into();

        assert_eq!(lr.read_line().await.unwrap().unwrap(), "RESERVED 1 7");
        assert_eq!(lr.read_data(7).await.unwrap().unwrap(), "ab\r\ncde");
        assert_eq!(lr.read_line().await.unwrap().unwrap(), "FOUND 2 0");
        assert_eq!(lr.read_data(0).await.unwrap().unwrap(), "");
        assert_eq!(lr.read_line().await.unwrap().unwrap(), "OK 3");
        assert_eq!(lr.read_data(3).await.unwrap().unwrap(), "xyz");
        assert_eq!(lr.read_line().await.unwrap().unwrap(), "WATCHING 1");
        assert!(lr.read_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_data_errors() {
        let (mut server, client) = io::duplex(4096);
        server.write_all(b"abcXY").await.unwrap();

        let mut lr: LineReader<_> = client.into();
        let err = lr.read_data(3).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // Truncated block.
        server.write_all(b"ab").await.unwrap();
        drop(server);
        assert!(lr.read_data(5).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_data_huge_length() {
        let (mut server, client) = io::duplex(4096);
        server.write_all(b"short").await.unwrap();
        drop(server);

        let mut lr: LineReader<_> = client.into();
        assert!(lr.read_data(u32::MAX as usize).await.unwrap().is_none());
        assert!(lr.buf.capacity() < 1024 * 1024);
    }
}
