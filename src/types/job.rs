use std::fmt;

use bytes::Bytes;
use serde_json::Value;

use super::stats::JobStats;
use crate::connection::{Connection, JobControl};
use crate::error::Result;

/// Seconds a released job waits before becoming ready again, by default.
pub const DEFAULT_RELEASE_DELAY: u32 = 10;
/// Priority given to a released job, by default.
pub const DEFAULT_RELEASE_PRIORITY: u32 = 5;
/// Priority given to a buried job, by default.
pub const DEFAULT_BURY_PRIORITY: u32 = 2048;

/// A job's body, as exposed by [`Job::message`].
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// The body is a JSON document other than `null`.
    Json(Value),
    /// The body is UTF-8 text that isn't JSON, unchanged.
    Text(String),
    /// The body is neither JSON nor UTF-8.
    Binary(Bytes),
}

impl From<&Bytes> for Message {
    fn from(body: &Bytes) -> Self {
        match serde_json::from_slice(body) {
            // `null` carries no structure; keep it as the text it was sent as.
            Ok(Value::Null) | Err(_) => {},
            Ok(value) => return Self::Json(value),
        }

        match std::str::from_utf8(body) {
            Ok(text) => Self::Text(text.to_owned()),
            Err(_) => Self::Binary(body.clone()),
        }
    }
}

/// A job known to the server, together with the connection it was obtained
/// through.
///
/// A `Job` only remembers its ID and body. Its state (ready, delayed,
/// reserved, buried) lives on the server, so every operation is sent as-is and
/// a job in the wrong state shows up as an error from the server, typically
/// [`Error::NotFound`](crate::Error::NotFound).
pub struct Job<'c, C: ?Sized = Connection> {
    conn: &'c C,
    id: u64,
    body: Bytes,
    message: Message,
}

impl<'c, C: JobControl + ?Sized> Job<'c, C> {
    /// Wraps a job the server has reported with this ID and body.
    pub fn new(conn: &'c C, id: u64, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let message = Message::from(&body);

        Self {
            conn,
            id,
            body,
            message,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// The body as structured JSON if it parses as such, otherwise as text.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The body exactly as received.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn connection(&self) -> &'c C {
        self.conn
    }

    /// Removes the job from the server entirely, normally once it has been
    /// processed successfully.
    pub async fn delete(&self) -> Result<()> {
        self.conn.delete(self.id).await
    }

    /// Asks for more time to work on a reserved job, resetting its
    /// time-to-run. Useful for long jobs, e.g. on `DEADLINE_SOON`.
    pub async fn touch(&self) -> Result<()> {
        self.conn.touch(self.id).await
    }

    /// Puts a reserved job back into the ready queue after
    /// [`DEFAULT_RELEASE_DELAY`] seconds with [`DEFAULT_RELEASE_PRIORITY`],
    /// normally after a transient failure.
    pub async fn release(&self) -> Result<()> {
        self.release_with(DEFAULT_RELEASE_DELAY, DEFAULT_RELEASE_PRIORITY)
            .await
    }

    /// Puts a reserved job back, delayed by `delay` seconds and with a new
    /// priority. The job is "delayed" until then.
    pub async fn release_with(&self, delay: u32, priority: u32) -> Result<()> {
        self.conn.release(self.id, priority, delay).await
    }

    /// Buries the job with [`DEFAULT_BURY_PRIORITY`].
    pub async fn bury(&self) -> Result<()> {
        self.bury_with(DEFAULT_BURY_PRIORITY).await
    }

    /// Moves the job to the buried list, where the server leaves it alone
    /// until it is kicked.
    pub async fn bury_with(&self, priority: u32) -> Result<()> {
        self.conn.bury(self.id, priority).await
    }

    /// Moves a buried or delayed job back to ready. Fails with `NotFound` if
    /// the job doesn't exist or is in neither state.
    pub async fn kick(&self) -> Result<()> {
        self.conn.kick_job(self.id).await
    }

    pub async fn stats(&self) -> Result<JobStats> {
        self.conn.stats_job(self.id).await
    }
}

impl<C: ?Sized> fmt::Debug for Job<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::error::Error;
    use crate::types::states::JobState;

    /// Records every call made to it, succeeding unless told otherwise.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        not_found: bool,
    }

    impl Recorder {
        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.not_found {
                Err(Error::NotFound)
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobControl for Recorder {
        async fn delete(&self, id: u64) -> Result<()> {
            self.record(format!("delete {id}"))
        }

        async fn touch(&self, id: u64) -> Result<()> {
            self.record(format!("touch {id}"))
        }

        async fn release(&self, id: u64, pri: u32, delay: u32) -> Result<()> {
            self.record(format!("release {id} {pri} {delay}"))
        }

        async fn bury(&self, id: u64, pri: u32) -> Result<()> {
            self.record(format!("bury {id} {pri}"))
        }

        async fn kick_job(&self, id: u64) -> Result<()> {
            self.record(format!("kick-job {id}"))
        }

        async fn stats_job(&self, id: u64) -> Result<JobStats> {
            self.record(format!("stats-job {id}"))?;
            Ok(JobStats {
                id,
                tube: "default".into(),
                state: JobState::Reserved,
                pri: 0,
                age: 0,
                delay: 0,
                ttr: 60,
                time_left: 59,
                file: 0,
                reserves: 1,
                timeouts: 0,
                releases: 0,
                buries: 0,
                kicks: 0,
            })
        }
    }

    #[test]
    fn test_message() {
        let conn = Recorder::default();

        let job = Job::new(&conn, 1, r#"{"x":1}"#);
        assert_eq!(job.message(), &Message::Json(json!({"x": 1})));

        let job = Job::new(&conn, 2, "plain");
        assert_eq!(job.message(), &Message::Text("plain".into()));
        assert_eq!(job.body(), "plain");

        // Text is never trimmed or otherwise altered.
        let job = Job::new(&conn, 3, " not {json\r\n");
        assert_eq!(job.message(), &Message::Text(" not {json\r\n".into()));

        let job = Job::new(&conn, 4, vec![0xffu8, 0xfe]);
        assert_eq!(
            job.message(),
            &Message::Binary(Bytes::from_static(&[0xff, 0xfe]))
        );

        let job = Job::new(&conn, 5, "[1, 2]");
        assert_eq!(job.message(), &Message::Json(json!([1, 2])));
        assert_eq!(job.id(), 5);

        let job = Job::new(&conn, 6, "null");
        assert_eq!(job.message(), &Message::Text("null".into()));
        let job = Job::new(&conn, 7, " null ");
        assert_eq!(job.message(), &Message::Text(" null ".into()));
        let job = Job::new(&conn, 8, "0");
        assert_eq!(job.message(), &Message::Json(json!(0)));
    }

    #[tokio::test]
    async fn test_operations_delegate_once() {
        let conn = Recorder::default();
        let job = Job::new(&conn, 42, "body");

        job.delete().await.unwrap();
        job.touch().await.unwrap();
        job.release().await.unwrap();
        job.release_with(0, 100).await.unwrap();
        job.bury().await.unwrap();
        job.bury_with(7).await.unwrap();
        job.kick().await.unwrap();
        assert_eq!(job.stats().await.unwrap().id, 42);

        assert_eq!(
            conn.calls(),
            [
                "delete 42",
                "touch 42",
                "release 42 5 10",
                "release 42 100 0",
                "bury 42 2048",
                "bury 42 7",
                "kick-job 42",
                "stats-job 42",
            ]
        );
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let conn = Recorder {
            not_found: true,
            ..Default::default()
        };
        let job = Job::new(&conn, 9, "");

        // Repeating an operation is never short-circuited locally.
        assert!(matches!(job.delete().await, Err(Error::NotFound)));
        assert!(matches!(job.delete().await, Err(Error::NotFound)));
        assert!(matches!(job.kick().await, Err(Error::NotFound)));
        assert_eq!(conn.calls(), ["delete 9", "delete 9", "kick-job 9"]);
    }

    #[tokio::test]
    async fn test_independent_jobs() {
        let a = Recorder::default();
        let b = Recorder::default();
        let job_a = Job::new(&a, 1, "a");
        let job_b = Job::new(&b, 2, "b");

        let (ra, rb) = tokio::join!(
            async {
                job_a.touch().await?;
                job_a.delete().await
            },
            async {
                job_b.bury().await?;
                job_b.kick().await
            },
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(a.calls(), ["touch 1", "delete 1"]);
        assert_eq!(b.calls(), ["bury 2 2048", "kick-job 2"]);
    }

    #[test]
    fn test_job_through_dyn_control() {
        let conn = Recorder::default();
        let control: &dyn JobControl = &conn;
        let job = Job::new(control, 3, "x");
        assert_eq!(
            format!("{job:?}"),
            r#"Job { id: 3, message: Text("x"), .. }"#
        );
    }
}
