//! Typed views of the YAML dictionaries returned by the `stats` family.
//!
//! Keys the server sends that aren't listed here are ignored, so newer servers
//! adding statistics don't break decoding.
use serde::Deserialize;

use super::states::JobState;

/// Reply to `stats-job <id>`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct JobStats {
    /// job ID
    pub id: u64,
    /// tube containing job
    pub tube: String,
    /// job state
    pub state: JobState,
    /// priority set by last put/release/bury
    pub pri: u32,
    /// time in seconds since creation
    pub age: u64,
    /// seconds remaining until ready
    pub delay: u64,
    /// allowed processing time in seconds
    pub ttr: u64,
    /// seconds until a reserved or delayed job changes state
    pub time_left: u64,
    /// earliest binlog file containing job
    pub file: u64,
    /// number of times job reserved
    pub reserves: u64,
    /// number of times job timed out
    pub timeouts: u64,
    /// number of times job released
    pub releases: u64,
    /// number of times job buried
    pub buries: u64,
    /// number of times job kicked
    pub kicks: u64,
}

/// Reply to `stats-tube <tube>`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct TubeStats {
    pub name: String,
    /// ready jobs with priority < 1024
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,
    /// total jobs created in this tube
    pub total_jobs: u64,
    /// clients that have `use`d this tube
    pub current_using: u64,
    /// clients watching this tube and waiting on a `reserve`
    pub current_waiting: u64,
    pub current_watching: u64,
    /// seconds the tube has been paused for
    pub pause: u64,
    pub cmd_delete: u64,
    pub cmd_pause_tube: u64,
    /// seconds until the tube is un-paused
    pub pause_time_left: u64,
}

/// Reply to `stats`.
///
/// Older servers omit some keys (`draining`, `id`, `hostname`, `os`,
/// `platform`); those fall back to their defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServerStats {
    pub current_jobs_urgent: u64,
    pub current_jobs_ready: u64,
    pub current_jobs_reserved: u64,
    pub current_jobs_delayed: u64,
    pub current_jobs_buried: u64,

    pub cmd_put: u64,
    pub cmd_peek: u64,
    pub cmd_peek_ready: u64,
    pub cmd_peek_delayed: u64,
    pub cmd_peek_buried: u64,
    pub cmd_reserve: u64,
    pub cmd_reserve_with_timeout: u64,
    pub cmd_touch: u64,
    pub cmd_use: u64,
    pub cmd_watch: u64,
    pub cmd_ignore: u64,
    pub cmd_delete: u64,
    pub cmd_release: u64,
    pub cmd_bury: u64,
    pub cmd_kick: u64,
    pub cmd_stats: u64,
    pub cmd_stats_job: u64,
    pub cmd_stats_tube: u64,
    pub cmd_list_tubes: u64,
    pub cmd_list_tube_used: u64,
    pub cmd_list_tubes_watched: u64,
    pub cmd_pause_tube: u64,

    /// cumulative count of times a job has timed out
    pub job_timeouts: u64,
    /// cumulative count of jobs created
    pub total_jobs: u64,
    /// maximum number of bytes in a job
    pub max_job_size: u64,
    pub current_tubes: u64,
    pub current_connections: u64,
    /// open connections that have issued at least one put
    pub current_producers: u64,
    /// open connections that have issued at least one reserve
    pub current_workers: u64,
    /// open connections blocked in a reserve
    pub current_waiting: u64,
    pub total_connections: u64,
    pub pid: u32,
    pub version: String,
    /// user CPU time in seconds
    pub rusage_utime: f64,
    /// system CPU time in seconds
    pub rusage_stime: f64,
    /// seconds since the server started
    pub uptime: u64,

    pub binlog_oldest_index: u64,
    /// 0 when the binlog is disabled
    pub binlog_current_index: u64,
    pub binlog_max_size: u64,
    pub binlog_records_written: u64,
    pub binlog_records_migrated: u64,

    pub draining: bool,
    /// random id generated each time the server starts
    pub id: String,
    pub hostname: String,
    pub os: String,
    pub platform: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_stats() {
        let yaml = "---\nid: 7\ntube: \"emails\"\nstate: buried\npri: 2048\n\
                    age: 31\ndelay: 0\nttr: 60\ntime-left: 0\nfile: 0\n\
                    reserves: 1\ntimeouts: 0\nreleases: 0\nburies: 1\n\
                    kicks: 0\n";
        let stats: JobStats = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(stats.id, 7);
        assert_eq!(stats.tube, "emails");
        assert_eq!(stats.state, JobState::Buried);
        assert_eq!(stats.pri, 2048);
        assert_eq!(stats.ttr, 60);
        assert_eq!(stats.buries, 1);
    }

    #[test]
    fn test_server_stats_tolerates_missing_and_extra_keys() {
        let yaml = "---\ncurrent-jobs-ready: 3\nversion: \"1.12\"\n\
                    rusage-utime: 0.012000\ncmd-reserve-job: 4\n\
                    draining: false\n";
        let stats: ServerStats = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(stats.current_jobs_ready, 3);
        assert_eq!(stats.version, "1.12");
        assert!(!stats.draining);
        assert_eq!(stats.hostname, "");
    }
}
