use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(about, long_about = None, version)]
pub(crate) struct Args {
    /// Host name or address of the server.
    #[arg(
        short = 'H',
        long,
        env = "BEANSTALKD_HOST",
        default_value = "127.0.0.1"
    )]
    pub(crate) host: String,
    /// (TCP) port the server listens on.
    #[arg(short, long, env = "BEANSTALKD_PORT", default_value_t = 11300)]
    pub(crate) port: u16,
    /// Enables human-friendly logging.
    #[arg(short, long, default_value_t)]
    pub(crate) debug: bool,
    #[command(subcommand)]
    pub(crate) command: Cmd,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Cmd {
    /// Queues a job, printing its ID.
    Put {
        /// Tube to put the job on.
        #[arg(short, long, default_value = "default")]
        tube: String,
        /// Priority; lower values are reserved first.
        #[arg(long, default_value_t = 1024)]
        pri: u32,
        /// Seconds before the job becomes ready.
        #[arg(long, default_value_t = 0)]
        delay: u32,
        /// Seconds a worker may hold the job before it is released.
        #[arg(long, default_value_t = 60)]
        ttr: u32,
        body: String,
    },
    /// Reserves one job and prints it.
    Reserve {
        #[arg(short, long, default_value = "default")]
        tube: String,
        /// Seconds to wait for a job.
        #[arg(long, default_value_t = 0)]
        timeout: u32,
        /// Deletes the job once printed, rather than leaving it reserved
        /// until this client disconnects.
        #[arg(long, default_value_t)]
        delete: bool,
    },
    /// Prints a job without reserving it.
    Peek { id: u64 },
    Delete { id: u64 },
    /// Moves a buried or delayed job to the ready queue.
    KickJob { id: u64 },
    StatsJob { id: u64 },
    StatsTube { tube: String },
    Stats,
    ListTubes,
    /// Reserves and prints jobs from the given tubes until interrupted,
    /// deleting (or burying) each one.
    Work {
        #[arg(required = true)]
        tubes: Vec<String>,
        /// Seconds each reserve waits before checking for shutdown.
        #[arg(long, default_value_t = 1)]
        timeout: u32,
        /// Buries jobs instead of deleting them.
        #[arg(long, default_value_t)]
        bury: bool,
    },
}
