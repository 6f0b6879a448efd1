mod args;

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use beanstalk_client::{Connection, Error, Job, Message};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Level};

use crate::args::{Args, Cmd};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Logging goes to stderr, leaving stdout for command output.
    if args.debug {
        tracing_subscriber::fmt()
            .with_max_level(Level::TRACE)
            .with_writer(io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt().json().with_writer(io::stderr).init();
    }

    if let Err(error) = run(args).await {
        error!(error = %format!("{error:#}"), "command failed");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(args: Args) -> Result<()> {
    let conn = Connection::connect((args.host.as_str(), args.port))
        .await
        .with_context(|| format!("connecting to {}:{}", args.host, args.port))?;

    match args.command {
        Cmd::Put {
            tube,
            pri,
            delay,
            ttr,
            body,
        } => {
            conn.use_tube(tube).await.context("selecting tube")?;
            println!("{}", conn.put(pri, delay, ttr, body).await?);
        },
        Cmd::Reserve {
            tube,
            timeout,
            delete,
        } => {
            watch_only(&conn, &[tube]).await?;
            let job = conn.reserve_with_timeout(timeout).await?;
            print_job(&job);
            if delete {
                job.delete().await?;
            }
        },
        Cmd::Peek { id } => print_job(&conn.peek(id).await?),
        Cmd::Delete { id } => conn.delete(id).await?,
        Cmd::KickJob { id } => conn.kick_job(id).await?,
        Cmd::StatsJob { id } => println!("{:#?}", conn.stats_job(id).await?),
        Cmd::StatsTube { tube } => {
            println!("{:#?}", conn.stats_tube(tube).await?)
        },
        Cmd::Stats => println!("{:#?}", conn.stats().await?),
        Cmd::ListTubes => {
            for tube in conn.list_tubes().await? {
                println!("{tube}");
            }
        },
        Cmd::Work {
            tubes,
            timeout,
            bury,
        } => work(&conn, &tubes, timeout, bury).await?,
    }

    conn.quit().await.context("during quit")
}

/// Replaces the watch list (initially just `default`) with `tubes`.
async fn watch_only(conn: &Connection, tubes: &[String]) -> Result<()> {
    for tube in tubes {
        conn.watch(tube.as_str())
            .await
            .with_context(|| format!("watching {tube}"))?;
    }

    if !tubes.iter().any(|tube| tube == "default") {
        conn.ignore("default").await.context("ignoring default")?;
    }

    Ok(())
}

/// Drains jobs from `tubes` until ctrl-c. Reserves use a short timeout so
/// shutdown is noticed between commands, never part way through one.
async fn work(
    conn: &Connection,
    tubes: &[String],
    timeout: u32,
    bury: bool,
) -> Result<()> {
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(error) = signal::ctrl_c().await {
                warn!(%error, "something strange with ctrl-c handling!");
            };
            cancel.cancel();
        });
    }

    watch_only(conn, tubes).await?;
    info!(?tubes, "waiting for jobs");

    while !cancel.is_cancelled() {
        let job = match conn.reserve_with_timeout(timeout).await {
            Ok(job) => job,
            Err(Error::TimedOut) => continue,
            // One of our own reservations is about to lapse; as each job is
            // finished before the next reserve, there's nothing to do.
            Err(Error::DeadlineSoon) => {
                debug!("deadline soon");
                continue;
            },
            Err(error) => return Err(error.into()),
        };

        print_job(&job);

        if bury {
            job.bury().await?;
        } else {
            job.delete().await?;
        }
        info!(id = job.id(), bury, "finished job");
    }

    info!("shutting down");

    Ok(())
}

fn print_job(job: &Job) {
    match job.message() {
        Message::Json(value) => println!("{}\t{value}", job.id()),
        Message::Text(text) => println!("{}\t{text}", job.id()),
        Message::Binary(bytes) => {
            println!("{}\t<{} bytes of binary data>", job.id(), bytes.len())
        },
    }
}
