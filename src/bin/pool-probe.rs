use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use conn_pool::{Pool, PoolConfig, PoolError, common, factory};
use eyre::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Borrow and return TCP connections through a pool
#[derive(Parser, Debug)]
struct Args {
    /// Address of an echo service to dial
    #[arg(long, default_value = "127.0.0.1:7878")]
    addr: SocketAddr,

    /// Serve a local echo service on `addr` instead of dialing an existing one
    #[arg(long)]
    echo: bool,

    #[arg(long, default_value_t = 2)]
    initial_size: usize,

    #[arg(long, default_value_t = 4)]
    max_capacity: usize,

    /// Concurrent borrowers
    #[arg(long, default_value_t = 8)]
    workers: usize,

    /// Borrow/echo/release rounds per worker
    #[arg(long, default_value_t = 32)]
    rounds: usize,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    common::initialize_logging()?;
    let args = Args::parse();

    if args.echo {
        let listener = TcpListener::bind(args.addr)
            .await
            .wrap_err("binding echo listener")?;
        info!(addr = %args.addr, "serving echo");
        tokio::spawn(serve_echo(listener));
    }

    let dials = Arc::new(AtomicUsize::new(0));
    let addr = args.addr;
    let dial_count = Arc::clone(&dials);
    let pool = Pool::with_config(
        PoolConfig::new(args.initial_size, args.max_capacity),
        factory(move || {
            dial_count.fetch_add(1, Ordering::Relaxed);
            TcpStream::connect(addr)
        }),
    )
    .await
    .wrap_err("creating pool")?;

    let mut workers = JoinSet::new();
    for worker in 0..args.workers {
        let pool = pool.clone();
        let rounds = args.rounds;
        workers.spawn(async move { run_worker(worker, pool, rounds).await });
    }
    while let Some(res) = workers.join_next().await {
        res.wrap_err("worker panicked")??;
    }

    let status = pool.status();
    info!(
        idle = status.idle,
        max_capacity = status.max_capacity,
        dials = dials.load(Ordering::Relaxed),
        rounds = args.workers * args.rounds,
        "done"
    );
    pool.close();
    Ok(())
}

async fn run_worker(worker: usize, pool: Pool<TcpStream>, rounds: usize) -> eyre::Result<()> {
    let mut buf = [0u8; 8];
    for round in 0..rounds {
        let mut conn = pool.get().await.wrap_err("borrowing connection")?;
        let msg = (round as u64).to_be_bytes();

        let res = async {
            conn.write_all(&msg).await?;
            conn.read_exact(&mut buf).await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        match res {
            Ok(()) if buf == msg => {}
            Ok(()) => {
                warn!(worker, round, "echo mismatch, discarding connection");
                conn.mark_unusable();
            }
            Err(err) => {
                warn!(worker, round, %err, "i/o error, discarding connection");
                conn.mark_unusable();
            }
        }

        match conn.release() {
            Ok(()) => {}
            Err(PoolError::Full) => debug!(worker, "pool full, connection closed"),
            Err(err) => return Err(err).wrap_err("returning connection"),
        }
    }
    Ok(())
}

async fn serve_echo(listener: TcpListener) {
    loop {
        let (mut stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        debug!(%peer, "accepted");
        tokio::spawn(async move {
            let (mut read, mut write) = stream.split();
            if let Err(err) = tokio::io::copy(&mut read, &mut write).await {
                debug!(%peer, %err, "echo connection ended");
            }
        });
    }
}
