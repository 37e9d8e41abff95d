//! Server lifecycle controller.
//!
//! Explicit state machine `Idle → Listening → Draining → Stopped`, driven by
//! one external cancellation signal. No state is ever skipped: Draining runs
//! even when cancellation arrives before the server started listening, so
//! cleanup hooks always execute, and Stopped is only reached once the socket
//! is closed.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lifecycle states, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Listening,
    Draining,
    Stopped,
}

type CleanupHook = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Owns the listening socket and the shutdown sequence.
pub struct HttpServer {
    listener: TcpListener,
    grace: Duration,
    state_tx: watch::Sender<LifecycleState>,
    cleanup: Vec<CleanupHook>,
}

impl HttpServer {
    /// Bind the socket. The controller is Idle until [`HttpServer::run`]
    /// starts accepting.
    pub async fn bind(host: &str, port: u16, grace: Duration) -> anyhow::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let (state_tx, _) = watch::channel(LifecycleState::Idle);
        Ok(Self {
            listener,
            grace,
            state_tx,
            cleanup: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Observe state transitions (tests, health reporting).
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state_tx.subscribe()
    }

    /// Register a hook to run during Draining, after in-flight requests had
    /// their chance to finish and before Stopped is reached.
    pub fn on_cleanup<F>(&mut self, hook: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cleanup.push(Box::pin(hook));
    }

    /// Serve until the cancellation token fires, then drain and stop.
    ///
    /// Draining waits up to the grace deadline for in-flight connections;
    /// handlers are never aborted, they are simply no longer waited for once
    /// the deadline elapses. Returns once Stopped is reached and the socket
    /// is closed.
    pub async fn run(self, app: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
        let Self {
            listener,
            grace,
            state_tx,
            cleanup,
        } = self;

        // Cancelled before we ever listened: close the socket and walk the
        // remaining states without serving a single request.
        if shutdown.is_cancelled() {
            drop(listener);
            finalize(&state_tx, cleanup).await;
            return Ok(());
        }

        let addr = listener.local_addr()?;
        let _ = state_tx.send(LifecycleState::Listening);
        info!(addr = %addr, "Listening");

        let drain = shutdown.clone();
        let mut serve = std::pin::pin!(
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { drain.cancelled().await })
                .into_future()
        );

        // An accept-loop failure is reported only after the shutdown
        // sequence below; Draining, the cleanup hooks, and Stopped run on
        // every exit path.
        let mut outcome: anyhow::Result<()> = Ok(());
        tokio::select! {
            result = &mut serve => {
                if let Err(e) = result {
                    outcome = Err(e.into());
                }
            }
            _ = shutdown.cancelled() => {
                let _ = state_tx.send(LifecycleState::Draining);
                info!(grace_ms = grace.as_millis() as u64, "Draining in-flight requests");
                match tokio::time::timeout(grace, &mut serve).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => outcome = Err(e.into()),
                    Err(_) => {
                        warn!("Grace deadline elapsed with connections still open");
                    }
                }
            }
        }

        finalize(&state_tx, cleanup).await;
        info!("Stopped");
        outcome
    }
}

/// Draining (if not already published), cleanup hooks, then Stopped.
async fn finalize(state_tx: &watch::Sender<LifecycleState>, cleanup: Vec<CleanupHook>) {
    // Cancellation may have raced the accept loop; make sure Draining is
    // observed before Stopped either way.
    if *state_tx.borrow() != LifecycleState::Draining {
        let _ = state_tx.send(LifecycleState::Draining);
    }
    run_cleanup(cleanup).await;
    let _ = state_tx.send(LifecycleState::Stopped);
}

async fn run_cleanup(hooks: Vec<CleanupHook>) {
    for hook in hooks {
        hook.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // `run` funnels every exit — graceful shutdown, pre-listen
    // cancellation, and accept-loop failure alike — through `finalize`, so
    // the walk below is what an erroring server performs too.
    #[tokio::test]
    async fn finalize_walks_draining_then_stopped_around_hooks() {
        let (state_tx, state_rx) = watch::channel(LifecycleState::Listening);

        let seen = Arc::new(Mutex::new(None));
        let hook = {
            let seen = Arc::clone(&seen);
            let state_rx = state_rx.clone();
            Box::pin(async move {
                *seen.lock().unwrap() = Some(*state_rx.borrow());
            }) as CleanupHook
        };

        finalize(&state_tx, vec![hook]).await;

        assert_eq!(*seen.lock().unwrap(), Some(LifecycleState::Draining));
        assert_eq!(*state_rx.borrow(), LifecycleState::Stopped);
    }
}
