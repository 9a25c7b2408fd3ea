//! Process lifecycle: build state, serve, shut down within a deadline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::config::{Config, ConfigError, SHUTDOWN_TIMEOUT};
use crate::mail::{LogMailer, MailError, Mailer, SmtpMailer};
use crate::routes;
use crate::state::AppState;
use crate::tasks::BackgroundTasks;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("smtp mailer setup failed: {0}")]
    Mailer(#[from] MailError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Validate credentials and pick the mailer.
pub fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let credentials = config.credentials()?;

    let mailer: Arc<dyn Mailer> = match config.smtp()? {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "sending email over smtp");
            Arc::new(SmtpMailer::new(
                &smtp.host,
                smtp.port,
                &smtp.username,
                &smtp.password,
                &smtp.from,
            )?)
        }
        None => {
            tracing::info!("email sending disabled; messages will be logged");
            Arc::new(LogMailer::new())
        }
    };

    Ok(AppState::new(
        credentials,
        mailer,
        config.dev,
        config.contact_recipient.as_str(),
    ))
}

/// How the drain after a shutdown signal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// Every in-flight request and background task finished in time.
    Drained,
    /// The deadline passed; remaining work was left behind.
    Abandoned { pending_tasks: usize },
}

/// Build the app, bind, and serve until SIGINT/SIGTERM.
pub async fn run(config: Config) -> Result<(), StartupError> {
    let state = build_state(&config)?;
    let tasks = state.tasks.clone();
    let app = routes::app(state, &config.static_dir);

    let addr = config.address();
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(address = %format!("http://{addr}"), "application running (press ctrl+C to quit)");

    if let Shutdown::Abandoned { pending_tasks } =
        serve(listener, app, tasks, shutdown_signal(), SHUTDOWN_TIMEOUT).await?
    {
        tracing::warn!(
            pending_tasks,
            "shutdown deadline passed, abandoning unfinished work"
        );
    }

    tracing::info!("application shutdown complete");
    Ok(())
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain.
///
/// After the signal the listener stops accepting. In-flight requests and
/// background tasks get `deadline` to finish before this returns without
/// them.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    tasks: BackgroundTasks,
    shutdown: F,
    deadline: Duration,
) -> Result<Shutdown, StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
    });

    tokio::select! {
        served = &mut server => {
            served??;
            return Ok(Shutdown::Drained);
        }
        () = shutdown => {}
    }

    tracing::info!("waiting for application to shutdown");
    let _ = shutdown_tx.send(());

    let drained = tokio::time::timeout(deadline, async {
        let served = server.await;
        tasks.wait().await;
        served
    })
    .await;

    match drained {
        Ok(served) => {
            served??;
            Ok(Shutdown::Drained)
        }
        Err(_) => Ok(Shutdown::Abandoned {
            pending_tasks: tasks.active(),
        }),
    }
}

/// Drive `future` on a fresh multi-thread runtime, then drop the runtime
/// without joining blocking work still running on it.
///
/// Dropping a runtime normally waits for every `spawn_blocking` closure, which
/// would let a stuck task outlive the shutdown deadline.
pub fn block_on_detached<F: Future>(future: F) -> Result<F::Output, StartupError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cheap_hash;
    use axum::routing::get;
    use clap::Parser;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn config(extra: &[&str]) -> Config {
        let hash = cheap_hash("password");
        let mut argv = vec![
            "webstart",
            "--auth-email",
            "admin@example.com",
            "--auth-password-hash",
            hash.as_str(),
        ];
        argv.extend_from_slice(extra);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_build_state_with_log_mailer() {
        let state = build_state(&config(&[])).unwrap();
        assert_eq!(state.credentials.email(), "admin@example.com");
        assert_eq!(state.tasks.active(), 0);
    }

    #[test]
    fn test_build_state_rejects_bad_sender() {
        let result = build_state(&config(&[
            "--send-email",
            "--smtp-host",
            "smtp.example.com",
            "--smtp-port",
            "587",
            "--smtp-username",
            "user",
            "--smtp-password",
            "pass",
            "--smtp-from",
            "not a mailbox",
        ]));
        assert!(matches!(result, Err(StartupError::Mailer(_))));
    }

    #[tokio::test]
    async fn test_run_fails_when_port_is_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port().to_string();

        let result = run(config(&["--host", "127.0.0.1", "--port", port.as_str()])).await;
        assert!(matches!(result, Err(StartupError::Bind { .. })));
    }

    fn gated_task(tasks: &BackgroundTasks, name: &'static str) -> mpsc::Sender<()> {
        let (release, gate) = mpsc::channel::<()>();
        tasks.spawn_named(name, move || {
            gate.recv_timeout(Duration::from_secs(5))
                .map_err(|e| e.to_string())
        });
        release
    }

    #[tokio::test]
    async fn test_serve_waits_for_background_task() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tasks = BackgroundTasks::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);
        tasks.spawn_named("slow", move || -> Result<(), String> {
            std::thread::sleep(Duration::from_millis(300));
            flag.store(true, Ordering::SeqCst);
            Ok(())
        });

        let outcome = serve(
            listener,
            Router::new(),
            tasks.clone(),
            async {},
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Shutdown::Drained);
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(tasks.active(), 0);
    }

    #[tokio::test]
    async fn test_serve_gives_up_at_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let tasks = BackgroundTasks::new();
        let release = gated_task(&tasks, "stuck");

        let started = Instant::now();
        let outcome = serve(
            listener,
            Router::new(),
            tasks.clone(),
            async {},
            Duration::from_millis(200),
        )
        .await
        .unwrap();

        assert_eq!(outcome, Shutdown::Abandoned { pending_tasks: 1 });
        assert!(started.elapsed() < Duration::from_secs(2));
        drop(release);
    }

    #[tokio::test]
    async fn test_serve_finishes_in_flight_request() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                "done"
            }),
        );
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            app,
            BackgroundTasks::new(),
            async {
                let _ = stopped.await;
            },
            Duration::from_secs(5),
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("done"));
        assert_eq!(server.await.unwrap().unwrap(), Shutdown::Drained);
    }

    #[test]
    fn test_detached_runtime_does_not_join_abandoned_tasks() {
        let started = Instant::now();
        let release = block_on_detached(async {
            let tasks = BackgroundTasks::new();
            let release = gated_task(&tasks, "stuck");
            let waited = tokio::time::timeout(Duration::from_millis(100), tasks.wait()).await;
            assert!(waited.is_err());
            release
        })
        .unwrap();

        assert!(
            started.elapsed() < Duration::from_secs(2),
            "runtime teardown waited on an abandoned task"
        );
        drop(release);
    }
}
