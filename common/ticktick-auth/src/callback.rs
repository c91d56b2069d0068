//! One-shot loopback listener for the OAuth redirect
//!
//! The receiver binds before the browser is opened so the redirect can never
//! arrive ahead of the listener. The first `code` that reaches the redirect
//! path is handed to the waiting flow through a one-shot channel owned by
//! this receiver; later callbacks get the success page but are ignored.
//!
//! The listener is torn down on every exit path: after
//! [`wait_for_code`](CallbackReceiver::wait_for_code) returns (code or
//! timeout) and when the receiver is dropped.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};

/// How long shutdown waits for open connections before aborting the server
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>TickTick MCP Server - Authentication Successful</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; text-align: center; }
        h1 { color: #4CAF50; }
        .box { border: 1px solid #ddd; border-radius: 5px; padding: 20px; margin-top: 20px; background-color: #f9f9f9; }
    </style>
</head>
<body>
    <h1>Authentication Successful!</h1>
    <div class="box">
        <p>You have successfully authenticated with TickTick.</p>
        <p>You can now close this window and return to the terminal.</p>
    </div>
</body>
</html>"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>TickTick MCP Server - Authentication Failed</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; text-align: center; }
        h1 { color: #f44336; }
        .box { border: 1px solid #ddd; border-radius: 5px; padding: 20px; margin-top: 20px; background-color: #f9f9f9; }
    </style>
</head>
<body>
    <h1>Authentication Failed</h1>
    <div class="box">
        <p>Failed to receive authorization code from TickTick.</p>
        <p>Please try again or check the error message in the terminal.</p>
    </div>
</body>
</html>"#;

/// Write-once slot for the captured code
#[derive(Clone)]
struct CallbackState {
    sender: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

impl CallbackState {
    /// Hand the code to the waiting flow; false if one was already captured
    fn capture(&self, code: String) -> bool {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => tx.send(code).is_ok(),
            None => false,
        }
    }
}

enum WaitOutcome {
    Code(String),
    Closed,
    Elapsed,
}

/// Local HTTP listener that captures a single authorization code
pub struct CallbackReceiver {
    addr: SocketAddr,
    path: String,
    code_rx: Option<oneshot::Receiver<String>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl CallbackReceiver {
    /// Bind the loopback listener and start serving `path`
    ///
    /// Port 0 binds an ephemeral port; see [`port`](Self::port).
    pub async fn bind(port: u16, path: &str) -> AuthResult<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| AuthError::Listener { port, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| AuthError::Listener { port, source })?;

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let (code_tx, code_rx) = oneshot::channel::<String>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CallbackState {
            sender: Arc::new(Mutex::new(Some(code_tx))),
        };
        let app = Router::new()
            .route(&path, get(handle_callback))
            .with_state(state);

        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                warn!("callback listener stopped with error: {}", e);
            }
        });

        info!(%addr, path = %path, "OAuth callback listener started");

        Ok(Self {
            addr,
            path,
            code_rx: Some(code_rx),
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        })
    }

    /// Port actually bound
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Redirect path being served
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wait for the first authorization code, then stop the listener
    ///
    /// The listener is shut down and its port released before this returns,
    /// whether a code arrived or the timeout elapsed.
    pub async fn wait_for_code(mut self, timeout: Duration) -> AuthResult<String> {
        let outcome = match self.code_rx.take() {
            Some(rx) => match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(code)) => WaitOutcome::Code(code),
                Ok(Err(_)) => WaitOutcome::Closed,
                Err(_) => WaitOutcome::Elapsed,
            },
            None => WaitOutcome::Closed,
        };

        self.shutdown().await;

        match outcome {
            WaitOutcome::Code(code) => Ok(code),
            WaitOutcome::Closed => {
                warn!("callback listener exited before a code was captured");
                Err(AuthError::TimedOut)
            }
            WaitOutcome::Elapsed => {
                warn!(timeout_secs = timeout.as_secs(), "timed out waiting for OAuth callback");
                Err(AuthError::TimedOut)
            }
        }
    }

    /// Stop the listener without waiting for a code
    ///
    /// Returns once the port is released.
    pub async fn close(mut self) {
        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                debug!("callback listener did not drain in time, aborting");
                handle.abort();
                let _ = handle.await;
            }
        }
        debug!(addr = %self.addr, "OAuth callback listener stopped");
    }
}

impl Drop for CallbackReceiver {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    match params.get("code").filter(|c| !c.is_empty()) {
        Some(code) => {
            if state.capture(code.clone()) {
                info!("authorization code received");
            } else {
                debug!("ignoring repeated OAuth callback");
            }
            (StatusCode::OK, Html(SUCCESS_HTML))
        }
        None => {
            match params.get("error") {
                Some(error) => warn!(
                    error = %error,
                    description = params.get("error_description").map(String::as_str).unwrap_or(""),
                    "provider redirected with an error"
                ),
                None => warn!("OAuth callback without code parameter"),
            }
            (StatusCode::BAD_REQUEST, Html(ERROR_HTML))
        }
    }
}
