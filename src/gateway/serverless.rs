//! Serverless entry point.
//!
//! Reads one API-Gateway proxy event per line and writes one proxy response
//! per line, so the binary can sit behind a function runtime shim that speaks
//! newline-delimited JSON.

use crate::error::Result;
use crate::gateway::{Gateway, GatewayResponse, ProxyRequest, ProxyResponse};
use crate::protocol::LineChannel;
use serde_json::json;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Handle one raw event.
pub async fn handle_event(gateway: &Gateway, event: &str, cancel: CancellationToken) -> ProxyResponse {
    let started = Instant::now();

    let event: ProxyRequest = match serde_json::from_str(event) {
        Ok(event) => event,
        Err(e) => {
            warn!("Malformed proxy event: {}", e);
            return GatewayResponse::json(
                400,
                &json!({ "error": "invalid_event", "error_description": e.to_string() }),
            )
            .into();
        }
    };

    info!(
        path = %event.path,
        http_method = %event.http_method,
        body_length = event.body.as_ref().map_or(0, String::len),
        "Serverless request received"
    );

    let response = gateway.handle(event.into(), cancel).await;

    info!(
        status = response.status,
        duration_ms = started.elapsed().as_millis() as u64,
        response_size = response.body.len(),
        "Serverless request completed"
    );

    response.into()
}

/// Process events from `channel` until EOF or `shutdown`. Returns how many were handled.
pub async fn run<R, W>(
    gateway: &Gateway,
    channel: &LineChannel<R, W>,
    shutdown: CancellationToken,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut handled = 0;

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = channel.read_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        let response = handle_event(gateway, &line, shutdown.child_token()).await;
        match serde_json::to_string(&response) {
            Ok(out) => channel.write_line(&out).await?,
            Err(e) => error!("Failed to encode proxy response: {}", e),
        }
        handled += 1;
    }

    info!("Serverless loop finished after {} events", handled);
    Ok(handled)
}

pub async fn run_stdio(gateway: &Gateway, shutdown: CancellationToken) -> Result<usize> {
    let channel = LineChannel::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    run(gateway, &channel, shutdown).await
}
