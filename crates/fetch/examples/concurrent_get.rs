//! Fires several requests before reading any of them.
//!
//! Usage: `cargo run --example concurrent_get -- http://127.0.0.1:8080/a http://127.0.0.1:8080/b`

use micro_fetch::{AsyncResponse, Client, ClientError, ClientOptions, Next, TransferRequest};
use std::time::Instant;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        error!("expect at least one url");
        return Ok(());
    }

    let mut client = Client::with_options(ClientOptions::new().with_user_agent("micro-fetch-example").with_timeout_ms(5_000))?;
    client.add_middleware(|request: TransferRequest, next: Next| -> Result<AsyncResponse, ClientError> {
        info!(method = %request.method(), uri = %request.uri(), "sending");
        next.run(request)
    });

    let started = Instant::now();
    let mut responses = Vec::with_capacity(urls.len());
    for url in &urls {
        responses.push((url, client.get(url)?));
    }
    info!(elapsed = ?started.elapsed(), count = responses.len(), "all transfers registered");

    for (url, response) in &mut responses {
        match response.body().await {
            Ok(body) => info!(%url, status = %response.status().await?, bytes = body.len(), "done"),
            Err(e) => error!(%url, cause = %e, "failed"),
        }
    }
    info!(elapsed = ?started.elapsed(), "all responses read");

    Ok(())
}
