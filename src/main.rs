//! agent-link - console client for a streaming assistant backend
//!
//! Reads prompts from stdin and prints the conversation as it streams in.

use agent_link::config::{Config, LogFormat};
use agent_link::console::{print_snapshots, Input};
use agent_link::session::{Session, SessionRuntime};
use agent_link::transport::Transport;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    tracing::info!(
        endpoint = %config.endpoint,
        reconnect_delay = ?config.reconnect_delay,
        "Starting agent-link"
    );

    let mut transport = Transport::websocket(config.reconnect_delay);
    let shutdown = CancellationToken::new();
    let (runtime, handle) = SessionRuntime::new(
        Session::new(transport.sender()),
        transport.subscribe(),
        transport.status(),
        shutdown.clone(),
    );

    transport.connect(config.endpoint.as_str())?;
    let runtime_task = tokio::spawn(runtime.run());
    let render_task = tokio::spawn(print_snapshots(handle.snapshots(), tokio::io::stdout()));

    let mut lines = spawn_stdin_reader();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                }
                break;
            }
            line = lines.recv() => match line {
                Some(Ok(line)) => match Input::parse(&line) {
                    Input::Quit => break,
                    Input::Command(command) => {
                        if !handle.send(command).await {
                            break;
                        }
                    }
                },
                Some(Err(e)) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    break;
                }
                None => break,
            },
        }
    }

    tracing::info!("Shutting down");
    transport.close().await;
    shutdown.cancel();
    if let Err(e) = runtime_task.await {
        tracing::error!(error = %e, "Session runtime failed");
    }
    drop(handle);
    match render_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Failed to write to stdout"),
        Err(e) => tracing::error!(error = %e, "Renderer failed"),
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agent_link=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout belongs to the conversation
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Read stdin on a plain thread so a blocked read never holds up shutdown
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
