//! Widget crawl demonstration.
//!
//! Spins up an embedded document server with a small widget tree and
//! crawls it with both built-in plans:
//! - Direct: GetDocument → GetWidgetContainer → GetWidgetProperties
//! - Fields summary: adds the GetFieldsSummary hop
//!
//! Usage:
//!   cargo run --example crawl_widgets
//!   cargo run --example crawl_widgets -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

use widget_crawler::{Crawler, DocumentId, TraversalPlan};

// ============================================================================
// Constants
// ============================================================================

/// Document served by the embedded server.
const DOCUMENT_ID: u64 = 7;

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let debug = std::env::args().any(|arg| arg == "--debug");
    init_logging(debug);

    if let Err(e) = run().await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    println!("=== Widget crawl ===\n");

    // ========================================================================
    // Setup
    // ========================================================================

    println!("[Setup] Starting embedded document server...");
    let url = start_document_server().await?;
    println!("        ✓ Serving {url}\n");

    let document = DocumentId::new(DOCUMENT_ID);

    // ========================================================================
    // Direct plan
    // ========================================================================

    println!("[1] Crawl document {} with the direct plan...", document.value());

    let crawler = Crawler::builder()
        .url(&url)
        .timeout(Duration::from_secs(10))
        .build()?;

    let widgets = crawler.try_crawl(document).await?;
    println!("    ✓ {} widgets", widgets.len());
    for widget in &widgets {
        println!("      {widget}");
    }
    println!();

    // ========================================================================
    // Fields-summary plan
    // ========================================================================

    println!("[2] Crawl with the fields-summary plan...");

    let crawler = Crawler::builder()
        .url(&url)
        .timeout(Duration::from_secs(10))
        .plan(TraversalPlan::with_fields_summary())
        .build()?;

    let widgets = crawler.try_crawl(document).await?;
    println!("    ✓ {} widgets", widgets.len());
    for widget in &widgets {
        println!("      {widget}");
    }
    println!();

    // ========================================================================
    // Failure handling
    // ========================================================================

    println!("[3] Observe a failure with try_crawl...");

    let dead = Crawler::builder()
        .url("ws://127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .build()?;

    match dead.try_crawl(document).await {
        Ok(_) => println!("    unexpected success"),
        Err(error) => println!("    ✗ {error}"),
    }
    println!();

    println!("[4] The crawl entry point suppresses the same failure...");
    let widgets = dead.crawl(document).await;
    println!("    ✓ {} widgets\n", widgets.len());

    println!("=== Done ===");
    Ok(())
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "widget_crawler=debug"
    } else {
        "widget_crawler=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Embedded Document Server
// ============================================================================

/// Binds the demo server and returns its ws:// URL.
///
/// The document answers both dialects: it carries the container list
/// directly and advertises widgets for the fields-summary hop.
async fn start_document_server() -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(serve_channel(stream));
        }
    });

    Ok(format!("ws://{addr}"))
}

/// Serves one crawl session over one channel.
async fn serve_channel(stream: TcpStream) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let Some(result) = respond(&request) else {
            continue;
        };

        let reply = json!({"id": request["id"].clone(), "result": result}).to_string();
        if ws.send(Message::Text(reply.into())).await.is_err() {
            return;
        }
    }
}

/// Maps one request to its reply payload.
fn respond(request: &Value) -> Option<Value> {
    match request["method"].as_str()? {
        "GetDocument" => Some(json!({
            "id": DOCUMENT_ID,
            "type": "slide",
            "hasWidgets": true,
            "widgetContainerIds": [101, 102, 103],
        })),
        "GetFieldsSummary" => Some(json!({
            "fields": [{"id": 101}, {"id": 102}, {"id": 103}],
        })),
        "GetWidgetContainer" => {
            let container = request["params"]["id"].as_u64()?;
            Some(json!({"id": container * 10}))
        }
        "GetWidgetProperties" => {
            let widget = request["params"]["id"].as_u64()?;
            let kind = match widget {
                1010 => "chart",
                1020 => "table",
                _ => "gauge",
            };
            Some(json!({
                "widgetId": widget,
                "kind": kind,
                "properties": {"widgetId": widget, "kind": kind},
            }))
        }
        _ => None,
    }
}
