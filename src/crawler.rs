//! Crawl entry points and configuration.
//!
//! A [`Crawler`] holds everything that outlives a single crawl: the
//! server URL, the traversal plan, and the overall session deadline.
//! Each call to [`Crawler::crawl`] or [`Crawler::try_crawl`] opens a
//! fresh channel, runs one session to completion, and tears the
//! channel down; no state is shared between crawls.
//!
//! # Example
//!
//! ```no_run
//! use widget_crawler::{Crawler, DocumentId};
//!
//! # async fn example() -> widget_crawler::Result<()> {
//! let crawler = Crawler::builder()
//!     .url("ws://127.0.0.1:9222")
//!     .build()?;
//!
//! // Suppressing entry point: failures become an empty list.
//! let widgets = crawler.crawl(DocumentId::new(42)).await;
//! println!("{} widgets", widgets.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, RequestIdGenerator};
use crate::session::CorrelationTable;
use crate::session::engine;
use crate::transport;
use crate::traversal::TraversalPlan;

// ============================================================================
// Constants
// ============================================================================

/// Default overall deadline for one crawl session (60s).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Crawler
// ============================================================================

/// Widget-tree crawler for one document server.
///
/// Use [`Crawler::new`] for a default-configured crawler, or
/// [`Crawler::builder()`] to adjust the plan and deadline. The crawler
/// is cheap to clone and holds no connection; every crawl opens its
/// own channel under its own deadline.
#[derive(Debug, Clone)]
pub struct Crawler {
    /// WebSocket URL of the document server.
    url: Url,
    /// Overall deadline for one session.
    timeout: Duration,
    /// Traversal plan driving the session.
    plan: TraversalPlan,
}

impl Crawler {
    /// Creates a crawler for the given server URL with default settings.
    ///
    /// Shorthand for `Crawler::builder().url(url).build()`: the direct
    /// plan, the default deadline, and the same URL validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is unparseable or not a ws:// or
    ///   wss:// URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::builder().url(url).build()
    }

    /// Creates a new crawler builder with no configuration.
    #[inline]
    #[must_use]
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::new()
    }

    /// Returns the configured server URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the configured session deadline.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the configured traversal plan.
    #[inline]
    #[must_use]
    pub fn plan(&self) -> &TraversalPlan {
        &self.plan
    }

    /// Crawls a document's widget tree, suppressing every failure.
    ///
    /// Returns the widget payloads in reply-arrival order, or an empty
    /// list if the crawl failed for any reason (unreachable server,
    /// dropped channel, deadline expiry). The failure is logged, never
    /// surfaced. Use [`Crawler::try_crawl`] to observe errors.
    pub async fn crawl(&self, document: DocumentId) -> Vec<Value> {
        match self.try_crawl(document).await {
            Ok(widgets) => widgets,
            Err(error) => {
                warn!(%document, %error, "Crawl failed; returning no widgets");
                Vec::new()
            }
        }
    }

    /// Crawls a document's widget tree, propagating failures.
    ///
    /// Opens a channel, runs one session under the configured deadline,
    /// and returns the widget payloads in reply-arrival order. A
    /// document outside the plan's scope (wrong type, no widgets)
    /// yields `Ok` with an empty list, not an error.
    ///
    /// On deadline expiry the session future is dropped, which cancels
    /// both loops at their next suspension point and abandons the
    /// channel without a close handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] if the server is unreachable
    /// - [`Error::ChannelClosed`] if the channel ends mid-traversal
    /// - [`Error::SessionTimeout`] if the deadline expires
    /// - [`Error::WebSocket`] on transport failure
    pub async fn try_crawl(&self, document: DocumentId) -> Result<Vec<Value>> {
        debug!(%document, plan = self.plan.name(), "Starting crawl");

        let (mut sink, mut source) = transport::connect(&self.url).await?;

        let table = CorrelationTable::new();
        let ids = RequestIdGenerator::new();

        let session =
            engine::run_session(&mut sink, &mut source, &self.plan, document, &ids, &table);

        match timeout(self.timeout, session).await {
            Ok(session_result) => {
                let widgets = session_result?;
                debug!(%document, widgets = widgets.len(), "Crawl finished");
                Ok(widgets)
            }
            Err(_) => {
                warn!(
                    %document,
                    timeout_ms = self.timeout.as_millis() as u64,
                    pending = table.pending_count(),
                    "Crawl timed out"
                );
                Err(Error::session_timeout(self.timeout.as_millis() as u64))
            }
        }
    }
}

// ============================================================================
// CrawlerBuilder
// ============================================================================

/// Builder for configuring a [`Crawler`] instance.
///
/// Use [`Crawler::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct CrawlerBuilder {
    /// Raw server URL, validated at build time.
    url: Option<String>,
    /// Overall session deadline; defaults to [`DEFAULT_TIMEOUT`].
    timeout: Option<Duration>,
    /// Traversal plan; defaults to [`TraversalPlan::direct`].
    plan: TraversalPlan,
}

impl CrawlerBuilder {
    /// Creates a new crawler builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WebSocket URL of the document server.
    ///
    /// # Arguments
    ///
    /// * `url` - Server URL (e.g., "ws://127.0.0.1:9222")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the overall deadline for one crawl session.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Maximum wall-clock time for the whole session
    #[inline]
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the traversal plan.
    ///
    /// # Arguments
    ///
    /// * `plan` - Plan matching the server's dialect
    #[inline]
    #[must_use]
    pub fn plan(mut self, plan: TraversalPlan) -> Self {
        self.plan = plan;
        self
    }

    /// Builds the crawler with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is missing, unparseable, not a
    ///   ws:// or wss:// URL, or the timeout is zero
    pub fn build(self) -> Result<Crawler> {
        let url = self.validate_url()?;
        let timeout = self.validate_timeout()?;

        Ok(Crawler {
            url,
            timeout,
            plan: self.plan,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl CrawlerBuilder {
    /// Validates the server URL configuration.
    fn validate_url(&self) -> Result<Url> {
        let raw = self.url.as_ref().ok_or_else(|| {
            Error::config(
                "Server URL is required. Use .url() to set it.\n\
                 Example: Crawler::builder().url(\"ws://127.0.0.1:9222\")",
            )
        })?;

        let url = Url::parse(raw)
            .map_err(|error| Error::config(format!("Invalid server URL '{raw}': {error}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            scheme => Err(Error::config(format!(
                "Unsupported URL scheme '{scheme}': the server URL must use ws:// or wss://"
            ))),
        }
    }

    /// Validates the deadline configuration.
    fn validate_timeout(&self) -> Result<Duration> {
        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        if timeout.is_zero() {
            return Err(Error::config(
                "Session timeout must be greater than zero. Use .timeout() with a positive duration.",
            ));
        }

        Ok(timeout)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    // ------------------------------------------------------------------------
    // Server fixtures
    // ------------------------------------------------------------------------

    /// Binds a document server that answers every stage for one crawl.
    ///
    /// The `GetDocument` reply carries `document_result`; the remaining
    /// stages follow the canonical two-widget shape (containers 7 and 8,
    /// widgets 70 and 80).
    async fn spawn_document_server(document_result: Value) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            while let Some(message) = ws.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(_) => continue,
                    Err(_) => break,
                };

                let request: Value = serde_json::from_str(&text).expect("request json");
                let id = request["id"].clone();
                let result = match request["method"].as_str() {
                    Some("GetDocument") => document_result.clone(),
                    Some("GetFieldsSummary") => json!({"fields": [{"id": 7}, {"id": 8}]}),
                    Some("GetWidgetContainer") => {
                        let container = request["params"]["id"].as_u64().expect("container id");
                        json!({"id": container * 10})
                    }
                    Some("GetWidgetProperties") => {
                        let widget = request["params"]["id"].as_u64().expect("widget id");
                        json!({"widgetId": widget, "properties": {"widgetId": widget}})
                    }
                    _ => continue,
                };

                let reply = json!({"id": id, "result": result}).to_string();
                if ws.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
        });

        Url::parse(&format!("ws://{addr}")).expect("server url")
    }

    /// Binds a server that accepts the channel but never replies.
    async fn spawn_silent_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            while let Some(message) = ws.next().await {
                if message.is_err() {
                    break;
                }
            }
        });

        Url::parse(&format!("ws://{addr}")).expect("server url")
    }

    /// Returns a URL with a live port that nothing listens on.
    async fn unreachable_url() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        Url::parse(&format!("ws://{addr}")).expect("url")
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    #[test]
    fn test_builder_defaults() {
        let crawler = Crawler::builder()
            .url("ws://127.0.0.1:9222")
            .build()
            .expect("build");

        assert_eq!(crawler.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(crawler.plan().name(), "direct");
        assert_eq!(crawler.url().as_str(), "ws://127.0.0.1:9222/");
    }

    #[test]
    fn test_new_uses_defaults() {
        let crawler = Crawler::new("ws://127.0.0.1:9222").expect("new");

        assert_eq!(crawler.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(crawler.plan().name(), "direct");
        assert_eq!(crawler.url().as_str(), "ws://127.0.0.1:9222/");
    }

    #[test]
    fn test_new_validates_the_url() {
        let err = Crawler::new("http://127.0.0.1:9222").expect_err("wrong scheme");

        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_builder_sets_timeout_and_plan() {
        let crawler = Crawler::builder()
            .url("wss://docs.example.com/channel")
            .timeout(Duration::from_secs(5))
            .plan(TraversalPlan::with_fields_summary())
            .build()
            .expect("build");

        assert_eq!(crawler.timeout(), Duration::from_secs(5));
        assert_eq!(crawler.plan().name(), "fields-summary");
    }

    #[test]
    fn test_build_fails_without_url() {
        let result = Crawler::builder().build();

        let err = result.expect_err("missing URL");
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("URL is required"));
    }

    #[test]
    fn test_build_fails_on_unparseable_url() {
        let result = Crawler::builder().url("not a url").build();

        let err = result.expect_err("bad URL");
        assert!(err.to_string().contains("Invalid server URL"));
    }

    #[test]
    fn test_build_fails_on_non_websocket_scheme() {
        let result = Crawler::builder().url("http://127.0.0.1:9222").build();

        let err = result.expect_err("wrong scheme");
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_build_fails_on_zero_timeout() {
        let result = Crawler::builder()
            .url("ws://127.0.0.1:9222")
            .timeout(Duration::ZERO)
            .build();

        let err = result.expect_err("zero timeout");
        assert!(matches!(err, Error::Config { .. }));
    }

    // ------------------------------------------------------------------------
    // Crawls against a live server
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_try_crawl_direct_plan() {
        let url = spawn_document_server(json!({
            "type": "slide",
            "widgetContainerIds": [7, 8]
        }))
        .await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_secs(5))
            .build()
            .expect("build");

        let widgets = crawler
            .try_crawl(DocumentId::new(42))
            .await
            .expect("crawl succeeds");

        assert_eq!(widgets.len(), 2);
        assert_eq!(widgets[0]["widgetId"], json!(70));
        assert_eq!(widgets[1]["widgetId"], json!(80));
    }

    #[tokio::test]
    async fn test_try_crawl_fields_summary_plan() {
        let url = spawn_document_server(json!({
            "id": 42,
            "hasWidgets": true
        }))
        .await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_secs(5))
            .plan(TraversalPlan::with_fields_summary())
            .build()
            .expect("build");

        let widgets = crawler
            .try_crawl(DocumentId::new(42))
            .await
            .expect("crawl succeeds");

        assert_eq!(
            widgets,
            vec![json!({"widgetId": 70}), json!({"widgetId": 80})]
        );
    }

    #[tokio::test]
    async fn test_try_crawl_non_gui_document_is_ok_and_empty() {
        let url = spawn_document_server(json!({
            "type": "report",
            "widgetContainerIds": [7, 8]
        }))
        .await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_secs(5))
            .build()
            .expect("build");

        let widgets = crawler
            .try_crawl(DocumentId::new(42))
            .await
            .expect("out-of-scope documents are not errors");

        assert!(widgets.is_empty());
    }

    #[tokio::test]
    async fn test_try_crawl_times_out_against_silent_server() {
        let url = spawn_silent_server().await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_millis(50))
            .build()
            .expect("build");

        let err = crawler
            .try_crawl(DocumentId::new(42))
            .await
            .expect_err("silent server must time out");

        assert!(err.is_timeout());
        assert!(matches!(err, Error::SessionTimeout { timeout_ms: 50 }));
    }

    #[tokio::test]
    async fn test_crawl_suppresses_connect_failure() {
        let url = unreachable_url().await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_millis(200))
            .build()
            .expect("build");

        assert!(crawler.crawl(DocumentId::new(42)).await.is_empty());
    }

    #[tokio::test]
    async fn test_crawl_suppresses_timeout() {
        let url = spawn_silent_server().await;

        let crawler = Crawler::builder()
            .url(url.as_str())
            .timeout(Duration::from_millis(50))
            .build()
            .expect("build");

        assert!(crawler.crawl(DocumentId::new(42)).await.is_empty());
    }
}
