//! Widget crawler - widget-tree traversal over a WebSocket channel.
//!
//! This library collects every widget of a remote document by driving
//! a request/response protocol over a single WebSocket channel. The
//! server answers out of order, so replies are matched to requests by
//! id and the tree is expanded stage by stage as answers arrive.
//!
//! # Architecture
//!
//! One crawl is one session over one channel, driven by two
//! cooperating loops:
//!
//! - **Consumer**: reads inbound replies, collects terminal-stage
//!   payloads, queues every other matched reply
//! - **Producer**: drains the queue and issues the follow-up requests
//!   a [`TraversalPlan`] derives from each reply
//!
//! Key design principles:
//!
//! - Traversal shape is data: plans map each stage to its expansion
//! - The session completes when nothing is pending and nothing is
//!   queued; only then is the channel closed
//! - The whole session runs under one deadline; expiry cancels both
//!   loops and abandons the channel
//! - [`Crawler::crawl`] never fails: any error becomes an empty list
//!
//! # Quick Start
//!
//! ```no_run
//! use widget_crawler::{Crawler, DocumentId, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let crawler = Crawler::builder()
//!         .url("ws://127.0.0.1:9222")
//!         .build()?;
//!
//!     let widgets = crawler.crawl(DocumentId::new(42)).await;
//!     for widget in &widgets {
//!         println!("{widget}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`crawler`] | Entry points: [`Crawler`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe id wrappers |
//! | [`protocol`] | Wire envelopes and stage names |
//! | [`session`] | Correlation state and session loops (internal) |
//! | [`transport`] | WebSocket channel layer |
//! | [`traversal`] | Declarative traversal plans |

// ============================================================================
// Modules
// ============================================================================

/// Crawl entry points and configuration.
///
/// Use [`Crawler::builder()`] to create a configured crawler instance.
pub mod crawler;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for requests and documents.
///
/// Newtype wrappers prevent mixing incompatible ids at compile time.
pub mod identifiers;

/// Wire protocol envelopes and stage names.
///
/// Defines the [`Request`]/[`Reply`] JSON shapes and the [`Stage`]
/// methods the traversal steps through.
pub mod protocol;

/// Correlation state and the loops that drive one crawl session.
///
/// Internal module; the crawler owns its sessions.
pub mod session;

/// WebSocket channel layer.
///
/// The handshake plus the sink/source traits the session loops run on.
pub mod transport;

/// Declarative traversal plans.
///
/// A [`TraversalPlan`] describes which stage follows which and how
/// replies expand into follow-up requests.
pub mod traversal;

// ============================================================================
// Re-exports
// ============================================================================

// Crawler types
pub use crawler::{Crawler, CrawlerBuilder, DEFAULT_TIMEOUT};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{DocumentId, RequestId, RequestIdGenerator};

// Protocol types
pub use protocol::{Reply, Request, Stage};

// Traversal types
pub use traversal::{StageRule, TerminalRule, TraversalPlan};
