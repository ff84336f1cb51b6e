//! Correlation state and the loops that drive one crawl session.
//!
//! A session owns exactly one [`CorrelationTable`] and one request-id
//! sequence. The table is the only state shared between the consumer
//! and producer halves of the session:
//!
//! | Component | Role |
//! |-----------|------|
//! | [`correlation`] | Pending set, stage history, unhandled queue, ready signal |
//! | `engine` | Consumer/producer loops and the session driver |
//!
//! The table never learns about channels or plans; the engine never
//! holds table locks across await points. Everything here is internal
//! to [`Crawler::try_crawl`](crate::Crawler::try_crawl), which wraps
//! the session in its deadline.

pub mod correlation;
pub(crate) mod engine;

pub use correlation::CorrelationTable;
