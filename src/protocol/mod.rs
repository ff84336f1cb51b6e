//! Wire protocol message types.
//!
//! This module defines the message format for communication between the
//! crawler (local end) and the document server (remote end). All traffic
//! flows over a single channel as JSON text frames.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Request`] | Local → Remote | Stage invocation with correlation id |
//! | [`Reply`] | Remote → Local | Result for a previously sent request |
//!
//! # Wire Shapes
//!
//! Outbound requests and inbound replies use fixed JSON shapes:
//!
//! ```json
//! {"method": "GetDocument", "params": {"id": 42}, "id": 1}
//! {"id": 1, "result": {"type": "slide", "widgetContainerIds": [7, 8]}}
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Request and Reply envelope types |
//! | `stage` | Protocol method names |

// ============================================================================
// Submodules
// ============================================================================

/// Request and Reply envelope types.
pub mod message;

/// Protocol method names.
pub mod stage;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::{Reply, Request};
pub use stage::Stage;
