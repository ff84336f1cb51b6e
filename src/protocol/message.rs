//! Request and Reply envelope types.
//!
//! Defines the message format exchanged between the crawler (local end)
//! and the document server (remote end). Every unit on the wire is one
//! self-contained JSON object.
//!
//! # Correlation
//!
//! Requests carry a session-unique [`RequestId`]; the matching reply
//! echoes it back. Replies arrive in any order, so the id is the only
//! link between a reply and the request that caused it.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::RequestId;

use super::Stage;

// ============================================================================
// Request
// ============================================================================

/// A stage invocation sent from the crawler to the document server.
///
/// Immutable once sent; the engine retains only the `(id, stage)` pair
/// in its correlation table, never the request itself.
///
/// # Format
///
/// ```json
/// {
///   "method": "GetDocument",
///   "params": {"id": 42},
///   "id": 1
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Stage to invoke on the remote end.
    pub method: Stage,

    /// Stage-specific parameters.
    pub params: Value,

    /// Correlation id echoed back by the reply.
    pub id: RequestId,
}

impl Request {
    /// Creates a request for the given stage.
    #[inline]
    #[must_use]
    pub fn new(method: Stage, params: Value, id: RequestId) -> Self {
        Self { method, params, id }
    }
}

// ============================================================================
// Reply
// ============================================================================

/// A reply received from the document server.
///
/// Deserialized leniently: every field is optional so that malformed
/// units still parse and can be classified instead of failing the
/// session. A reply without an `id` cannot be correlated and is
/// discarded by the consumer.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "result": {"type": "slide", "widgetContainerIds": [7, 8]}
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Reply {
    /// Correlation id; absent on malformed units.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Stage-specific payload (if the request succeeded).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if the server failed the request).
    ///
    /// Server-side errors are not interpreted at this layer; a reply
    /// carrying only an error has no extractable payload and its
    /// expansion yields nothing.
    #[serde(default)]
    pub error: Option<Value>,
}

// ============================================================================
// Tests
// ============================================================================
