//! Protocol method names.
//!
//! Each request names one stage of the traversal. The remote end
//! dispatches on the method string, so the serialized names here are
//! load-bearing and must match the server exactly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Stage
// ============================================================================

/// Method name carried by a [`Request`](crate::protocol::Request).
///
/// The traversal walks from document metadata down to per-widget
/// properties; each variant is one hop in that walk. Serializes as the
/// exact method string the server expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Fetch document metadata (type, container listing).
    GetDocument,

    /// Fetch the document's field summary, filtered to widget fields.
    GetFieldsSummary,

    /// Fetch one widget container's descriptor.
    GetWidgetContainer,

    /// Fetch the properties of one widget. Terminal stage.
    GetWidgetProperties,
}

impl Stage {
    /// Returns the wire-format method name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GetDocument => "GetDocument",
            Self::GetFieldsSummary => "GetFieldsSummary",
            Self::GetWidgetContainer => "GetWidgetContainer",
            Self::GetWidgetProperties => "GetWidgetProperties",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
