//! Declarative traversal plans.
//!
//! A [`TraversalPlan`] describes the stages of a crawl as data: which
//! stage follows which, how a reply's payload yields zero or more child
//! requests, and which stage is terminal (result-producing). The engine
//! in [`session`](crate::session) is parameterized by a plan, so both
//! server dialects run through one set of correlation and concurrency
//! logic.
//!
//! # Built-in Plans
//!
//! | Plan | Stage chain |
//! |------|-------------|
//! | [`TraversalPlan::direct`] | GetDocument → GetWidgetContainer → GetWidgetProperties |
//! | [`TraversalPlan::with_fields_summary`] | GetDocument → GetFieldsSummary → GetWidgetContainer → GetWidgetProperties |
//!
//! Deviant dialects are assembled with [`TraversalPlan::custom`] from
//! the same parts. Expansion rules copy entity ids out of reply
//! payloads verbatim, so servers using string or integer ids both
//! traverse correctly.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::identifiers::DocumentId;
use crate::protocol::Stage;

// ============================================================================
// Constants
// ============================================================================

/// Document types that carry a graphical-widget tree.
///
/// A `GetDocument` reply whose `type` is not in this set produces no
/// follow-up requests under the direct plan.
const GUI_DOC_TYPES: &[&str] = &["biDashboard", "slide"];

// ============================================================================
// StageRule
// ============================================================================

/// Expansion rule for one non-terminal stage.
///
/// Applied by the producer to a matched reply: `expand` derives the
/// parameter sets for the follow-up requests, each sent at stage
/// `next`. An empty expansion means the branch ends here (gate failed
/// or the payload had no children).
#[derive(Debug, Clone, Copy)]
pub struct StageRule {
    /// Stage of the follow-up requests this rule emits.
    pub next: Stage,

    /// Derives zero or more child request params from a reply payload.
    pub expand: fn(&Value) -> Vec<Value>,
}

// ============================================================================
// TerminalRule
// ============================================================================

/// Extraction rule for the terminal stage.
///
/// Terminal replies are not expanded; `extract` pulls the payload that
/// becomes one entry of the final result list. `None` marks a reply
/// whose shape does not match, which is skipped rather than failing
/// the session.
#[derive(Debug, Clone, Copy)]
pub struct TerminalRule {
    /// The result-producing stage.
    pub stage: Stage,

    /// Extracts the result-list entry from a reply payload.
    pub extract: fn(&Value) -> Option<Value>,
}

// ============================================================================
// TraversalPlan
// ============================================================================

/// A complete description of one crawl dialect.
///
/// Plans are plain data over `'static` rule tables; cloning or copying
/// one is free. The two built-in plans cover the server dialects in
/// the wild; [`TraversalPlan::custom`] assembles a plan from the same
/// public parts for servers that deviate.
#[derive(Debug, Clone, Copy)]
pub struct TraversalPlan {
    /// Human-readable plan name (used in logs).
    name: &'static str,

    /// Stage of the root request that seeds the crawl.
    root: Stage,

    /// Derives the root request's params from the document id.
    root_params: fn(DocumentId) -> Value,

    /// Expansion rules keyed by the stage a reply belongs to.
    rules: &'static [(Stage, StageRule)],

    /// The result-producing stage and its payload extraction.
    terminal: TerminalRule,
}

impl TraversalPlan {
    /// Three-stage plan: the document reply lists its widget containers
    /// directly.
    ///
    /// `GetDocument` continues only for documents whose `type` is a
    /// GUI type (`"biDashboard"` or `"slide"`), fanning out one
    /// `GetWidgetContainer` per entry of `widgetContainerIds`. Each
    /// container reply yields one `GetWidgetProperties`, whose whole
    /// `result` is the crawl output.
    #[must_use]
    pub const fn direct() -> Self {
        Self {
            name: "direct",
            root: Stage::GetDocument,
            root_params: document_params,
            rules: DIRECT_RULES,
            terminal: TerminalRule {
                stage: Stage::GetWidgetProperties,
                extract: extract_whole_result,
            },
        }
    }

    /// Four-stage plan: a fields summary yields the container id list.
    ///
    /// `GetDocument` continues only if the reply's `hasWidgets` flag is
    /// true, issuing one `GetFieldsSummary` filtered to widget fields.
    /// The summary's `fields[].id` entries fan out to
    /// `GetWidgetContainer` requests; each container reply yields one
    /// `GetWidgetProperties`, whose `result.properties` is the crawl
    /// output.
    #[must_use]
    pub const fn with_fields_summary() -> Self {
        Self {
            name: "fields-summary",
            root: Stage::GetDocument,
            root_params: document_params,
            rules: FIELDS_SUMMARY_RULES,
            terminal: TerminalRule {
                stage: Stage::GetWidgetProperties,
                extract: extract_properties,
            },
        }
    }

    /// Assembles a plan for a dialect the built-ins do not cover.
    ///
    /// `rules` maps each non-terminal stage to its expansion; a reply
    /// whose stage is absent from the table is dropped by the engine
    /// without failing the session, so the table only needs entries
    /// for stages the plan actually descends through.
    #[must_use]
    pub const fn custom(
        name: &'static str,
        root: Stage,
        root_params: fn(DocumentId) -> Value,
        rules: &'static [(Stage, StageRule)],
        terminal: TerminalRule,
    ) -> Self {
        Self {
            name,
            root,
            root_params,
            rules,
            terminal,
        }
    }

    /// Returns the plan name.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the stage of the root request.
    #[inline]
    #[must_use]
    pub const fn root_stage(&self) -> Stage {
        self.root
    }

    /// Builds the root request's params for the given document.
    #[inline]
    #[must_use]
    pub fn root_params(&self, document: DocumentId) -> Value {
        (self.root_params)(document)
    }

    /// Returns the expansion rule for a stage, or `None` if the stage
    /// has no rule (terminal, or outside this plan).
    #[must_use]
    pub fn rule_for(&self, stage: Stage) -> Option<&StageRule> {
        self.rules
            .iter()
            .find(|(rule_stage, _)| *rule_stage == stage)
            .map(|(_, rule)| rule)
    }

    /// Returns the result-producing stage.
    #[inline]
    #[must_use]
    pub const fn terminal_stage(&self) -> Stage {
        self.terminal.stage
    }

    /// Returns `true` if the stage is this plan's terminal stage.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self, stage: Stage) -> bool {
        self.terminal.stage == stage
    }

    /// Extracts the result-list entry from a terminal reply payload.
    #[inline]
    #[must_use]
    pub fn extract_terminal(&self, result: &Value) -> Option<Value> {
        (self.terminal.extract)(result)
    }
}

impl Default for TraversalPlan {
    fn default() -> Self {
        Self::direct()
    }
}

// ============================================================================
// Rule Tables
// ============================================================================

/// Rules for [`TraversalPlan::direct`].
const DIRECT_RULES: &[(Stage, StageRule)] = &[
    (
        Stage::GetDocument,
        StageRule {
            next: Stage::GetWidgetContainer,
            expand: expand_document_containers,
        },
    ),
    (
        Stage::GetWidgetContainer,
        StageRule {
            next: Stage::GetWidgetProperties,
            expand: expand_container_widget,
        },
    ),
];

/// Rules for [`TraversalPlan::with_fields_summary`].
const FIELDS_SUMMARY_RULES: &[(Stage, StageRule)] = &[
    (
        Stage::GetDocument,
        StageRule {
            next: Stage::GetFieldsSummary,
            expand: expand_document_fields_summary,
        },
    ),
    (
        Stage::GetFieldsSummary,
        StageRule {
            next: Stage::GetWidgetContainer,
            expand: expand_fields_summary_containers,
        },
    ),
    (
        Stage::GetWidgetContainer,
        StageRule {
            next: Stage::GetWidgetProperties,
            expand: expand_container_widget,
        },
    ),
];

// ============================================================================
// Root Params
// ============================================================================

/// Root request params shared by both plans.
fn document_params(document: DocumentId) -> Value {
    json!({ "id": document })
}

// ============================================================================
// Expansion Functions
// ============================================================================

/// Direct plan: one container request per `widgetContainerIds` entry,
/// gated on the document type.
fn expand_document_containers(result: &Value) -> Vec<Value> {
    let doc_type = result.get("type").and_then(Value::as_str);
    if !doc_type.is_some_and(|t| GUI_DOC_TYPES.contains(&t)) {
        return Vec::new();
    }

    result
        .get("widgetContainerIds")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().map(|id| json!({ "id": id })).collect())
        .unwrap_or_default()
}

/// Fields-summary plan: one summary request for documents that carry
/// widgets.
fn expand_document_fields_summary(result: &Value) -> Vec<Value> {
    let has_widgets = result.get("hasWidgets").and_then(Value::as_bool);
    if !has_widgets.unwrap_or(false) {
        return Vec::new();
    }

    match result.get("id") {
        Some(doc_id) => vec![json!({ "documentId": doc_id, "fieldType": "widget" })],
        None => Vec::new(),
    }
}

/// Fields-summary plan: one container request per summary field.
fn expand_fields_summary_containers(result: &Value) -> Vec<Value> {
    result
        .get("fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|field| field.get("id"))
                .map(|id| json!({ "id": id }))
                .collect()
        })
        .unwrap_or_default()
}

/// Both plans: one properties request per container's widget id.
fn expand_container_widget(result: &Value) -> Vec<Value> {
    match result.get("id") {
        Some(widget_id) => vec![json!({ "id": widget_id })],
        None => Vec::new(),
    }
}

// ============================================================================
// Extraction Functions
// ============================================================================

/// Direct plan: the terminal reply's whole `result` is the output.
fn extract_whole_result(result: &Value) -> Option<Value> {
    Some(result.clone())
}

/// Fields-summary plan: only `result.properties` is the output.
fn extract_properties(result: &Value) -> Option<Value> {
    result.get("properties").cloned()
}

// ============================================================================
// Tests
// ============================================================================
