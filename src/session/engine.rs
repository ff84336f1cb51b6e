//! Consumer and producer loops of a crawl session.
//!
//! A session runs two cooperatively scheduled tasks over one channel
//! and one [`CorrelationTable`]:
//!
//! - The **consumer** reads inbound replies, appends terminal-stage
//!   payloads to the result list, and queues every other matched reply
//!   for expansion.
//! - The **producer** wakes on the ready signal, drains the unhandled
//!   queue, and issues the follow-up requests the traversal plan
//!   derives from each reply. It closes the channel once nothing is
//!   pending and nothing is queued.
//!
//! Both run inside [`run_session`] under `tokio::try_join!`, so an
//! error in either loop cancels the other at its next suspension
//! point, and dropping the session future (deadline expiry) cancels
//! both. Nothing here is spawned; cancellation is always structured.
//!
//! The producer clears the ready signal before each drain and the
//! consumer re-signals after every resolution, so a reply arriving
//! mid-drain is guaranteed a later wake-up without any busy polling.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{DocumentId, RequestId, RequestIdGenerator};
use crate::protocol::{Reply, Request};
use crate::transport::{MessageSink, MessageSource};
use crate::traversal::TraversalPlan;

use super::correlation::CorrelationTable;

// ============================================================================
// Session Driver
// ============================================================================

/// Seeds the root request and drives both loops to completion.
///
/// Returns the consumer's result list: every terminal-stage payload in
/// the order its reply arrived. The table and id generator are created
/// per session by the caller; inspecting the table afterwards shows
/// the completion invariant (nothing pending, nothing unhandled).
///
/// # Errors
///
/// - [`Error::ChannelClosed`] if the channel ends with requests still
///   outstanding, or a send hits a closed channel
/// - [`Error::WebSocket`] on transport failure
/// - [`Error::Json`] if a request fails to serialize
pub(crate) async fn run_session<K, R>(
    sink: &mut K,
    source: &mut R,
    plan: &TraversalPlan,
    document: DocumentId,
    ids: &RequestIdGenerator,
    table: &CorrelationTable,
) -> Result<Vec<Value>>
where
    K: MessageSink + ?Sized,
    R: MessageSource + ?Sized,
{
    seed_root(sink, table, plan, ids, document).await?;

    let (results, ()) = tokio::try_join!(
        consume_replies(source, table, plan),
        produce_requests(sink, table, plan, ids),
    )?;

    Ok(results)
}

/// Sends the plan's root request and registers it pending.
async fn seed_root<K>(
    sink: &mut K,
    table: &CorrelationTable,
    plan: &TraversalPlan,
    ids: &RequestIdGenerator,
    document: DocumentId,
) -> Result<()>
where
    K: MessageSink + ?Sized,
{
    let request = Request::new(plan.root_stage(), plan.root_params(document), ids.next_id());
    table.register_pending(request.id, request.method);

    let json = serde_json::to_string(&request)?;
    sink.send(json).await?;

    debug!(id = %request.id, stage = %request.method, document = %document, "Root request sent");
    Ok(())
}

// ============================================================================
// Consumer Loop
// ============================================================================

/// Receives replies until end-of-stream, collecting terminal payloads.
///
/// Per inbound unit:
///
/// 1. Unparseable or id-less units are logged and dropped; they never
///    signal the producer.
/// 2. A reply pending at the terminal stage has its payload extracted
///    into the result list (an unextractable payload is skipped with a
///    warning; the id is still cleared so completion stays reachable).
/// 3. Any other pending reply enters the unhandled queue.
/// 4. A reply for an unknown or already-resolved id is dropped without
///    touching the table.
///
/// Matched replies are marked resolved and the producer is signaled.
async fn consume_replies<R>(
    source: &mut R,
    table: &CorrelationTable,
    plan: &TraversalPlan,
) -> Result<Vec<Value>>
where
    R: MessageSource + ?Sized,
{
    let mut results = Vec::new();

    while let Some(text) = source.receive().await? {
        let reply: Reply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(error) => {
                debug!(%error, "Ignoring unparseable unit");
                continue;
            }
        };

        let Some(id) = reply.id else {
            debug!("Ignoring unit without an id");
            continue;
        };

        trace!(%id, "Reply received");

        if table.is_pending_for(id, plan.terminal_stage()) {
            let payload = reply
                .result
                .as_ref()
                .and_then(|result| plan.extract_terminal(result));
            match payload {
                Some(payload) => results.push(payload),
                None => warn!(%id, "Skipping terminal reply with no extractable payload"),
            }
        } else if table.is_pending(id) {
            table.enqueue_unhandled(reply);
        } else {
            debug!(%id, "Ignoring reply for unknown or already-resolved request");
            continue;
        }

        table.mark_resolved(id);
        table.signal_new_reply();
    }

    if table.is_complete() {
        debug!(widgets = results.len(), "Channel ended with traversal complete");
        Ok(results)
    } else {
        warn!(
            pending = table.pending_count(),
            unhandled = table.unhandled_count(),
            "Channel ended with the traversal incomplete"
        );
        Err(Error::ChannelClosed)
    }
}

// ============================================================================
// Producer Loop
// ============================================================================

/// Expands queued replies into follow-up requests until the traversal
/// completes, then closes the channel.
///
/// Completion is re-evaluated at loop-top on every iteration: a drained
/// reply can itself register new pending ids, so checking after the
/// drain would close the channel early.
async fn produce_requests<K>(
    sink: &mut K,
    table: &CorrelationTable,
    plan: &TraversalPlan,
    ids: &RequestIdGenerator,
) -> Result<()>
where
    K: MessageSink + ?Sized,
{
    while !table.is_complete() {
        if !table.has_signal() {
            table.await_reply().await;
        }
        table.clear_signal();

        for reply in table.unhandled_snapshot() {
            expand_reply(sink, table, plan, ids, &reply).await?;
        }
    }

    debug!("Traversal complete; closing channel");
    sink.close().await
}

/// Applies the plan's expansion rule to one queued reply.
///
/// Sibling follow-ups are registered pending as a batch before any
/// send goes out, so a reply racing back cannot miss its entry. A
/// reply with no recorded stage, no matching rule, or an empty
/// expansion is removed from the queue without failing the session;
/// dropping a branch must never block completion.
async fn expand_reply<K>(
    sink: &mut K,
    table: &CorrelationTable,
    plan: &TraversalPlan,
    ids: &RequestIdGenerator,
    reply: &Reply,
) -> Result<()>
where
    K: MessageSink + ?Sized,
{
    let Some(stage) = reply.id.and_then(|id| table.resolve(id)) else {
        debug!("Removing queued reply with no recorded stage");
        table.remove_unhandled(reply);
        return Ok(());
    };

    let Some(rule) = plan.rule_for(stage) else {
        // Terminal replies never reach the queue, so a missing rule
        // means the stage is outside this plan: ignored, not fatal.
        debug!(%stage, "No expansion rule for queued reply; removing");
        table.remove_unhandled(reply);
        return Ok(());
    };

    let children = match reply.result.as_ref() {
        Some(result) => (rule.expand)(result),
        None => Vec::new(),
    };

    if children.is_empty() {
        trace!(%stage, "Reply produced no follow-up requests");
        table.remove_unhandled(reply);
        return Ok(());
    }

    let requests: Vec<Request> = children
        .into_iter()
        .map(|params| Request::new(rule.next, params, ids.next_id()))
        .collect();

    let child_ids: Vec<RequestId> = requests.iter().map(|request| request.id).collect();
    table.register_pending_bulk(&child_ids, rule.next);

    for request in &requests {
        let json = serde_json::to_string(request)?;
        sink.send(json).await?;
        trace!(id = %request.id, stage = %request.method, "Follow-up request sent");
    }

    table.remove_unhandled(reply);

    debug!(
        %stage,
        next = %rule.next,
        children = child_ids.len(),
        "Expanded reply into follow-up requests"
    );

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
