//! Batch handling.
//!
//! A batch is a JSON array of envelopes. Every entry is dispatched on its
//! own and the replies come back in input order, one per call.

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    dispatch::parse_envelope,
    dispatcher::JsonRpcDispatcher,
    error::{DispatchError, JsonRpcError, ToJsonRpcError},
    response::{JsonRpcMessage, JsonRpcOutput},
    types::RequestId,
};

impl JsonRpcDispatcher {
    /// Handle a decoded payload, single envelope or batch.
    ///
    /// Returns `None` when nothing should be sent back.
    pub async fn handle_value(&self, payload: Value) -> Option<JsonRpcOutput> {
        match payload {
            Value::Array(entries) => self.handle_batch(entries).await,
            single => self.dispatch(single).await.map(JsonRpcOutput::Single),
        }
    }

    /// Dispatch every entry of a batch.
    ///
    /// An empty batch, or one without a single well-formed envelope, gets one
    /// top-level `Invalid Request` error instead of an array.
    pub async fn handle_batch(&self, entries: Vec<Value>) -> Option<JsonRpcOutput> {
        if entries.is_empty() {
            return Some(rejected_batch("batch must not be empty"));
        }

        let envelopes: Vec<_> = entries.into_iter().map(parse_envelope).collect();
        if envelopes.iter().all(Result::is_err) {
            return Some(rejected_batch("batch contains no valid envelope"));
        }

        debug!(
            "Dispatching batch of {} envelope(s){}",
            envelopes.len(),
            if self.config.parallel_batches { " concurrently" } else { "" }
        );

        let replies = if self.config.parallel_batches {
            join_all(envelopes.into_iter().map(|envelope| self.settle(envelope))).await
        } else {
            let mut replies = Vec::with_capacity(envelopes.len());
            for envelope in envelopes {
                replies.push(self.settle(envelope).await);
            }
            replies
        };

        let messages: Vec<JsonRpcMessage> = replies.into_iter().flatten().collect();
        if messages.is_empty() {
            None
        } else {
            Some(JsonRpcOutput::Batch(messages))
        }
    }
}

fn rejected_batch(reason: &str) -> JsonRpcOutput {
    warn!("Rejecting batch: {}", reason);
    let error = DispatchError::InvalidRequest(reason.to_string());
    JsonRpcOutput::Single(JsonRpcMessage::error(JsonRpcError::new(
        RequestId::Null,
        error.to_error_object(),
    )))
}
