//! Scripted oracle for tests
//!
//! Replays a fixed sequence of replies and records every turn it was asked,
//! so tests can assert on call counts and threaded feedback.

use crate::client::RewriteOracle;
use crate::request::{OracleError, OracleReply, RewriteRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use reweave_sandbox::ValidationReport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Oracle that replays queued replies and records every turn.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<OracleReply>>,
    calls: AtomicUsize,
    feedback_log: Mutex<Vec<Option<ValidationReport>>>,
    name_hints: Mutex<Vec<Option<String>>>,
}

impl ScriptedOracle {
    /// An oracle with an empty script; every turn gives up.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next reply.
    #[must_use]
    pub fn then(self, reply: OracleReply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Number of turns served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Feedback received per turn, in order.
    pub fn feedback_log(&self) -> Vec<Option<ValidationReport>> {
        self.feedback_log.lock().clone()
    }

    /// Name hints received per turn, in order.
    pub fn name_hints(&self) -> Vec<Option<String>> {
        self.name_hints.lock().clone()
    }
}

#[async_trait]
impl RewriteOracle for ScriptedOracle {
    async fn propose(
        &self,
        request: &RewriteRequest,
        feedback: Option<&ValidationReport>,
    ) -> Result<OracleReply, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feedback_log.lock().push(feedback.cloned());
        self.name_hints.lock().push(request.name_hint.clone());
        // An exhausted script gives up, ending the caller's attempt loop.
        Ok(self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(OracleReply::give_up))
    }
}
