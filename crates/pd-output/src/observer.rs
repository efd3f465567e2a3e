//! `TraceObserver<W>` — bridges `AgentObserver` to a `TraceWriter`.

use pd_agent::AgentObserver;
use pd_behavior::{DropReason, Intention};
use pd_core::{AgentId, Role, Timestamp};
use pd_executor::StepEvent;

use crate::row::{IntentionEvent, IntentionRow, StepRow};
use crate::writer::TraceWriter;
use crate::{OutputError, OutputResult};

/// An [`AgentObserver`] that records steps and intention lifecycle events.
///
/// Rows are buffered and handed to the writer once per deliberation tick
/// and when the agent stops.  Writer errors are stored internally because
/// observer methods have no return value; check with
/// [`take_error`][Self::take_error] after `Agent::run` returns.
pub struct TraceObserver<W: TraceWriter> {
    writer:     W,
    steps:      Vec<StepRow>,
    intentions: Vec<IntentionRow>,
    last_error: Option<OutputError>,
}

impl<W: TraceWriter> TraceObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            steps:      Vec::new(),
            intentions: Vec::new(),
            last_error: None,
        }
    }

    /// Take the stored write error, if any.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }

    fn flush(&mut self) {
        if !self.steps.is_empty() {
            let rows = std::mem::take(&mut self.steps);
            let result = self.writer.write_steps(&rows);
            self.store_err(result);
        }
        if !self.intentions.is_empty() {
            let rows = std::mem::take(&mut self.intentions);
            let result = self.writer.write_intentions(&rows);
            self.store_err(result);
        }
    }

    fn lifecycle(&mut self, agent: &AgentId, now: Timestamp, event: IntentionEvent, subject: String, detail: String) {
        self.intentions.push(IntentionRow { agent: agent.to_string(), at_ms: now.0, event, subject, detail });
    }
}

impl<W: TraceWriter> AgentObserver for TraceObserver<W> {
    fn on_tick(&mut self, _agent: &AgentId, _now: Timestamp) {
        self.flush();
    }

    fn on_step(&mut self, agent: &AgentId, event: &StepEvent, now: Timestamp) {
        self.steps.push(StepRow {
            agent:   agent.to_string(),
            at_ms:   now.0,
            index:   event.index,
            action:  event.action.as_str(),
            attempt: event.attempt,
            status:  event.status.to_string(),
            x:       event.position.x,
            y:       event.position.y,
        });
    }

    fn on_intention_adopted(&mut self, agent: &AgentId, intention: &Intention, now: Timestamp) {
        self.lifecycle(agent, now, IntentionEvent::Adopted, intention.to_string(), String::new());
    }

    fn on_intention_dropped(&mut self, agent: &AgentId, intention: &Intention, reason: DropReason, now: Timestamp) {
        self.lifecycle(agent, now, IntentionEvent::Dropped, intention.to_string(), reason.to_string());
    }

    fn on_role_changed(&mut self, agent: &AgentId, from: Role, to: Role, now: Timestamp) {
        self.lifecycle(agent, now, IntentionEvent::RoleChanged, to.to_string(), from.to_string());
    }

    fn on_stop(&mut self, _agent: &AgentId, _now: Timestamp) {
        self.flush();
        let result = self.writer.finish();
        self.store_err(result);
    }
}
