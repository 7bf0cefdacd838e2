// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Translation of runtime session events into activity entries and
//! broadcasts.

use tf_core::{
    strip_preamble, ActivityEntry, Broadcast, ChatRole, Clock, EntryMeta, MessageMetadata,
    SessionStatus,
};
use tf_runtime::{AgentRuntime, SessionEvent, StopReason};

use super::handle::SessionHandle;
use super::Supervisor;

impl<R: AgentRuntime, C: Clock> Supervisor<R, C> {
    /// Handle one event from the underlying session.
    ///
    /// Activity entries are appended before the corresponding broadcast so
    /// the timeline is durable by the time a UI hears about it.
    pub(crate) fn handle_event(&self, handle: &SessionHandle, event: SessionEvent) {
        let task_id = handle.task_id.clone();
        match event {
            SessionEvent::AgentStart => {
                handle.set_status(SessionStatus::Running);
                self.broadcaster.emit(Broadcast::ExecutionStatus {
                    task_id,
                    status: SessionStatus::Running,
                });
            }
            SessionEvent::AgentEnd => {}

            SessionEvent::MessageStart => {
                handle.state.lock().current_stream_text.clear();
                self.broadcaster.emit(Broadcast::StreamingStart { task_id });
            }
            SessionEvent::TextDelta { text } => {
                handle.state.lock().current_stream_text.push_str(&text);
                self.broadcaster.emit(Broadcast::StreamingText { task_id, text });
            }
            SessionEvent::ThinkingDelta { text } => {
                handle.state.lock().current_thinking_text.push_str(&text);
                self.broadcaster.emit(Broadcast::ThinkingDelta { task_id, text });
            }

            SessionEvent::MessageEnd { content, stop_reason, error_message } => {
                let stripped = strip_preamble(&content).to_string();
                {
                    let mut state = handle.state.lock();
                    state.last_assistant_text = stripped.clone();
                    if stop_reason == StopReason::Error {
                        state.last_turn_error =
                            Some(error_message.unwrap_or_else(|| "agent runtime error".into()));
                    }
                    if !state.current_thinking_text.is_empty() {
                        state.current_thinking_text.clear();
                        self.broadcaster
                            .emit(Broadcast::ThinkingEnd { task_id: task_id.clone() });
                    }
                }
                if !stripped.is_empty() {
                    let entry = ActivityEntry::ChatMessage {
                        meta: EntryMeta::new(task_id.clone(), self.clock.now_utc()),
                        role: ChatRole::Agent,
                        content: stripped,
                        metadata: None,
                    };
                    self.append_activity(&entry);
                }
                self.broadcaster.emit(Broadcast::StreamingEnd { task_id });
            }

            SessionEvent::ToolExecutionStart { tool, args } => {
                handle.state.lock().tool_call_args.insert(tool.clone(), args.clone());
                self.broadcaster.emit(Broadcast::ToolStart { task_id, tool, args });
            }
            SessionEvent::ToolExecutionUpdate { tool, output } => {
                self.broadcaster.emit(Broadcast::ToolUpdate {
                    task_id,
                    tool,
                    output: Some(output),
                });
            }
            SessionEvent::ToolExecutionEnd { tool, result, is_error } => {
                let args = handle.state.lock().tool_call_args.remove(&tool);
                let entry = ActivityEntry::ChatMessage {
                    meta: EntryMeta::new(task_id.clone(), self.clock.now_utc()),
                    role: ChatRole::Agent,
                    content: result.clone(),
                    metadata: Some(MessageMetadata {
                        tool_name: Some(tool.clone()),
                        tool_args: args,
                        result: Some(result),
                        is_error,
                    }),
                };
                self.append_activity(&entry);
                self.broadcaster.emit(Broadcast::ToolEnd { task_id, tool, is_error });
            }

            SessionEvent::TurnEnd => {
                self.broadcaster.emit(Broadcast::TurnEnd { task_id });
            }

            SessionEvent::AutoCompactionStart | SessionEvent::AutoCompactionEnd => {
                tracing::debug!(task = handle.task_id.as_str(), "session auto-compaction");
            }
            SessionEvent::AutoRetryStart { attempt } => {
                tracing::debug!(task = handle.task_id.as_str(), attempt, "runtime auto-retry");
            }
            SessionEvent::AutoRetryEnd => {}
        }
    }

    /// Append to the journal and mirror onto the broadcast bus.
    pub(crate) fn append_activity(&self, entry: &ActivityEntry) {
        if let Err(e) = self.activity.append(entry) {
            tracing::error!(task = entry.task_id().as_str(), error = %e, "failed to append activity entry");
        }
        self.broadcaster.emit(Broadcast::Activity { entry: entry.clone() });
    }
}
