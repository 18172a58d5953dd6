//! RPC Request/Response Types
//!
//! Every method takes `queue_id` and an optional `timeout_ms` deadline.

use roster_core::application::NextStep;
use roster_core::domain::{
    Participant, ParticipantId, Queue, QueuePhase, StartOutcome, ToggleOutcome,
};
use serde::{Deserialize, Serialize};

/// queue.get.v1 / queue.next.v1 / queue.menu.v1 / queue.finish.v1
#[derive(Debug, Deserialize)]
pub struct QueueRequest {
    pub queue_id: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// queue.create.v1
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub queue_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// queue.toggle.v1
///
/// `display_name` wins over the name parts when both are given.
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub queue_id: String,
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ToggleRequest {
    pub fn participant(&self) -> Participant {
        match &self.display_name {
            Some(name) => Participant::new(self.participant_id, name.trim()),
            None => Participant::from_names(self.participant_id, &self.last_name, &self.first_name),
        }
    }
}

/// queue.start.v1
#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub queue_id: String,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub position: usize,
    pub id: ParticipantId,
    pub display_name: String,
    pub current: bool,
}

/// Snapshot DTO rendered by the chat adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueView {
    pub queue_id: String,
    pub description: String,
    pub phase: QueuePhase,
    pub started: bool,
    pub cursor: usize,
    pub members: Vec<MemberView>,
}

impl From<&Queue> for QueueView {
    fn from(queue: &Queue) -> Self {
        let current = queue.current().map(|p| p.id);
        Self {
            queue_id: queue.id.clone(),
            description: queue.description.clone(),
            phase: queue.phase(),
            started: queue.started,
            cursor: queue.cursor,
            members: queue
                .members
                .iter()
                .enumerate()
                .map(|(position, member)| MemberView {
                    position,
                    id: member.id,
                    display_name: member.display_name.clone(),
                    current: Some(member.id) == current,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToggleResponse {
    pub outcome: ToggleOutcome,
    pub queue: QueueView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub queue: QueueView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextResponse {
    pub exhausted: bool,
    pub current: Option<MemberView>,
    pub queue: QueueView,
}

impl From<&NextStep> for NextResponse {
    fn from(step: &NextStep) -> Self {
        let queue = QueueView::from(step.queue());
        let current = queue.members.iter().find(|m| m.current).cloned();
        Self {
            exhausted: step.is_exhausted(),
            current,
            queue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishResponse {
    pub queue_id: String,
    pub finished: bool,
}
