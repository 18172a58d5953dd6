// Queue document layout

use roster_core::domain::{Participant, ParticipantId, Queue};
use serde::{Deserialize, Serialize};

/// One document per queue; membership is embedded so a queue and its
/// members are always written and deleted together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDocument {
    pub queue_id: String,
    pub description: String,
    /// Members in authoritative order (permuted once started)
    pub users: Vec<Participant>,
    /// Members in the order they joined
    #[serde(default)]
    pub joined: Vec<Participant>,
    pub current_user_index: usize,
    #[serde(default)]
    pub started: bool,
    /// Bumped on every committed change
    #[serde(default)]
    pub version: u64,
}

impl QueueDocument {
    pub fn new(queue_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            queue_id: queue_id.into(),
            description: description.into(),
            users: Vec::new(),
            joined: Vec::new(),
            current_user_index: 0,
            started: false,
            version: 0,
        }
    }

    /// Fill in the join order for documents written before it was tracked
    pub fn normalized(mut self) -> Self {
        if self.joined.is_empty() && !self.users.is_empty() {
            self.joined = self.users.clone();
        }
        self
    }

    /// Add a member at the end of both orders
    pub fn add_user(&mut self, participant: Participant) {
        self.joined.push(participant.clone());
        self.users.push(participant);
    }

    /// Remove a member, keeping the cursor on the same participant.
    /// `false` if they were not a member.
    pub fn remove_user(&mut self, id: ParticipantId) -> bool {
        self.joined.retain(|user| user.id != id);

        let Some(position) = self.users.iter().position(|user| user.id == id) else {
            return false;
        };
        self.users.remove(position);

        if position < self.current_user_index {
            self.current_user_index -= 1;
        }
        self.current_user_index = self.current_user_index.min(self.users.len());
        true
    }

    pub fn into_queue(self) -> Queue {
        Queue {
            id: self.queue_id,
            description: self.description,
            members: self.users,
            cursor: self.current_user_index,
            started: self.started,
        }
    }
}
