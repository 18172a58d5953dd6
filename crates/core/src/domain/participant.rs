// Participant Domain Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable participant identity supplied by the chat platform
pub type ParticipantId = i64;

/// A person who can join a queue
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
}

impl Participant {
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
        }
    }

    /// Build a participant from platform name parts ("Last First", trimmed).
    /// Either part may be empty.
    pub fn from_names(id: ParticipantId, last_name: &str, first_name: &str) -> Self {
        let display_name = format!("{} {}", last_name.trim(), first_name.trim())
            .trim()
            .to_string();
        Self { id, display_name }
    }
}

/// Soft membership flag for backends that model toggles as upsert-flip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipState {
    Active,
    Withdrawn,
}

impl MembershipState {
    pub fn flipped(self) -> Self {
        match self {
            MembershipState::Active => MembershipState::Withdrawn,
            MembershipState::Withdrawn => MembershipState::Active,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipState::Active => "ACTIVE",
            MembershipState::Withdrawn => "WITHDRAWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ACTIVE" => Some(MembershipState::Active),
            "WITHDRAWN" => Some(MembershipState::Withdrawn),
            _ => None,
        }
    }
}

impl fmt::Display for MembershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names_joins_and_trims() {
        assert_eq!(
            Participant::from_names(1, "Lovelace", "Ada").display_name,
            "Lovelace Ada"
        );
        assert_eq!(Participant::from_names(2, "", "Bob").display_name, "Bob");
        assert_eq!(Participant::from_names(3, " Smith ", "").display_name, "Smith");
        assert_eq!(Participant::from_names(4, "", "").display_name, "");
    }

    #[test]
    fn test_membership_state_flip_and_parse() {
        assert_eq!(MembershipState::Active.flipped(), MembershipState::Withdrawn);
        assert_eq!(MembershipState::Withdrawn.flipped(), MembershipState::Active);
        assert_eq!(MembershipState::parse("ACTIVE"), Some(MembershipState::Active));
        assert_eq!(
            MembershipState::parse(MembershipState::Withdrawn.as_str()),
            Some(MembershipState::Withdrawn)
        );
        assert_eq!(MembershipState::parse("deleted"), None);
    }
}
