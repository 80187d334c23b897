use matrix_sdk::ruma::{OwnedRoomId, OwnedUserId};

use crate::PatchKind;

#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("the room ID localpart {localpart:?} is either empty or invalid")]
    InvalidRoomLocalpart { localpart: String, strict: bool },

    /// The bridge hasn't finished setting up the room, or more than one friend
    /// joined it.
    #[error(
        "invalid number of members in {room}: expected 3, found {count}; either the friend hasn't joined yet, or there's more than one friend in the room"
    )]
    InvalidMemberCount { room: OwnedRoomId, count: usize },

    #[error("several members of {room} could be the friend: {candidates:?}")]
    AmbiguousCounterpart {
        room: OwnedRoomId,
        candidates: Vec<OwnedUserId>,
    },

    #[error("failed to update the room's {kind}")]
    StateWriteFailed {
        kind: PatchKind,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl FixError {
    /// Whether the error comes from the command line rather than the homeserver
    /// or the room.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::InvalidRoomLocalpart { .. })
    }
}
