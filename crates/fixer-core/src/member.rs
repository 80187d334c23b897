use matrix_sdk::ruma::{OwnedUserId, RoomId, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::FixError;

/// A 1:1 puppeted room holds the operating account, the friend and the bridge bot.
pub const EXPECTED_MEMBER_COUNT: usize = 3;

/// One joined participant as reported by the homeserver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub user_id: OwnedUserId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl MemberRecord {
    fn qualifies_against(&self, own_display_name: Option<&str>) -> bool {
        self.display_name
            .as_deref()
            .is_some_and(|name| !name.is_empty() && Some(name) != own_display_name)
    }
}

/// The friend's identity as it should appear on the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCounterpart {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl ResolvedCounterpart {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.avatar_url.is_none()
    }
}

/// What to do when more than one member could be the friend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the last qualifying member in membership order.
    #[default]
    LastWins,
    /// Refuse to touch the room.
    RejectAmbiguous,
}

/// Pick the friend out of the joined members of `room`.
///
/// A member qualifies when it has a non-empty display name that differs from
/// `own_display_name`. Nobody qualifying is not an error: both fields of the
/// result are then absent.
///
/// # Errors
///
/// [`FixError::InvalidMemberCount`] unless exactly three members are joined, and
/// [`FixError::AmbiguousCounterpart`] when several members qualify under
/// [`TieBreak::RejectAmbiguous`].
pub fn resolve(
    room: &RoomId,
    own_user_id: &UserId,
    own_display_name: Option<&str>,
    members: &[MemberRecord],
    tie_break: TieBreak,
) -> Result<ResolvedCounterpart, FixError> {
    if members.len() != EXPECTED_MEMBER_COUNT {
        return Err(FixError::InvalidMemberCount {
            room: room.to_owned(),
            count: members.len(),
        });
    }

    let candidates: Vec<&MemberRecord> = members
        .iter()
        .filter(|member| member.qualifies_against(own_display_name))
        .collect();
    debug!(
        own_user_id = %own_user_id,
        own_display_name = ?own_display_name,
        candidates = candidates.len(),
        "Scanned joined members"
    );

    let friend = match (tie_break, candidates.as_slice()) {
        (_, []) => return Ok(ResolvedCounterpart::default()),
        (_, [only]) => *only,
        (TieBreak::LastWins, [.., last]) => {
            warn!(
                candidates = ?candidates.iter().map(|m| m.user_id.as_str()).collect::<Vec<_>>(),
                chosen = %last.user_id,
                "Several members could be the friend, keeping the last one"
            );
            *last
        }
        (TieBreak::RejectAmbiguous, many) => {
            return Err(FixError::AmbiguousCounterpart {
                room: room.to_owned(),
                candidates: many.iter().map(|m| m.user_id.clone()).collect(),
            });
        }
    };

    Ok(ResolvedCounterpart {
        display_name: friend.display_name.clone(),
        avatar_url: friend.avatar_url.clone().filter(|url| !url.is_empty()),
    })
}
