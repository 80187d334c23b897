use core::fmt;

use matrix_sdk::ruma::RoomId;
use tracing::{error, info, warn};

use crate::{FixError, Homeserver, ResolvedCounterpart};

/// Which piece of room state a patch overwrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchKind {
    Name,
    Avatar,
}

impl PatchKind {
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Name => "m.room.name",
            Self::Avatar => "m.room.avatar",
        }
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Avatar => "avatar",
        })
    }
}

/// One state event to send, with an empty state key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStatePatch {
    pub kind: PatchKind,
    pub value: String,
}

impl RoomStatePatch {
    #[must_use]
    pub fn avatar(url: &str) -> Self {
        Self {
            kind: PatchKind::Avatar,
            value: url.to_owned(),
        }
    }

    /// `"{display_name} {suffix}"`, or the bare display name when the suffix is empty.
    #[must_use]
    pub fn name(display_name: &str, suffix: &str) -> Self {
        let value = if suffix.is_empty() {
            display_name.to_owned()
        } else {
            format!("{display_name} {suffix}")
        };
        Self {
            kind: PatchKind::Name,
            value,
        }
    }
}

#[derive(Debug)]
pub enum FieldOutcome {
    Updated(RoomStatePatch),
    /// The friend has nothing to copy for this field.
    Missing,
    Failed(anyhow::Error),
}

#[derive(Debug)]
pub struct ReconciliationReport {
    pub avatar: FieldOutcome,
    pub name: FieldOutcome,
}

impl ReconciliationReport {
    /// Collect the applied patches, or fail with the first write error.
    ///
    /// # Errors
    ///
    /// [`FixError::StateWriteFailed`] for the avatar if its write failed,
    /// otherwise for the name.
    pub fn into_result(self) -> Result<Vec<RoomStatePatch>, FixError> {
        let mut applied = Vec::with_capacity(2);
        for (kind, outcome) in [(PatchKind::Avatar, self.avatar), (PatchKind::Name, self.name)] {
            match outcome {
                FieldOutcome::Updated(patch) => applied.push(patch),
                FieldOutcome::Missing => {}
                FieldOutcome::Failed(source) => {
                    return Err(FixError::StateWriteFailed { kind, source });
                }
            }
        }
        Ok(applied)
    }
}

/// Copy the friend's avatar and name onto `room`.
///
/// Both writes are attempted even if the first one fails. Absent fields are
/// reported as [`FieldOutcome::Missing`] and produce no write.
pub async fn reconcile<H>(
    homeserver: &H,
    room: &RoomId,
    resolved: &ResolvedCounterpart,
    suffix: &str,
) -> ReconciliationReport
where
    H: Homeserver + ?Sized,
{
    let avatar = match resolved.avatar_url.as_deref() {
        Some(url) => apply(homeserver, room, RoomStatePatch::avatar(url)).await,
        None => {
            warn!(room = %room, "The friend doesn't have an avatar set");
            FieldOutcome::Missing
        }
    };

    // Shouldn't happen since the friend is found by name, but a bridge
    // regression could still hand us an empty result.
    let name = match resolved.display_name.as_deref() {
        Some(display_name) => {
            apply(homeserver, room, RoomStatePatch::name(display_name, suffix)).await
        }
        None => {
            warn!(room = %room, "The friend doesn't have a display name set");
            FieldOutcome::Missing
        }
    };

    ReconciliationReport { avatar, name }
}

async fn apply<H>(homeserver: &H, room: &RoomId, patch: RoomStatePatch) -> FieldOutcome
where
    H: Homeserver + ?Sized,
{
    match homeserver.set_room_state(room, &patch).await {
        Ok(()) => {
            info!(room = %room, kind = %patch.kind, value = %patch.value, "Room's {} updated", patch.kind);
            FieldOutcome::Updated(patch)
        }
        Err(e) => {
            error!(
                room = %room,
                event_type = patch.kind.event_type(),
                error = ?e,
                "Failed to update the room's {}",
                patch.kind
            );
            FieldOutcome::Failed(e)
        }
    }
}
