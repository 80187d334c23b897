//! Repair the name and avatar of a 1:1 room puppeted by a Facebook bridge.
//!
//! The friend is found among the room's joined members, then their display
//! name and avatar are written back as the room's `m.room.name` and
//! `m.room.avatar` state.

mod error;
mod ids;
mod member;
mod reconcile;

pub use error::FixError;
pub use ids::{room_id_from_localpart, user_id_from_localpart, validate_room_localpart};
pub use member::{EXPECTED_MEMBER_COUNT, MemberRecord, ResolvedCounterpart, TieBreak, resolve};
pub use reconcile::{FieldOutcome, PatchKind, ReconciliationReport, RoomStatePatch, reconcile};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use matrix_sdk::ruma::{RoomId, UserId};
use tracing::{info, instrument, warn};

/// Suffix appended to the friend's display name when none is configured.
pub const DEFAULT_NAME_SUFFIX: &str = "(Facebook)";

/// Everything the fixer needs from the homeserver.
#[async_trait]
pub trait Homeserver: Send + Sync {
    async fn joined_members(&self, room: &RoomId) -> Result<Vec<MemberRecord>>;

    /// `None` when the operating account has no display name set.
    async fn own_display_name(&self) -> Result<Option<String>>;

    /// Overwrite one piece of room state.
    async fn set_room_state(&self, room: &RoomId, patch: &RoomStatePatch) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FixSettings {
    pub name_suffix: String,
    pub tie_break: TieBreak,
}

impl Default for FixSettings {
    fn default() -> Self {
        Self {
            name_suffix: DEFAULT_NAME_SUFFIX.to_owned(),
            tie_break: TieBreak::default(),
        }
    }
}

#[derive(Debug)]
pub struct FixSummary {
    pub counterpart: ResolvedCounterpart,
    pub applied: Vec<RoomStatePatch>,
}

/// Find the friend in `room` and copy their name and avatar onto it.
///
/// Calls the homeserver strictly in sequence: joined members, own display
/// name, then up to two state writes.
///
/// # Errors
///
/// Fails on any homeserver error, on a member count other than three, on an
/// ambiguous friend when [`TieBreak::RejectAmbiguous`] is set, and when a state
/// write fails (after both writes were attempted).
#[instrument(skip_all, fields(room = %room))]
pub async fn fix_room<H>(
    homeserver: &H,
    room: &RoomId,
    own_user_id: &UserId,
    settings: &FixSettings,
) -> Result<FixSummary, FixError>
where
    H: Homeserver + ?Sized,
{
    let members = homeserver
        .joined_members(room)
        .await
        .with_context(|| format!("fetching joined members of {room}"))?;
    let own_display_name = homeserver
        .own_display_name()
        .await
        .context("fetching own display name")?;

    let counterpart = resolve(
        room,
        own_user_id,
        own_display_name.as_deref(),
        &members,
        settings.tie_break,
    )?;
    if counterpart.is_empty() {
        warn!("No joined member looks like the friend");
    } else {
        info!(
            display_name = ?counterpart.display_name,
            avatar_url = ?counterpart.avatar_url,
            "Found the friend"
        );
    }

    let applied = reconcile(homeserver, room, &counterpart, &settings.name_suffix)
        .await
        .into_result()?;

    Ok(FixSummary {
        counterpart,
        applied,
    })
}


#[cfg(test)]
mod tests {
    use matrix_sdk::ruma::{owned_room_id, owned_user_id};

    use super::*;
    use crate::testing::{FakeHomeserver, member};

    fn bridged_room(own: &str, friend: Option<&str>, avatar: Option<&str>) -> FakeHomeserver {
        FakeHomeserver {
            members: vec![
                member("@alice:example.org", Some(own), None),
                member("@facebook_100004:example.org", friend, avatar),
                member("@facebookbot:example.org", None, None),
            ],
            own_display_name: Some(own.to_owned()),
            ..FakeHomeserver::default()
        }
    }

    #[tokio::test]
    async fn fixes_a_bridged_room() {
        let hs = bridged_room("Alice", Some("Bob"), Some("mxc://avatar1"));
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");

        let summary = fix_room(&hs, &room, &own, &FixSettings::default())
            .await
            .unwrap();

        assert_eq!(summary.counterpart.display_name.as_deref(), Some("Bob"));
        assert_eq!(
            hs.writes(),
            vec![
                RoomStatePatch::avatar("mxc://avatar1"),
                RoomStatePatch::name("Bob", "(Facebook)"),
            ]
        );
        assert_eq!(hs.state(PatchKind::Name).as_deref(), Some("Bob (Facebook)"));
    }

    #[tokio::test]
    async fn two_members_means_no_writes() {
        let mut hs = bridged_room("Alice", Some("Bob"), Some("mxc://avatar1"));
        hs.members.pop();
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");

        let err = fix_room(&hs, &room, &own, &FixSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FixError::InvalidMemberCount { count: 2, .. }));
        assert!(hs.writes().is_empty());
    }

    #[tokio::test]
    async fn no_friend_is_a_soft_outcome() {
        let hs = bridged_room("Alice", None, None);
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");

        let summary = fix_room(&hs, &room, &own, &FixSettings::default())
            .await
            .unwrap();

        assert!(summary.counterpart.is_empty());
        assert!(summary.applied.is_empty());
        assert!(hs.writes().is_empty());
    }

    #[tokio::test]
    async fn custom_suffix_is_used() {
        let hs = bridged_room("Alice", Some("Jane"), None);
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");
        let settings = FixSettings {
            name_suffix: "[Messenger]".to_owned(),
            ..FixSettings::default()
        };

        let summary = fix_room(&hs, &room, &own, &settings).await.unwrap();

        assert_eq!(summary.applied, vec![RoomStatePatch::name("Jane", "[Messenger]")]);
        assert_eq!(hs.state(PatchKind::Name).as_deref(), Some("Jane [Messenger]"));
    }

    #[tokio::test]
    async fn membership_query_failure_is_a_collaborator_error() {
        let hs = FakeHomeserver {
            fail_members: true,
            ..FakeHomeserver::default()
        };
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");

        let err = fix_room(&hs, &room, &own, &FixSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FixError::Collaborator(_)));
        assert!(!err.is_usage());
    }

    #[tokio::test]
    async fn failed_name_write_is_reported_after_avatar_lands() {
        let mut hs = bridged_room("Alice", Some("Bob"), Some("mxc://avatar1"));
        hs.fail_kind = Some(PatchKind::Name);
        let room = owned_room_id!("!ZUFHhmRzEyUdzljKRz:example.org");
        let own = owned_user_id!("@alice:example.org");

        let err = fix_room(&hs, &room, &own, &FixSettings::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FixError::StateWriteFailed {
                kind: PatchKind::Name,
                ..
            }
        ));
        assert_eq!(hs.state(PatchKind::Avatar).as_deref(), Some("mxc://avatar1"));
    }
}
