use anyhow::{Context as _, Result};
use async_trait::async_trait;
use fixer_core::{Homeserver, MemberRecord, PatchKind, RoomStatePatch};
use matrix_sdk::{
    Client, SessionMeta,
    authentication::{SessionTokens, matrix::MatrixSession},
    ruma::{
        OwnedUserId, RoomId,
        api::client::{membership::joined_members, state::send_state_event},
        events::{
            EmptyStateKey,
            room::{avatar::RoomAvatarEventContent, name::RoomNameEventContent},
        },
    },
};
use tracing::{debug, info};

use crate::config::MatrixConfig;

/// Device ID used to restore the session when the config doesn't name one.
const DEFAULT_DEVICE_ID: &str = "MATRIXROOMFIXER";

/// Talks to the homeserver with an existing access token. Never syncs.
#[derive(Debug)]
pub(crate) struct MatrixHomeserver {
    client: Client,
}

impl MatrixHomeserver {
    pub(crate) async fn connect(config: &MatrixConfig, user_id: OwnedUserId) -> Result<Self> {
        let client = Client::builder()
            .homeserver_url(&config.homeserver_url)
            .build()
            .await
            .context("building matrix client")?;

        let device_id = config
            .device_id
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_owned());
        info!(user_id = %user_id, homeserver = %config.homeserver_url, "Restoring session");
        let session = MatrixSession {
            meta: SessionMeta {
                user_id,
                device_id: device_id.into(),
            },
            tokens: SessionTokens {
                access_token: config.access_token.clone(),
                refresh_token: None,
            },
        };
        client
            .restore_session(session)
            .await
            .context("restoring session from access token")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Homeserver for MatrixHomeserver {
    async fn joined_members(&self, room: &RoomId) -> Result<Vec<MemberRecord>> {
        let request = joined_members::v3::Request::new(room.to_owned());
        let response = self
            .client
            .send(request)
            .await
            .context("joined_members request failed")?;
        debug!(room = %room, count = response.joined.len(), "Fetched joined members");

        Ok(response
            .joined
            .into_iter()
            .map(|(user_id, member)| MemberRecord {
                user_id,
                display_name: member.display_name,
                avatar_url: member.avatar_url.map(|url| url.to_string()),
            })
            .collect())
    }

    async fn own_display_name(&self) -> Result<Option<String>> {
        self.client
            .account()
            .get_display_name()
            .await
            .context("display name request failed")
    }

    async fn set_room_state(&self, room: &RoomId, patch: &RoomStatePatch) -> Result<()> {
        let request = match patch.kind {
            PatchKind::Avatar => {
                let mut content = RoomAvatarEventContent::new();
                content.url = Some(patch.value.as_str().into());
                send_state_event::v3::Request::new(room.to_owned(), &EmptyStateKey, &content)
            }
            PatchKind::Name => send_state_event::v3::Request::new(
                room.to_owned(),
                &EmptyStateKey,
                &RoomNameEventContent::new(patch.value.clone()),
            ),
        }
        .with_context(|| format!("serializing {} content", patch.kind.event_type()))?;

        let response = self
            .client
            .send(request)
            .await
            .with_context(|| format!("sending {} state event", patch.kind.event_type()))?;
        debug!(room = %room, event_id = %response.event_id, kind = %patch.kind, "State event sent");
        Ok(())
    }
}
