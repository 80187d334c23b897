use anyhow::{Context as _, Result};
use matrix_sdk::ruma::{OwnedRoomId, OwnedUserId, RoomId, UserId};

use crate::FixError;

/// Build `!{localpart}:{server_name}`.
///
/// The localpart must be non-empty. In strict mode it must also start with an
/// ASCII letter.
///
/// # Errors
///
/// Returns [`FixError::InvalidRoomLocalpart`] when the localpart is rejected or
/// the resulting string isn't a valid room ID.
pub fn room_id_from_localpart(
    localpart: &str,
    server_name: &str,
    strict: bool,
) -> Result<OwnedRoomId, FixError> {
    validate_room_localpart(localpart, strict)?;
    RoomId::parse(format!("!{localpart}:{server_name}")).map_err(|_| {
        FixError::InvalidRoomLocalpart {
            localpart: localpart.to_owned(),
            strict,
        }
    })
}

/// Check a room ID localpart on its own, before any server name is known.
///
/// # Errors
///
/// Returns [`FixError::InvalidRoomLocalpart`] for an empty localpart, or in
/// strict mode for one that doesn't start with an ASCII letter.
pub fn validate_room_localpart(localpart: &str, strict: bool) -> Result<(), FixError> {
    let valid = !localpart.is_empty()
        && (!strict || localpart.starts_with(|c: char| c.is_ascii_alphabetic()));
    if valid {
        Ok(())
    } else {
        Err(FixError::InvalidRoomLocalpart {
            localpart: localpart.to_owned(),
            strict,
        })
    }
}

/// Build `@{localpart}:{server_name}` for the operating account.
///
/// # Errors
///
/// Returns an error if the configured parts don't form a valid user ID.
pub fn user_id_from_localpart(localpart: &str, server_name: &str) -> Result<OwnedUserId> {
    UserId::parse(format!("@{localpart}:{server_name}"))
        .with_context(|| format!("invalid user ID for localpart {localpart:?} on {server_name}"))
}
