//! Media-group deduplication.
//!
//! An album arrives as one transport message per photo, all sharing a media
//! group id. Only the first message of an album is run through extraction.

use crate::session::Session;

/// `false` when `incoming` names the album that was already processed.
pub fn should_process(session: &Session, incoming: Option<&str>) -> bool {
    match incoming {
        None => true,
        Some(group) => session.pending_media_group_id.as_deref() != Some(group),
    }
}

/// Remember the album being processed. Ungrouped photos leave the record alone.
pub fn mark_processed(session: &mut Session, incoming: Option<&str>) {
    if let Some(group) = incoming {
        session.pending_media_group_id = Some(group.to_string());
    }
}

/// Forget the album so a resend after a failure is not swallowed.
pub fn forget(session: &mut Session) {
    session.pending_media_group_id = None;
}
