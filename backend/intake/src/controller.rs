//! Conversation controller: applies inbound events to the user's session and
//! issues record writes.
//!
//! ```text
//! AwaitingBooking --text--> AwaitingPhoto --photo--> AwaitingBeams
//!     --count--> AwaitingAddons --count--> AwaitingSheets --count--> (done)
//! ```
//!
//! `Start` jumps to `AwaitingBooking` from anywhere. Failed writes never
//! advance the state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Local;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use flexscan_core::{
    ExtractionResult, FlexscanError, IdentifierExtractor, IdentifierKind, Inbound, InboundEvent,
    MediaSource, NewRecord, RecordField, RecordRef, RecordStore, Submitter, START_ENTRY_BUTTON,
};

use crate::dedup;
use crate::policy::AccessPolicy;
use crate::replies::{FieldOutcome, Prompt, Reply};
use crate::session::{DialogueState, Session, SessionSlot, SessionStore};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Bound on every record store call.
    pub persistence_timeout: Duration,
    /// Bound on downloading a photo.
    pub media_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            persistence_timeout: Duration::from_secs(15),
            media_timeout: Duration::from_secs(30),
        }
    }
}

/// Grammar for beams, addons, and sheets: ASCII digits only.
pub fn is_count(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}

pub struct Controller {
    sessions: Arc<SessionStore>,
    store: Arc<dyn RecordStore>,
    extractor: Arc<dyn IdentifierExtractor>,
    media: Arc<dyn MediaSource>,
    policy: AccessPolicy,
    config: ControllerConfig,
}

impl Controller {
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn RecordStore>,
        extractor: Arc<dyn IdentifierExtractor>,
        media: Arc<dyn MediaSource>,
    ) -> Self {
        Self {
            sessions,
            store,
            extractor,
            media,
            policy: AccessPolicy::open(),
            config: ControllerConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: AccessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound event and return the replies to send.
    pub async fn handle(&self, inbound: Inbound) -> Vec<Reply> {
        let Inbound { submitter, event } = inbound;
        let user = submitter.id;

        if !self.policy.is_allowed(user) {
            return vec![Prompt::Unauthorized.into()];
        }

        debug!(user, event = event.label(), "Handling event");
        let prompts = match event {
            InboundEvent::Start => self.restart(user, Prompt::Welcome).await,
            InboundEvent::ButtonPressed { data } if data == START_ENTRY_BUTTON => {
                self.restart(user, Prompt::AskBooking).await
            }
            InboundEvent::ButtonPressed { data } => {
                debug!(user, data = %data, "Ignoring unknown button");
                vec![Prompt::StartFirst]
            }
            InboundEvent::Cancel => self.cancel(user).await,
            InboundEvent::TextMessage { body } => self.on_text(&submitter, &body).await,
            InboundEvent::PhotoMessage { image_ref, media_group_id } => {
                self.on_photo(user, &image_ref, media_group_id.as_deref()).await
            }
        };

        self.sessions.prune(user);
        prompts.into_iter().map(Reply::from).collect()
    }

    /// Called by transports as an event arrives, before it waits its turn.
    /// Restarting events supersede the user's in-flight extraction so a
    /// stale result is discarded instead of delaying the restart. Returns
    /// whether a supersession happened.
    pub fn interrupt(&self, inbound: &Inbound) -> bool {
        let restarts = match &inbound.event {
            InboundEvent::Start | InboundEvent::Cancel => true,
            InboundEvent::ButtonPressed { data } => data == START_ENTRY_BUTTON,
            _ => false,
        };
        let user = inbound.submitter.id;
        if !restarts || !self.policy.permits(user) {
            return false;
        }
        self.sessions.supersede(user);
        true
    }

    /// Abandon whatever the user was doing and ask for a booking.
    async fn restart(&self, user: u64, reply: Prompt) -> Vec<Prompt> {
        // Bump before queueing on the lock so an in-flight extraction stops now.
        self.sessions.supersede(user);
        let slot = self.sessions.slot(user);
        let mut guard = slot.lock().await;
        if let Some(record) = guard.as_ref().and_then(|s| s.record_ref) {
            info!(user, record = %record, "Abandoning unfinished record");
        }
        *guard = Some(Session::awaiting_booking());
        vec![reply]
    }

    async fn cancel(&self, user: u64) -> Vec<Prompt> {
        self.sessions.supersede(user);
        let slot = self.sessions.slot(user);
        let mut guard = slot.lock().await;
        if guard.take().is_some() {
            info!(user, "Session cancelled");
        }
        vec![Prompt::Cancelled]
    }

    async fn on_text(&self, submitter: &Submitter, body: &str) -> Vec<Prompt> {
        let slot = self.sessions.slot(submitter.id);
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut() else {
            return vec![Prompt::StartFirst];
        };

        match session.state {
            DialogueState::AwaitingBooking => self.save_booking(session, submitter, body).await,
            DialogueState::AwaitingPhoto => vec![Prompt::SendPhoto],
            state if state.is_count_step() => {
                let finished = match self.save_count(session, submitter.id, body).await {
                    Ok(finished) => finished,
                    Err(prompt) => return vec![prompt],
                };
                match finished {
                    Some(booking) => {
                        *guard = None;
                        info!(user = submitter.id, "All fields collected");
                        vec![Prompt::AllSaved { booking }]
                    }
                    None => vec![Prompt::Ask(session.state)],
                }
            }
            _ => vec![Prompt::StartFirst],
        }
    }

    async fn save_booking(
        &self,
        session: &mut Session,
        submitter: &Submitter,
        body: &str,
    ) -> Vec<Prompt> {
        if body.trim().is_empty() {
            return vec![Prompt::EmptyBooking];
        }

        let record = NewRecord {
            timestamp: Local::now().naive_local(),
            booking: body.to_string(),
            submitter: submitter.display_name().to_string(),
        };
        match self.persist("create record", self.store.create_record(&record)).await {
            Ok(record_ref) => {
                info!(user = submitter.id, record = %record_ref, "Booking saved");
                session.record_ref = Some(record_ref);
                session.booking = Some(record.booking);
                session.state = DialogueState::AwaitingPhoto;
                vec![Prompt::BookingSaved]
            }
            Err(e) => {
                error!(user = submitter.id, error = %e, "Failed to create record");
                vec![Prompt::SaveFailed]
            }
        }
    }

    /// Write one count. `Ok(Some(booking))` when it was the last one,
    /// `Ok(None)` when the session advanced to the next count.
    async fn save_count(
        &self,
        session: &mut Session,
        user: u64,
        body: &str,
    ) -> Result<Option<String>, Prompt> {
        let value = body.trim();
        if !is_count(value) {
            return Err(Prompt::NumberRequired);
        }

        let (field, next) = match session.state {
            DialogueState::AwaitingBeams => (RecordField::Beams, Some(DialogueState::AwaitingAddons)),
            DialogueState::AwaitingAddons => (RecordField::Addons, Some(DialogueState::AwaitingSheets)),
            _ => (RecordField::Sheets, None),
        };
        let record = self.record_of(session, user)?;

        if let Err(e) = self
            .persist("update field", self.store.update_field(record, field, value))
            .await
        {
            error!(user, record = %record, field = %field, error = %e, "Failed to save count");
            return Err(Prompt::SaveFailed);
        }
        debug!(user, record = %record, field = %field, "Count saved");

        match next {
            Some(state) => {
                session.state = state;
                Ok(None)
            }
            None => Ok(Some(session.booking.clone().unwrap_or_default())),
        }
    }

    async fn on_photo(&self, user: u64, image_ref: &str, group: Option<&str>) -> Vec<Prompt> {
        let slot = self.sessions.slot(user);
        let mut guard = slot.lock().await;
        let Some(session) = guard.as_mut() else {
            return vec![Prompt::PhotoBeforeBooking];
        };

        if !dedup::should_process(session, group) {
            debug!(user, group = ?group, "Skipping photo from processed album");
            return Vec::new();
        }
        match session.state {
            DialogueState::AwaitingPhoto => {}
            state if state.is_count_step() => return vec![Prompt::PhotoAlreadyProcessed(state)],
            _ => return vec![Prompt::PhotoBeforeBooking],
        }
        let record = match self.record_of(session, user) {
            Ok(record) => record,
            Err(prompt) => {
                *guard = None;
                return vec![prompt];
            }
        };

        dedup::mark_processed(session, group);
        let generation = slot.generation();

        let image = match self.fetch(image_ref).await {
            Ok(image) => image,
            Err(e) => {
                warn!(user, error = %e, "Photo download failed");
                dedup::forget(session);
                return vec![Prompt::DownloadFailed];
            }
        };

        let Some(results) = self.extract_pending(&slot, generation, session, image).await else {
            info!(user, generation, "Discarding extraction for superseded session");
            return Vec::new();
        };

        let mut outcomes = Vec::with_capacity(IdentifierKind::ALL.len());
        let mut failed = false;
        for kind in IdentifierKind::ALL {
            let outcome = match results.iter().find(|(k, _)| *k == kind) {
                None => FieldOutcome::AlreadySaved,
                Some((_, result)) => match self.write_identifier(session, record, kind, result).await {
                    Ok(outcome) => {
                        if outcome != FieldOutcome::NotFound {
                            session.captured.insert(kind);
                        }
                        outcome
                    }
                    Err(e) => {
                        error!(user, record = %record, kind = %kind, error = %e, "Failed to save identifier");
                        failed = true;
                        continue;
                    }
                },
            };
            outcomes.push((kind, outcome));
        }

        if failed {
            dedup::forget(session);
            return vec![Prompt::PhotoSaveFailed];
        }

        session.state = DialogueState::AwaitingBeams;
        vec![Prompt::PhotoProcessed(outcomes)]
    }

    /// Run extraction for every identifier not yet captured, concurrently.
    /// `None` when the session was superseded while waiting.
    async fn extract_pending(
        &self,
        slot: &SessionSlot,
        generation: u64,
        session: &Session,
        image: Bytes,
    ) -> Option<Vec<(IdentifierKind, ExtractionResult)>> {
        let pending: Vec<IdentifierKind> = IdentifierKind::ALL
            .into_iter()
            .filter(|kind| !session.captured.contains(kind))
            .collect();

        let extraction = join_all(pending.into_iter().map(|kind| {
            let image = image.clone();
            async move { (kind, self.extractor.extract(image, kind).await) }
        }));

        tokio::select! {
            results = extraction => Some(results),
            _ = slot.superseded(generation) => None,
        }
    }

    /// Persist one extraction result. A token flagged for review gets its note
    /// written first, so the token never lands without the flag. A validated
    /// token clears a note left by an earlier failed pass.
    async fn write_identifier(
        &self,
        session: &mut Session,
        record: RecordRef,
        kind: IdentifierKind,
        result: &ExtractionResult,
    ) -> Result<FieldOutcome, FlexscanError> {
        let (token, outcome) = match result {
            ExtractionResult::NotFound => return Ok(FieldOutcome::NotFound),
            ExtractionResult::Validated(token) => (token, FieldOutcome::Saved(token.clone())),
            ExtractionResult::NeedsReview { token, expected } => {
                let note = format!(
                    "{kind} check digit mismatch: read {token}, expected check digit {expected}"
                );
                self.persist(
                    "update field",
                    self.store.update_field(record, RecordField::Review, &note),
                )
                .await?;
                session.review_noted = Some(kind);
                (token, FieldOutcome::SavedForReview { token: token.clone(), expected: *expected })
            }
        };

        self.persist("update field", self.store.update_field(record, kind.field(), token))
            .await?;

        if !result.needs_review() && session.review_noted == Some(kind) {
            self.persist("update field", self.store.update_field(record, RecordField::Review, ""))
                .await?;
            session.review_noted = None;
            debug!(record = %record, kind = %kind, "Cleared stale review note");
        }
        Ok(outcome)
    }

    fn record_of(&self, session: &Session, user: u64) -> Result<RecordRef, Prompt> {
        session.record_ref.ok_or_else(|| {
            error!(user, state = ?session.state, "Session has no record, resetting");
            Prompt::StartFirst
        })
    }

    async fn fetch(&self, image_ref: &str) -> Result<Bytes, FlexscanError> {
        let timeout = self.config.media_timeout;
        tokio::time::timeout(timeout, self.media.fetch(image_ref))
            .await
            .unwrap_or_else(|_| Err(FlexscanError::timeout("photo download", timeout.as_millis() as u64)))
    }

    async fn persist<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, FlexscanError>>,
    ) -> Result<T, FlexscanError> {
        let timeout = self.config.persistence_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or_else(|_| Err(FlexscanError::timeout(operation, timeout.as_millis() as u64)))
    }
}
