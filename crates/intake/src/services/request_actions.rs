//! Request lifecycle orchestration.
//!
//! Drives every transition a Slack interaction can cause:
//! 1. Submission creates a pending request, notifies admins and persists it
//! 2. Approve, reject and request-info start from the admin notification
//! 3. Status updates, details and the checklist start from the request channel
//!
//! Admin-only actions check the actor first; a non-admin gets a private
//! notice and nothing changes. Approve and reject require the request to
//! still be pending, so a repeated click is answered with the current status
//! instead of a second transition.
//!
//! When a request clicked in the admin notification cannot be found, it is
//! rebuilt from the notification itself and saved again before the action
//! continues. If that fails too, the notification loses its buttons.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sape_core::validation::sanitize_project_name;
use sape_core::{
    ChannelId, ChecklistItem, Choice, FullReport, ListStatus, MessageTs, Request, RequestId,
    RequestKind, RequestPatch, RequestStatus, StatusHistoryEntry, UserId,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::AppError;
use crate::lists::LIST_NAME;
use crate::slack::messages::{self, CHECKLIST_BLOCK_PREFIX};
use crate::slack::modals::{self, field};
use crate::slack::{
    InteractionMessage, Messenger, OutgoingMessage, PrivateMetadata, ViewState,
};
use crate::store::{RequestStore, StoreError, reconstruct, safe_validate};
use crate::tracker::CardTracker;

const UNNAMED_PROJECT: &str = "Uten navn";
const NO_REASON: &str = "Ingen begrunnelse oppgitt.";

/// Bounded retry for reads that may race a preceding write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl LookupPolicy {
    /// Three attempts, 500 ms apart.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }

    /// No waiting between attempts.
    #[must_use]
    pub const fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            delay: Duration::ZERO,
        }
    }
}

impl Default for LookupPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// What an action ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action took effect (or its modal was opened).
    Applied,
    /// The request had already left the state the action needs.
    AlreadyHandled(RequestStatus),
    /// The actor may not perform this action.
    Denied,
    /// The request could not be found or rebuilt.
    NotFound,
}

/// A click on an interactive message element.
#[derive(Debug, Clone, Default)]
pub struct ButtonClick {
    /// Slack user id of whoever clicked.
    pub user: String,
    pub trigger_id: Option<String>,
    /// Channel of the message the element lives in.
    pub channel_id: Option<String>,
    /// The message the element lives in.
    pub message: Option<InteractionMessage>,
    pub block_id: Option<String>,
    /// Button value; the request id for request buttons.
    pub value: Option<String>,
    /// Current checkbox selection.
    pub selected: Vec<String>,
}

impl ButtonClick {
    fn message_ts(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.ts.as_str())
    }

    fn private_metadata(&self, request_id: &RequestId) -> PrivateMetadata {
        PrivateMetadata {
            request_id: request_id.to_string(),
            channel_id: self.channel_id.clone(),
            message_ts: self.message_ts().map(str::to_owned),
        }
    }
}

/// A submitted modal.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Slack user id of whoever submitted.
    pub user: String,
    pub metadata: PrivateMetadata,
    pub state: ViewState,
}

/// Orchestrates request transitions.
pub struct RequestActions {
    store: Arc<RequestStore>,
    messenger: Arc<dyn Messenger>,
    tracker: Option<Arc<dyn CardTracker>>,
    admins: Vec<UserId>,
    admin_channel: ChannelId,
    lookup: LookupPolicy,
}

impl std::fmt::Debug for RequestActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestActions")
            .field("admins", &self.admins)
            .field("admin_channel", &self.admin_channel)
            .field("tracker", &self.tracker.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestActions {
    #[must_use]
    pub fn new(
        store: Arc<RequestStore>,
        messenger: Arc<dyn Messenger>,
        admins: Vec<UserId>,
        admin_channel: ChannelId,
    ) -> Self {
        Self {
            store,
            messenger,
            tracker: None,
            admins,
            admin_channel,
            lookup: LookupPolicy::standard(),
        }
    }

    /// Create a card for approvals that come without a ticket URL.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn CardTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    #[must_use]
    pub const fn with_lookup(mut self, lookup: LookupPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    #[must_use]
    pub fn is_admin(&self, user: &str) -> bool {
        self.admins.iter().any(|admin| admin.as_str() == user)
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Open the intake modal of a request kind.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened; the user is told by DM.
    #[instrument(skip(self, trigger_id))]
    pub async fn open_request_modal(
        &self,
        kind: RequestKind,
        user: &str,
        trigger_id: &str,
    ) -> Result<(), AppError> {
        if let Err(e) = self
            .messenger
            .open_view(trigger_id, modals::request_modal(kind))
            .await
        {
            self.direct(
                user,
                messages::build_notice(
                    "Beklager, det oppstod en feil da skjemaet skulle åpnes. Prøv igjen senere.",
                ),
            )
            .await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Handle a submitted intake modal.
    ///
    /// Posts the admin notification, persists the request and sends the
    /// requester a receipt. When the list cannot take the request it is kept
    /// in the cache.
    ///
    /// # Errors
    ///
    /// Returns error if the submitter id is invalid or the admin
    /// notification cannot be posted.
    #[instrument(skip(self, state))]
    pub async fn submit_request(
        &self,
        kind: RequestKind,
        user: &str,
        state: &ViewState,
    ) -> Result<Request, AppError> {
        let requested_by = UserId::parse(user)?;
        let mut request = request_from_state(kind, requested_by, state);
        info!(request_id = %request.request_id, "New request submitted");

        let posted = match self
            .messenger
            .post_message(
                self.admin_channel.as_str(),
                messages::build_admin_notification(&request),
            )
            .await
        {
            Ok(posted) => posted,
            Err(e) => {
                error!(error = %e, request_id = %request.request_id, "Failed to notify admins");
                self.direct(
                    user,
                    messages::build_notice(format!(
                        "Beklager, det oppstod en feil under behandling av {}-forespørselen din. \
                         Vennligst prøv igjen eller kontakt teamet direkte.",
                        messages::kind_noun(kind)
                    )),
                )
                .await;
                return Err(e.into());
            }
        };
        request.admin_message_ts = safe_validate(MessageTs::parse(posted.ts));

        self.persist_new(&mut request).await;

        self.direct(user, messages::build_submission_receipt(&request))
            .await;
        Ok(request)
    }

    /// Save a request, keeping it in the cache if the list refuses it.
    async fn persist_new(&self, request: &mut Request) {
        match self.store.save_request(request).await {
            Ok(row_id) => request.list_item_id = Some(row_id),
            Err(e) => {
                warn!(error = %e, request_id = %request.request_id, "Request kept in cache only");
                if let Err(e) = self
                    .store
                    .update_request(&request.request_id, request.to_patch())
                    .await
                {
                    debug!(error = %e, "Cache-only update reported a remote failure");
                }
            }
        }
    }

    // =========================================================================
    // Approve
    // =========================================================================

    /// Admin clicked approve: open the approval modal.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn begin_approve(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        if !self.gate(click).await {
            return Ok(ActionOutcome::Denied);
        }
        let Some(request) = self.resolve_notification(click).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if request.status != RequestStatus::Pending {
            self.reply_to_click(
                click,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        let metadata = click.private_metadata(&request.request_id);
        self.open_modal(click, modals::approve_modal(&metadata, request.kind))
            .await?;
        Ok(ActionOutcome::Applied)
    }

    /// Approval modal submitted: run the approval side effects.
    ///
    /// Every side effect is logged and skipped on failure. Without a channel
    /// the channel setup and welcome message are skipped and the approval
    /// goes on.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be read or the new status cannot
    /// be persisted.
    #[instrument(skip(self, submission), fields(user = %submission.user, request_id = %submission.metadata.request_id))]
    pub async fn approve(&self, submission: &Submission) -> Result<ActionOutcome, AppError> {
        let Some(approver) = self.gate_submission(submission).await else {
            return Ok(ActionOutcome::Denied);
        };
        let Some(mut request) = self.resolve_submission(submission).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if request.status != RequestStatus::Pending {
            self.reply_to_submission(
                submission,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        request.ticket_url = match submission.state.text(field::JIRA_URL.0, field::JIRA_URL.1) {
            Some(url) => Some(url),
            None => self.create_ticket(&request).await,
        };

        let name = channel_name(&request);
        let channel = match self.messenger.create_channel(&name, true).await {
            Ok(channel) => {
                info!(channel = %channel, name = %name, "Request channel created");
                Some(channel)
            }
            Err(e) => {
                warn!(error = %e, channel = %name, "Failed to create request channel");
                None
            }
        };

        let now = Utc::now();
        request.status = RequestStatus::Approved;
        request.channel_id = channel
            .as_deref()
            .and_then(|channel| safe_validate(ChannelId::parse(channel)));
        request.approved_by = Some(approver.clone());
        request.approved_at = Some(now);

        if let Some(channel) = &channel {
            self.setup_channel(&request, channel).await;

            if let Err(e) = self
                .messenger
                .post_message(channel, messages::build_welcome_message(&request, &approver))
                .await
            {
                warn!(error = %e, "Failed to post welcome message");
            }
        }

        self.update_notification(
            submission,
            &request,
            messages::build_approved_message(&request, &approver, channel.as_deref()),
        )
        .await;

        self.direct(
            request.requested_by.as_str(),
            messages::build_requester_approved_dm(&request, channel.as_deref()),
        )
        .await;

        let patch = RequestPatch {
            status: Some(RequestStatus::Approved),
            channel_id: request.channel_id.clone(),
            approved_by: Some(approver),
            approved_at: Some(now),
            ticket_url: request.ticket_url.clone(),
            provenance: Some(request.provenance),
            ..RequestPatch::default()
        };
        self.store
            .update_request(&request.request_id, patch)
            .await?;

        info!(request_id = %request.request_id, channel = ?channel, "Request approved");
        Ok(ActionOutcome::Applied)
    }

    async fn create_ticket(&self, request: &Request) -> Option<String> {
        let tracker = self.tracker.as_ref()?;
        let name = format!(
            "{}: {}",
            messages::kind_noun(request.kind),
            request.project_name
        );
        let description = format!(
            "{}\nForespurt av: {}\n\n{}\n\n{}",
            request.request_id, request.requested_by, request.target_scope, request.additional_info
        );
        match tracker.create_card(&name, &description).await {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(error = %e, "Failed to create tracker card");
                None
            }
        }
    }

    /// Topic, purpose and invites for a fresh request channel.
    async fn setup_channel(&self, request: &Request, channel: &str) {
        if let Err(e) = self
            .messenger
            .set_channel_topic(channel, &messages::channel_topic(request, request.status))
            .await
        {
            warn!(error = %e, "Failed to set channel topic");
        }
        if let Err(e) = self
            .messenger
            .set_channel_purpose(channel, &messages::channel_purpose(request))
            .await
        {
            warn!(error = %e, "Failed to set channel purpose");
        }

        let mut invitees = request.participants();
        for admin in &self.admins {
            if !invitees.contains(admin) {
                invitees.push(admin.clone());
            }
        }
        for user in invitees {
            if let Err(e) = self
                .messenger
                .invite_to_channel(channel, std::slice::from_ref(&user.to_string()))
                .await
            {
                warn!(error = %e, user = %user, "Failed to invite user to request channel");
            }
        }
    }

    // =========================================================================
    // Reject
    // =========================================================================

    /// Admin clicked reject: open the rejection modal.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn begin_reject(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        if !self.gate(click).await {
            return Ok(ActionOutcome::Denied);
        }
        let Some(request) = self.resolve_notification(click).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if request.status != RequestStatus::Pending {
            self.reply_to_click(
                click,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        let metadata = click.private_metadata(&request.request_id);
        self.open_modal(click, modals::reject_modal(&metadata)).await?;
        Ok(ActionOutcome::Applied)
    }

    /// Rejection modal submitted.
    ///
    /// # Errors
    ///
    /// Returns error if the new status cannot be persisted.
    #[instrument(skip(self, submission), fields(user = %submission.user, request_id = %submission.metadata.request_id))]
    pub async fn reject(&self, submission: &Submission) -> Result<ActionOutcome, AppError> {
        let Some(rejector) = self.gate_submission(submission).await else {
            return Ok(ActionOutcome::Denied);
        };
        let Some(mut request) = self.resolve_submission(submission).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if request.status != RequestStatus::Pending {
            self.reply_to_submission(
                submission,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        let reason = submission
            .state
            .text(field::REJECTION_REASON.0, field::REJECTION_REASON.1)
            .unwrap_or_else(|| NO_REASON.to_string());
        let now = Utc::now();
        request.status = RequestStatus::Rejected;

        self.update_notification(
            submission,
            &request,
            messages::build_rejected_message(&request, &rejector, &reason),
        )
        .await;
        self.direct(
            request.requested_by.as_str(),
            messages::build_requester_rejected_dm(&request, &reason),
        )
        .await;

        let patch = RequestPatch {
            status: Some(RequestStatus::Rejected),
            rejected_by: Some(rejector),
            rejected_at: Some(now),
            rejection_reason: Some(reason),
            ..RequestPatch::default()
        };
        self.store
            .update_request(&request.request_id, patch)
            .await?;

        info!(request_id = %request.request_id, "Request rejected");
        Ok(ActionOutcome::Applied)
    }

    // =========================================================================
    // Request info / reply
    // =========================================================================

    /// Admin clicked request-info: open the question modal.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn begin_request_info(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        if !self.gate(click).await {
            return Ok(ActionOutcome::Denied);
        }
        let Some(request) = self.resolve_notification(click).await? else {
            return Ok(ActionOutcome::NotFound);
        };

        let metadata = click.private_metadata(&request.request_id);
        self.open_modal(click, modals::request_info_modal(&metadata))
            .await?;
        Ok(ActionOutcome::Applied)
    }

    /// Question submitted: DM the requester and log it under the notification.
    ///
    /// # Errors
    ///
    /// Returns error if the question is empty. Delivery failures are logged.
    #[instrument(skip(self, submission), fields(user = %submission.user, request_id = %submission.metadata.request_id))]
    pub async fn request_info(&self, submission: &Submission) -> Result<ActionOutcome, AppError> {
        let Some(admin) = self.gate_submission(submission).await else {
            return Ok(ActionOutcome::Denied);
        };
        let Some(request) = self.resolve_submission(submission).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        let Some(question) = submission
            .state
            .text(field::INFO_REQUEST.0, field::INFO_REQUEST.1)
        else {
            return Err(AppError::BadRequest("empty info request".to_string()));
        };

        self.direct(
            request.requested_by.as_str(),
            messages::build_info_request_dm(&request, &admin, &question),
        )
        .await;

        let thread = submission
            .metadata
            .message_ts
            .as_deref()
            .and_then(|ts| MessageTs::parse(ts).ok())
            .or_else(|| request.admin_message_ts.clone());
        if let Some(ts) = thread {
            let channel = submission
                .metadata
                .channel_id
                .as_deref()
                .unwrap_or_else(|| self.admin_channel.as_str());
            if let Err(e) = self
                .messenger
                .post_message(
                    channel,
                    messages::build_info_request_thread(&admin, &question, &ts),
                )
                .await
            {
                warn!(error = %e, "Failed to log info request in notification thread");
            }
        }

        info!(request_id = %request.request_id, "Requested more information");
        Ok(ActionOutcome::Applied)
    }

    /// Requester clicked reply in the info-request DM.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn begin_reply(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        let Some(request_id) = click_request_id(click) else {
            return Ok(ActionOutcome::NotFound);
        };
        let metadata = click.private_metadata(&request_id);
        self.open_modal(click, modals::reply_modal(&metadata)).await?;
        Ok(ActionOutcome::Applied)
    }

    /// Reply submitted: post it under the admin notification.
    ///
    /// # Errors
    ///
    /// Returns error if the reply cannot be posted.
    #[instrument(skip(self, submission), fields(user = %submission.user, request_id = %submission.metadata.request_id))]
    pub async fn reply(&self, submission: &Submission) -> Result<ActionOutcome, AppError> {
        let user = UserId::parse(submission.user.as_str())?;
        let Some(request) = self.resolve_submission(submission).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        let Some(reply) = submission
            .state
            .text(field::REPLY_MESSAGE.0, field::REPLY_MESSAGE.1)
        else {
            return Err(AppError::BadRequest("empty reply".to_string()));
        };

        self.messenger
            .post_message(
                self.admin_channel.as_str(),
                messages::build_reply_thread(&user, &reply, request.admin_message_ts.as_ref()),
            )
            .await?;
        self.direct(
            user.as_str(),
            messages::build_notice(format!(
                "✅ Svaret ditt på {} er sendt til AppSec.",
                request.request_id
            )),
        )
        .await;

        Ok(ActionOutcome::Applied)
    }

    // =========================================================================
    // Request channel
    // =========================================================================

    /// Admin clicked update-status in the request channel.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn begin_status_update(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        if !self.gate(click).await {
            return Ok(ActionOutcome::Denied);
        }
        let Some(request) = self.resolve_plain(click).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if !request.status.accepts_status_update() {
            self.reply_to_click(
                click,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        let metadata = click.private_metadata(&request.request_id);
        self.open_modal(click, modals::status_update_modal(&metadata))
            .await?;
        Ok(ActionOutcome::Applied)
    }

    /// Status update submitted.
    ///
    /// Sets the channel topic, records history, persists, then posts the
    /// update in the channel.
    ///
    /// # Errors
    ///
    /// Returns error if the status is missing or cannot be persisted.
    #[instrument(skip(self, submission), fields(user = %submission.user, request_id = %submission.metadata.request_id))]
    pub async fn update_status(&self, submission: &Submission) -> Result<ActionOutcome, AppError> {
        let Some(admin) = self.gate_submission(submission).await else {
            return Ok(ActionOutcome::Denied);
        };
        let Some(request) = self.resolve_submission(submission).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if !request.status.accepts_status_update() {
            self.reply_to_submission(
                submission,
                messages::build_already_handled_notice(request.request_id.as_str(), request.status),
            )
            .await;
            return Ok(ActionOutcome::AlreadyHandled(request.status));
        }

        let status = submission
            .state
            .selected(field::STATUS.0, field::STATUS.1)
            .and_then(|option| option.value.parse::<RequestStatus>().ok())
            .ok_or_else(|| AppError::BadRequest("missing status".to_string()))?;
        let note = submission
            .state
            .text(field::STATUS_NOTE.0, field::STATUS_NOTE.1);

        let channel = request
            .channel_id
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| submission.metadata.channel_id.clone());

        if let Some(channel) = &channel {
            if let Err(e) = self
                .messenger
                .set_channel_topic(channel, &messages::channel_topic(&request, status))
                .await
            {
                warn!(error = %e, "Failed to update channel topic");
            }
        }

        self.store
            .add_status_history(
                &request.request_id,
                StatusHistoryEntry {
                    status,
                    status_text: status.label().to_string(),
                    updated_by: admin.clone(),
                    note: note.clone(),
                    timestamp: Utc::now(),
                },
            )
            .await;

        self.store
            .update_request(&request.request_id, RequestPatch::status(status))
            .await?;

        if let Some(channel) = &channel {
            if let Err(e) = self
                .messenger
                .post_message(
                    channel,
                    messages::build_status_update_message(&request, status, &admin, note.as_deref()),
                )
                .await
            {
                warn!(error = %e, "Failed to post status update");
            }
        }

        info!(request_id = %request.request_id, status = %status, "Request status updated");
        Ok(ActionOutcome::Applied)
    }

    /// Show a request and its status history.
    ///
    /// # Errors
    ///
    /// Returns error if the modal cannot be opened.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn view_details(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        let Some(request) = self.resolve_plain(click).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        let history = self.store.status_history(&request.request_id).await;
        self.open_modal(click, modals::request_details_modal(&request, &history))
            .await?;
        Ok(ActionOutcome::Applied)
    }

    /// The requester checklist changed: remember it and re-render the message.
    ///
    /// # Errors
    ///
    /// Returns error if the checklist cannot be stored.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn toggle_checklist(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        let Some(request_id) = click
            .block_id
            .as_deref()
            .and_then(|block| block.strip_prefix(CHECKLIST_BLOCK_PREFIX))
            .and_then(|id| RequestId::parse(id).ok())
        else {
            warn!(block_id = ?click.block_id, "Checklist toggle without request id");
            return Ok(ActionOutcome::NotFound);
        };

        let checklist: Vec<ChecklistItem> = click
            .selected
            .iter()
            .filter_map(|code| ChecklistItem::from_code(code.as_str()))
            .collect();
        debug!(done = checklist.len(), "Checklist updated");

        self.store
            .update_request(
                &request_id,
                RequestPatch {
                    checklist: Some(checklist),
                    ..RequestPatch::default()
                },
            )
            .await?;

        let Some(request) = self.lookup(&request_id).await? else {
            return Ok(ActionOutcome::NotFound);
        };
        if let (Some(channel), Some(ts)) = (&click.channel_id, click.message_ts()) {
            let approver = request
                .approved_by
                .clone()
                .unwrap_or_else(|| request.requested_by.clone());
            if let Err(e) = self
                .messenger
                .update_message(channel, ts, messages::build_welcome_message(&request, &approver))
                .await
            {
                warn!(error = %e, "Failed to re-render welcome message");
            }
        }
        Ok(ActionOutcome::Applied)
    }

    // =========================================================================
    // List and home
    // =========================================================================

    /// Admin clicked the create-list button.
    ///
    /// # Errors
    ///
    /// Returns error if the list cannot be created; the failure is also
    /// posted in the channel.
    #[instrument(skip(self, click), fields(user = %click.user))]
    pub async fn create_list(&self, click: &ButtonClick) -> Result<ActionOutcome, AppError> {
        if !self.gate(click).await {
            return Ok(ActionOutcome::Denied);
        }
        let channel = click
            .channel_id
            .clone()
            .unwrap_or_else(|| self.admin_channel.to_string());
        let creator = UserId::parse(click.user.as_str())?;

        match self.store.create_list().await {
            Ok(list_id) => {
                let message =
                    messages::build_list_created_message(LIST_NAME, list_id.as_str(), &creator);
                self.replace_or_post(&channel, click.message_ts(), message)
                    .await;
                Ok(ActionOutcome::Applied)
            }
            Err(e) => {
                error!(error = %e, "Failed to create request list");
                self.replace_or_post(
                    &channel,
                    click.message_ts(),
                    messages::build_list_creation_failed(&e.to_string()),
                )
                .await;
                Err(e.into())
            }
        }
    }

    /// Publish a user's App Home tab.
    ///
    /// # Errors
    ///
    /// Returns error if the view cannot be published.
    #[instrument(skip(self))]
    pub async fn publish_home(&self, user: &str) -> Result<(), AppError> {
        let mut own = Vec::new();
        for status in [ListStatus::Pending, ListStatus::InProgress] {
            match self.store.requests_by_status(status).await {
                Ok(requests) => own.extend(
                    requests
                        .into_iter()
                        .filter(|r| r.requested_by.as_str() == user),
                ),
                Err(e) => debug!(error = %e, "Could not list requests for home tab"),
            }
        }
        self.messenger
            .publish_home(user, messages::build_home_view(user, &own))
            .await?;
        Ok(())
    }

    /// Tell the actor that something went wrong.
    pub async fn report_failure(&self, user: &str, channel: Option<&str>, error: &AppError) {
        let message = messages::build_notice(error.user_message());
        match channel {
            Some(channel) => {
                if let Err(e) = self.messenger.post_ephemeral(channel, user, message).await {
                    warn!(error = %e, "Failed to report error to user");
                }
            }
            None => self.direct(user, message).await,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Admin check for a click; non-admins are told privately.
    async fn gate(&self, click: &ButtonClick) -> bool {
        if self.is_admin(&click.user) {
            return true;
        }
        info!(user = %click.user, "Non-admin attempted admin action");
        self.reply_to_click(click, messages::build_not_admin_notice())
            .await;
        false
    }

    /// Admin check for a submission. Returns the admin's id.
    async fn gate_submission(&self, submission: &Submission) -> Option<UserId> {
        if !self.is_admin(&submission.user) {
            info!(user = %submission.user, "Non-admin attempted admin submission");
            self.reply_to_submission(submission, messages::build_not_admin_notice())
                .await;
            return None;
        }
        let approver = safe_validate(UserId::parse(submission.user.as_str()));
        if approver.is_none() {
            warn!(user = %submission.user, "Admin submission from an unparseable user id; denied");
        }
        approver
    }

    /// Fetch with bounded retry.
    ///
    /// A miss on every attempt is `Ok(None)`. A read that still fails on the
    /// last attempt is returned as the error.
    async fn lookup(&self, request_id: &RequestId) -> Result<Option<Request>, StoreError> {
        let attempts = self.lookup.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.get_request(request_id).await {
                Ok(Some(request)) => return Ok(Some(request)),
                Ok(None) => {
                    debug!(attempt, request_id = %request_id, "Request not found yet");
                    if attempt >= attempts {
                        return Ok(None);
                    }
                }
                Err(e) => {
                    warn!(attempt, error = %e, request_id = %request_id, "Request lookup failed");
                    if attempt >= attempts {
                        return Err(e);
                    }
                }
            }
            attempt += 1;
            tokio::time::sleep(self.lookup.delay).await;
        }
    }

    /// Resolve the request behind a click outside the admin notification.
    async fn resolve_plain(&self, click: &ButtonClick) -> Result<Option<Request>, AppError> {
        let Some(request_id) = click_request_id(click) else {
            self.reply_to_click(click, messages::build_unidentified_request_notice())
                .await;
            return Ok(None);
        };
        let request = self.lookup(&request_id).await?;
        if request.is_none() {
            self.reply_to_click(click, messages::build_not_found_notice(request_id.as_str()))
                .await;
        }
        Ok(request)
    }

    /// Resolve the request behind a click in the admin notification,
    /// rebuilding it from the message when the store has lost it.
    ///
    /// Only a miss is rebuilt; a failing read is returned untouched.
    async fn resolve_notification(&self, click: &ButtonClick) -> Result<Option<Request>, AppError> {
        let Some(request_id) = click_request_id(click) else {
            self.reply_to_click(click, messages::build_unidentified_request_notice())
                .await;
            return Ok(None);
        };
        if let Some(request) = self.lookup(&request_id).await? {
            return Ok(Some(request));
        }

        if let Some(mut request) = click
            .message
            .as_ref()
            .and_then(|message| reconstruct(message, Some(&request_id)))
        {
            info!(request_id = %request_id, "Rebuilt lost request from its notification");
            if request.admin_message_ts.is_none() {
                request.admin_message_ts =
                    click.message_ts().and_then(|ts| MessageTs::parse(ts).ok());
            }
            self.persist_new(&mut request).await;
            return Ok(Some(request));
        }

        warn!(request_id = %request_id, "Request not found and could not be rebuilt");
        if let (Some(channel), Some(message)) = (&click.channel_id, &click.message) {
            if let Err(e) = self
                .messenger
                .update_message(
                    channel,
                    &message.ts,
                    messages::build_unavailable_message(request_id.as_str(), &message.text),
                )
                .await
            {
                warn!(error = %e, "Failed to mark notification unavailable");
            }
        }
        self.reply_to_click(click, messages::build_not_found_notice(request_id.as_str()))
            .await;
        Ok(None)
    }

    async fn resolve_submission(&self, submission: &Submission) -> Result<Option<Request>, AppError> {
        let Ok(request_id) = RequestId::parse(submission.metadata.request_id.as_str()) else {
            self.reply_to_submission(submission, messages::build_unidentified_request_notice())
                .await;
            return Ok(None);
        };
        let request = self.lookup(&request_id).await?;
        if request.is_none() {
            self.reply_to_submission(
                submission,
                messages::build_not_found_notice(request_id.as_str()),
            )
            .await;
        }
        Ok(request)
    }

    /// Replace the admin notification a submission started from.
    async fn update_notification(
        &self,
        submission: &Submission,
        request: &Request,
        message: OutgoingMessage,
    ) {
        let channel = submission
            .metadata
            .channel_id
            .clone()
            .unwrap_or_else(|| self.admin_channel.to_string());
        let ts = submission
            .metadata
            .message_ts
            .clone()
            .or_else(|| request.admin_message_ts.as_ref().map(ToString::to_string));
        let Some(ts) = ts else {
            debug!("No admin notification to update");
            return;
        };
        if let Err(e) = self.messenger.update_message(&channel, &ts, message).await {
            warn!(error = %e, "Failed to update admin notification");
        }
    }

    async fn open_modal(&self, click: &ButtonClick, view: crate::slack::View) -> Result<(), AppError> {
        let trigger_id = click
            .trigger_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("interaction without trigger_id".to_string()))?;
        self.messenger.open_view(trigger_id, view).await?;
        Ok(())
    }

    async fn replace_or_post(&self, channel: &str, ts: Option<&str>, message: OutgoingMessage) {
        let result = match ts {
            Some(ts) => self.messenger.update_message(channel, ts, message).await,
            None => self.messenger.post_message(channel, message).await.map(|_| ()),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to post list message");
        }
    }

    async fn reply_to_click(&self, click: &ButtonClick, message: OutgoingMessage) {
        match &click.channel_id {
            Some(channel) => {
                if let Err(e) = self
                    .messenger
                    .post_ephemeral(channel, &click.user, message)
                    .await
                {
                    warn!(error = %e, "Failed to post ephemeral notice");
                }
            }
            None => self.direct(&click.user, message).await,
        }
    }

    async fn reply_to_submission(&self, submission: &Submission, message: OutgoingMessage) {
        match &submission.metadata.channel_id {
            Some(channel) => {
                if let Err(e) = self
                    .messenger
                    .post_ephemeral(channel, &submission.user, message)
                    .await
                {
                    warn!(error = %e, "Failed to post ephemeral notice");
                }
            }
            None => self.direct(&submission.user, message).await,
        }
    }

    async fn direct(&self, user: &str, message: OutgoingMessage) {
        if let Err(e) = self.messenger.post_message(user, message).await {
            warn!(error = %e, user = %user, "Failed to send direct message");
        }
    }
}

fn click_request_id(click: &ButtonClick) -> Option<RequestId> {
    click
        .value
        .as_deref()
        .and_then(|value| RequestId::parse(value.trim()).ok())
}

/// Build a pending request from a submitted intake modal.
fn request_from_state(kind: RequestKind, requested_by: UserId, state: &ViewState) -> Request {
    let now = Utc::now();
    let text = |(block, action): (&str, &str)| state.text(block, action);
    let code = |(block, action): (&str, &str), fallback: &str| {
        state
            .selected(block, action)
            .map_or_else(|| fallback.to_string(), |o| o.value.clone())
    };

    let project_name = text(field::PROJECT_NAME).unwrap_or_else(|| UNNAMED_PROJECT.to_string());
    let mut request = Request::new(
        RequestId::generate(kind, now),
        kind,
        project_name,
        requested_by,
        now,
    );

    match kind {
        RequestKind::Pentest => {
            request.target_scope = text(field::TARGET_SCOPE).unwrap_or_default();
            request.request_type = Choice::request_type(kind, &code(field::PENTEST_TYPE, "other"));
            request.urgency = Choice::urgency(kind, &code(field::URGENCY, "unknown"));
            request.full_report = FullReport::from_code(
                state
                    .selected(field::FULL_REPORT.0, field::FULL_REPORT.1)
                    .map(|o| o.value.as_str()),
            );
        }
        RequestKind::ThreatModeling => {
            request.target_scope = text(field::SYSTEM_DESCRIPTION).unwrap_or_default();
            request.request_type =
                Choice::request_type(kind, &code(field::THREAT_MODELING_TYPE, "other"));
            request.urgency = Choice::urgency(kind, &code(field::PRIORITY, "medium"));
        }
    }

    request.additional_info = text(field::ADDITIONAL_INFO).unwrap_or_default();
    request.team_members = state
        .users(field::TEAM_MEMBERS.0, field::TEAM_MEMBERS.1)
        .into_iter()
        .filter_map(|user| safe_validate(UserId::parse(user)))
        .collect();
    request
}

/// `<prefix>-<project>-<id tail>`, lowercase.
fn channel_name(request: &Request) -> String {
    let id = request.request_id.as_str();
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    let tail = digits
        .char_indices()
        .nth(digits.len().saturating_sub(6))
        .map_or(digits.as_str(), |(i, _)| &digits[i..]);
    format!(
        "{}-{}-{}",
        request.kind.prefix().to_lowercase(),
        sanitize_project_name(&request.project_name),
        tail
    )
}
