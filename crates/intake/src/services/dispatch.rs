//! Route parsed Slack payloads to request actions.
//!
//! Every entry point here runs on a spawned task after Slack has been
//! acknowledged. Errors never escape: they are logged and, where there is a
//! user to tell, reported back to them.

use sape_core::RequestKind;
use tracing::{Instrument, error, info_span, warn};

use super::request_actions::{ActionOutcome, ButtonClick, RequestActions, Submission};
use crate::error::{AppError, set_sentry_user};
use crate::slack::messages::action;
use crate::slack::modals::callback;
use crate::slack::{
    BlockActionsPayload, Event, InteractionAction, InteractionPayload, PrivateMetadata,
    SlashCommand, ViewSubmissionPayload,
};

/// Slash command that opens the pentest modal.
pub const PENTEST_COMMAND: &str = "/bestill-pentest";
/// Slash command that opens the threat-modeling modal.
pub const THREAT_MODELING_COMMAND: &str = "/bestill-trusselmodellering";

/// Handle a slash command.
pub async fn dispatch_command(actions: &RequestActions, command: SlashCommand) {
    let span = info_span!("slash_command", command = %command.command, user = %command.user_id);
    async {
        set_sentry_user(&command.user_id);
        let kind = match command.command.as_str() {
            PENTEST_COMMAND => RequestKind::Pentest,
            THREAT_MODELING_COMMAND => RequestKind::ThreatModeling,
            other => {
                warn!(command = %other, "Unknown slash command");
                return;
            }
        };
        if let Err(e) = actions
            .open_request_modal(kind, &command.user_id, &command.trigger_id)
            .await
        {
            error!(error = %e, "Failed to open request modal");
        }
    }
    .instrument(span)
    .await;
}

/// Handle an interaction payload.
pub async fn dispatch_interaction(actions: &RequestActions, payload: InteractionPayload) {
    match payload {
        InteractionPayload::BlockActions(payload) => {
            for action in &payload.actions {
                dispatch_block_action(actions, &payload, action).await;
            }
        }
        InteractionPayload::ViewSubmission(payload) => {
            dispatch_view_submission(actions, payload).await;
        }
        InteractionPayload::Other => {}
    }
}

/// Handle an Events API event.
pub async fn dispatch_event(actions: &RequestActions, event: Event) {
    match event {
        Event::AppHomeOpened { user } => {
            if let Err(e) = actions.publish_home(&user).await {
                error!(error = %e, user = %user, "Failed to publish home tab");
            }
        }
        Event::Other => {}
    }
}

/// Reduce a block action to what the workflow needs.
#[must_use]
pub fn button_click(payload: &BlockActionsPayload, action: &InteractionAction) -> ButtonClick {
    ButtonClick {
        user: payload.user.id.clone(),
        trigger_id: payload.trigger_id.clone(),
        channel_id: payload.channel_id().map(str::to_owned),
        message: payload.message.clone(),
        block_id: action.block_id.clone(),
        value: action.value.clone(),
        selected: action
            .selected_options
            .iter()
            .map(|option| option.value.clone())
            .collect(),
    }
}

async fn dispatch_block_action(
    actions: &RequestActions,
    payload: &BlockActionsPayload,
    action: &InteractionAction,
) {
    let click = button_click(payload, action);
    let span = info_span!("block_action", action_id = %action.action_id, user = %click.user);
    async {
        set_sentry_user(&click.user);
        let result = match action.action_id.as_str() {
            action::APPROVE => actions.begin_approve(&click).await,
            action::REJECT => actions.begin_reject(&click).await,
            action::REQUEST_INFO => actions.begin_request_info(&click).await,
            action::REPLY => actions.begin_reply(&click).await,
            action::UPDATE_STATUS => actions.begin_status_update(&click).await,
            action::VIEW_DETAILS => actions.view_details(&click).await,
            action::CHECKLIST => actions.toggle_checklist(&click).await,
            action::CREATE_LIST => actions.create_list(&click).await,
            action::OPEN_PENTEST_MODAL => match &click.trigger_id {
                Some(trigger_id) => actions
                    .open_request_modal(RequestKind::Pentest, &click.user, trigger_id)
                    .await
                    .map(|()| ActionOutcome::Applied),
                None => Err(AppError::BadRequest("missing trigger_id".to_string())),
            },
            other => {
                warn!(action_id = %other, "Unknown action");
                return;
            }
        };
        report(actions, &click.user, click.channel_id.as_deref(), result).await;
    }
    .instrument(span)
    .await;
}

async fn dispatch_view_submission(actions: &RequestActions, payload: ViewSubmissionPayload) {
    let submission = Submission {
        user: payload.user.id,
        metadata: PrivateMetadata::decode(&payload.view.private_metadata),
        state: payload.view.state,
    };
    let callback_id = payload.view.callback_id;
    let span = info_span!("view_submission", callback_id = %callback_id, user = %submission.user);

    async {
        set_sentry_user(&submission.user);
        let result = match callback_id.as_str() {
            callback::PENTEST_REQUEST | callback::THREAT_MODELING_REQUEST => {
                let kind = if callback_id == callback::PENTEST_REQUEST {
                    RequestKind::Pentest
                } else {
                    RequestKind::ThreatModeling
                };
                if let Err(e) = actions
                    .submit_request(kind, &submission.user, &submission.state)
                    .await
                {
                    error!(error = %e, "Request submission failed");
                }
                return;
            }
            callback::APPROVE => actions.approve(&submission).await,
            callback::REJECT => actions.reject(&submission).await,
            callback::REQUEST_INFO => actions.request_info(&submission).await,
            callback::REPLY => actions.reply(&submission).await,
            callback::STATUS_UPDATE => actions.update_status(&submission).await,
            other => {
                warn!(callback_id = %other, "Unknown view submission");
                return;
            }
        };
        report(
            actions,
            &submission.user,
            submission.metadata.channel_id.as_deref(),
            result,
        )
        .await;
    }
    .instrument(span)
    .await;
}

async fn report(
    actions: &RequestActions,
    user: &str,
    channel: Option<&str>,
    result: Result<ActionOutcome, AppError>,
) {
    match result {
        Ok(outcome) => tracing::debug!(?outcome, "Action finished"),
        Err(e) => {
            error!(error = %e, "Action failed");
            actions.report_failure(user, channel, &e).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_button_click_from_checkbox_action() {
        let payload: InteractionPayload = serde_json::from_value(json!({
            "type": "block_actions",
            "user": {"id": "U0000000001"},
            "trigger_id": "trig",
            "channel": {"id": "C0000000001"},
            "message": {"ts": "1700000000.000100", "text": "Velkommen"},
            "actions": [{
                "action_id": "requester_checklist",
                "block_id": "requester_checklist:PT-1000",
                "type": "checkboxes",
                "selected_options": [{"value": "scope"}, {"value": "timing"}]
            }]
        }))
        .expect("payload");

        let InteractionPayload::BlockActions(payload) = payload else {
            panic!("expected block actions");
        };
        let click = button_click(&payload, &payload.actions[0]);
        assert_eq!(click.user, "U0000000001");
        assert_eq!(click.channel_id.as_deref(), Some("C0000000001"));
        assert_eq!(click.block_id.as_deref(), Some("requester_checklist:PT-1000"));
        assert_eq!(click.selected, vec!["scope", "timing"]);
        assert_eq!(
            click.message.map(|m| m.ts).as_deref(),
            Some("1700000000.000100")
        );
    }
}
