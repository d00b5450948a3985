//! Slack message builders for the intake workflow.
//!
//! Provides factory functions for building Block Kit messages for:
//! - Admin notifications (new, approved, rejected, unavailable)
//! - The dedicated channel's welcome message and status posts
//! - Direct messages to requesters
//! - The list-creation prompt and the App Home tab
//!
//! Field labels in the admin notification double as anchors for
//! reconstructing a request from the rendered text, so they are exported.

use sape_core::{
    ChecklistItem, ListStatus, MessageTs, Request, RequestKind, RequestSnapshot, RequestStatus,
    UserId,
};

use super::types::{
    ActionElement, Block, ButtonStyle, MessageMetadata, OptionObject, OutgoingMessage, Text, View,
};

/// Label of the request id field.
pub const LABEL_REQUEST_ID: &str = "Forespørsels-ID";
/// Label of the project name field.
pub const LABEL_PROJECT: &str = "Prosjektnavn";
/// Label of the requester field.
pub const LABEL_REQUESTED_BY: &str = "Forespurt av";

/// Action ids of interactive elements.
pub mod action {
    pub const APPROVE: &str = "approve_request";
    pub const REJECT: &str = "reject_request";
    pub const REQUEST_INFO: &str = "request_info";
    pub const REPLY: &str = "reply_to_admin";
    pub const UPDATE_STATUS: &str = "update_status";
    pub const VIEW_DETAILS: &str = "view_details";
    pub const CHECKLIST: &str = "requester_checklist";
    pub const CREATE_LIST: &str = "create_request_list";
    pub const OPEN_PENTEST_MODAL: &str = "request_pentest";
}

/// Block id prefix of the welcome message checklist; the request id follows.
pub const CHECKLIST_BLOCK_PREFIX: &str = "requester_checklist:";

const NONE_SELECTED: &str = "Ingen valgt";
const NOT_GIVEN: &str = "Ikke oppgitt";

/// Lowercase noun for a request kind, as used in running text.
#[must_use]
pub const fn kind_noun(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pentest => "pentest",
        RequestKind::ThreatModeling => "trusselmodellering",
    }
}

const fn kind_title(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pentest => "Pentest",
        RequestKind::ThreatModeling => "Trusselmodellering",
    }
}

const fn type_label(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pentest => "Testtype",
        RequestKind::ThreatModeling => "Type trusselmodellering",
    }
}

const fn urgency_label(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pentest => "Hastegrad",
        RequestKind::ThreatModeling => "Prioritet",
    }
}

const fn scope_label(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Pentest => "Testområde",
        RequestKind::ThreatModeling => "Systembeskrivelse",
    }
}

fn field(label: &str, value: impl std::fmt::Display) -> Text {
    Text::mrkdwn(format!("*{label}:*\n{value}"))
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// Render user ids as mentions.
#[must_use]
pub fn mentions(users: &[UserId]) -> String {
    if users.is_empty() {
        return NONE_SELECTED.to_string();
    }
    users
        .iter()
        .map(|u| format!("<@{u}>"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Submission details shared by the notification and the welcome message.
fn detail_blocks(request: &Request) -> Vec<Block> {
    let mut blocks = vec![
        Block::section(Text::mrkdwn(format!(
            "*{}:*\n{}",
            scope_label(request.kind),
            or_default(&request.target_scope, NOT_GIVEN)
        ))),
        Block::section(field(
            "Tilleggsinformasjon",
            or_default(&request.additional_info, "Ingen"),
        )),
    ];
    if request.kind == RequestKind::Pentest {
        blocks.push(Block::section(field(
            "Fullstendig rapport",
            request.full_report.label(),
        )));
    }
    blocks
}

/// Build the admin notification for a new request.
///
/// The message carries the submission as structured metadata so the request
/// can be rebuilt from the message alone.
#[must_use]
pub fn build_admin_notification(request: &Request) -> OutgoingMessage {
    let kind = request.kind;
    let mut blocks = vec![
        Block::header(format!("🔒 Ny {}-forespørsel", kind_noun(kind))),
        Block::fields(vec![
            field(LABEL_REQUEST_ID, &request.request_id),
            field(LABEL_REQUESTED_BY, format!("<@{}>", request.requested_by)),
        ]),
        Block::Divider,
        Block::fields(vec![
            field(LABEL_PROJECT, &request.project_name),
            field(type_label(kind), or_default(&request.request_type.label, NOT_GIVEN)),
            field(urgency_label(kind), or_default(&request.urgency.label, NOT_GIVEN)),
        ]),
        Block::section(field("Teammedlemmer", mentions(&request.team_members))),
    ];
    blocks.extend(detail_blocks(request));
    blocks.push(Block::Divider);
    blocks.push(Block::Actions {
        block_id: Some("admin_actions".to_string()),
        elements: vec![
            ActionElement::button(
                "✅ Godkjenn",
                action::APPROVE,
                request.request_id.as_str(),
                Some(ButtonStyle::Primary),
            ),
            ActionElement::button(
                "❌ Avvis",
                action::REJECT,
                request.request_id.as_str(),
                Some(ButtonStyle::Danger),
            ),
            ActionElement::button(
                "💬 Be om mer info",
                action::REQUEST_INFO,
                request.request_id.as_str(),
                None,
            ),
        ],
    });

    OutgoingMessage::new(
        format!(
            "Ny {}-forespørsel: {}",
            kind_noun(kind),
            or_default(&request.project_name, "Uten navn")
        ),
        blocks,
    )
    .with_metadata(MessageMetadata {
        event_type: kind.event_type().to_string(),
        event_payload: serde_json::to_value(RequestSnapshot::from(request)).unwrap_or_default(),
    })
}

/// Build the notification that replaces the admin message after approval.
#[must_use]
pub fn build_approved_message(
    request: &Request,
    approver: &UserId,
    channel: Option<&str>,
) -> OutgoingMessage {
    let mut fields = vec![
        field(LABEL_REQUEST_ID, &request.request_id),
        field("Prosjekt", &request.project_name),
        field("Godkjent av", format!("<@{approver}>")),
        field(
            "Kanal",
            channel.map_or_else(|| "Ikke opprettet".to_string(), |c| format!("<#{c}>")),
        ),
    ];
    if let Some(url) = &request.ticket_url {
        fields.push(field("Sak", url));
    }

    OutgoingMessage::new(
        format!(
            "{}-forespørsel godkjent: {}",
            kind_title(request.kind),
            request.project_name
        ),
        vec![
            Block::header(format!("✅ {}-forespørsel godkjent", kind_title(request.kind))),
            Block::fields(fields),
        ],
    )
}

/// Build the notification that replaces the admin message after rejection.
#[must_use]
pub fn build_rejected_message(request: &Request, rejector: &UserId, reason: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        format!(
            "{}-forespørsel avvist: {}",
            kind_title(request.kind),
            request.project_name
        ),
        vec![
            Block::header(format!("❌ {}-forespørsel avvist", kind_title(request.kind))),
            Block::fields(vec![
                field(LABEL_REQUEST_ID, &request.request_id),
                field("Prosjekt", &request.project_name),
                field("Avvist av", format!("<@{rejector}>")),
            ]),
            Block::section(field("Begrunnelse for avvisning", reason)),
        ],
    )
}

/// Replace a notification whose request could not be found or rebuilt.
///
/// The original text is kept; the action buttons are not.
#[must_use]
pub fn build_unavailable_message(request_id: &str, original_text: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        format!("Forespørsel {request_id} er ikke tilgjengelig"),
        vec![
            Block::header("⚠️ Forespørselen er ikke tilgjengelig"),
            Block::section(Text::mrkdwn(format!(
                "Forespørsel `{request_id}` finnes ikke lenger og kan ikke behandles herfra."
            ))),
            Block::context(or_default(original_text, request_id)),
        ],
    )
}

/// Build the welcome message for a newly created request channel.
#[must_use]
pub fn build_welcome_message(request: &Request, approver: &UserId) -> OutgoingMessage {
    let kind = request.kind;
    let mut blocks = vec![
        Block::header(format!("🔒 {}: {}", kind_title(kind), request.project_name)),
        Block::fields(vec![
            field(LABEL_REQUEST_ID, &request.request_id),
            field("Godkjent av", format!("<@{approver}>")),
            field(type_label(kind), or_default(&request.request_type.label, NOT_GIVEN)),
            field(urgency_label(kind), or_default(&request.urgency.label, NOT_GIVEN)),
        ]),
        Block::Divider,
    ];
    blocks.extend(detail_blocks(request));
    blocks.push(Block::Divider);
    blocks.extend(checklist_blocks(request));
    blocks.push(Block::section(Text::mrkdwn(format!(
        "*Teammedlemmer:*\n{}\n\nVelkommen! SåPe vil koordinere {}-aktivitetene her i kanalen.",
        mentions(&request.team_members),
        kind_noun(kind)
    ))));
    blocks.push(Block::Divider);

    if let Some(url) = &request.ticket_url {
        blocks.push(Block::section(field("🎫 Sak", url)));
    }

    blocks.push(Block::actions(vec![
        ActionElement::button(
            "📋 Oppdater status",
            action::UPDATE_STATUS,
            request.request_id.as_str(),
            None,
        ),
        ActionElement::button(
            "📄 Vis forespørselsdetaljer",
            action::VIEW_DETAILS,
            request.request_id.as_str(),
            None,
        ),
    ]));

    OutgoingMessage::new(
        format!(
            "Velkommen til {}-kanalen for {}",
            kind_noun(kind),
            request.project_name
        ),
        blocks,
    )
}

fn checklist_blocks(request: &Request) -> Vec<Block> {
    let options: Vec<OptionObject> = ChecklistItem::ALL
        .iter()
        .map(|item| OptionObject::new(item.label(), item.code()))
        .collect();
    let initial: Vec<OptionObject> = ChecklistItem::ALL
        .iter()
        .filter(|item| request.checklist.contains(item))
        .map(|item| OptionObject::new(item.label(), item.code()))
        .collect();
    let done = initial.len();

    vec![
        Block::section(Text::mrkdwn(
            "*Sjekkliste for bestiller: Hva ønsker vi, og hva forventes?*\n\
             Dette er en veiledende liste over hva som er nyttig å ha på plass før oppstart. \
             Du trenger ikke ha alt klart nå. Vi avklarer detaljer fortløpende her i kanalen.\n\n\
             • *Definer scope:* URL-er, API-endepunkter, miljøer og hva som ikke inngår\n\
             • *Tilganger / testbrukere / testdata:* testkontoer, API-nøkler, ev. IP-whitelist/VPN\n\
             • *Tidspunkt for test:* ønsket tidsrom og blackout-perioder\n\
             • *Kontaktpersoner:* teknisk kontakt, produkteier og sikkerhetskontakt\n\
             • *Spesielle hensyn:* driftsvindu, logging/varsling, DDoS-beskyttelse, datahåndtering",
        )),
        Block::Actions {
            block_id: Some(format!("{CHECKLIST_BLOCK_PREFIX}{}", request.request_id)),
            elements: vec![ActionElement::Checkboxes {
                action_id: action::CHECKLIST.to_string(),
                options,
                initial_options: initial,
            }],
        },
        Block::context(format!(
            "Sjekkliste: {done}/{} fullført",
            ChecklistItem::ALL.len()
        )),
    ]
}

/// Post announcing a status change in the request channel.
#[must_use]
pub fn build_status_update_message(
    request: &Request,
    status: RequestStatus,
    updated_by: &UserId,
    note: Option<&str>,
) -> OutgoingMessage {
    let mut text = format!(
        "📋 *Status oppdatert:* {}\n*Oppdatert av:* <@{updated_by}>",
        status.label()
    );
    if let Some(note) = note {
        text.push_str(&format!("\n*Notater:*\n{note}"));
    }
    OutgoingMessage::new(
        format!(
            "Status for {} oppdatert til {}",
            request.request_id,
            status.label()
        ),
        vec![Block::section(Text::mrkdwn(text))],
    )
}

/// Channel topic reflecting the current status.
#[must_use]
pub fn channel_topic(request: &Request, status: RequestStatus) -> String {
    format!(
        "{}: {} | Status: {} | {}",
        kind_title(request.kind),
        request.project_name,
        status.label(),
        request.request_id
    )
}

/// Channel purpose set at creation.
#[must_use]
pub fn channel_purpose(request: &Request) -> String {
    format!(
        "Koordinering av {} for {} ({})",
        kind_noun(request.kind),
        request.project_name,
        request.request_id
    )
}

/// Receipt sent to the requester right after submission.
#[must_use]
pub fn build_submission_receipt(request: &Request) -> OutgoingMessage {
    let noun = kind_noun(request.kind);
    OutgoingMessage::new(
        format!("Din {noun}-forespørsel er mottatt! ID: {}", request.request_id),
        vec![Block::section(Text::mrkdwn(format!(
            "✅ *Takk for din {noun}-forespørsel!*\n\n*{LABEL_REQUEST_ID}:* {}\n*Prosjekt:* {}\n\n\
             Forespørselen din er mottatt og vil bli behandlet av AppSec.",
            request.request_id, request.project_name
        )))],
    )
}

/// Direct message telling the requester their request was approved.
///
/// Without a channel the requester is told the team will follow up directly.
#[must_use]
pub fn build_requester_approved_dm(request: &Request, channel: Option<&str>) -> OutgoingMessage {
    let follow_up = channel.map_or_else(
        || "Sikkerhetsteamet tar kontakt med deg for videre dialog.".to_string(),
        |c| format!("Vi har opprettet kanalen <#{c}> for videre dialog."),
    );
    let mut text = format!(
        "🎉 *Din {}-forespørsel er godkjent!*\n\n*{LABEL_REQUEST_ID}:* {}\n*Prosjekt:* {}\n\n{follow_up}",
        kind_noun(request.kind),
        request.request_id,
        request.project_name
    );
    if let Some(url) = &request.ticket_url {
        text.push_str(&format!("\n*Sak:* {url}"));
    }
    OutgoingMessage::new(
        format!("Forespørsel {} er godkjent", request.request_id),
        vec![Block::section(Text::mrkdwn(text))],
    )
}

/// Direct message telling the requester their request was rejected.
#[must_use]
pub fn build_requester_rejected_dm(request: &Request, reason: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        format!("Forespørsel {} er avvist", request.request_id),
        vec![Block::section(Text::mrkdwn(format!(
            "❌ *Din {}-forespørsel er avvist*\n\n*{LABEL_REQUEST_ID}:* {}\n*Prosjekt:* {}\n\n\
             *Begrunnelse:*\n{reason}",
            kind_noun(request.kind),
            request.request_id,
            request.project_name
        )))],
    )
}

/// Direct message asking the requester for more information.
#[must_use]
pub fn build_info_request_dm(request: &Request, admin: &UserId, question: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        format!("Spørsmål om forespørsel {}", request.request_id),
        vec![
            Block::section(Text::mrkdwn(format!(
                "💬 *<@{admin}> trenger mer informasjon om forespørselen din*\n\n\
                 *{LABEL_REQUEST_ID}:* {}\n*Prosjekt:* {}\n\n*Melding:*\n{question}",
                request.request_id, request.project_name
            ))),
            Block::actions(vec![ActionElement::button(
                "↩️ Svar",
                action::REPLY,
                request.request_id.as_str(),
                Some(ButtonStyle::Primary),
            )]),
        ],
    )
}

/// Thread reply under the admin notification recording an info request.
#[must_use]
pub fn build_info_request_thread(
    admin: &UserId,
    question: &str,
    thread_ts: &MessageTs,
) -> OutgoingMessage {
    OutgoingMessage::text(format!(
        "💬 <@{admin}> ba om mer informasjon:\n>{question}"
    ))
    .in_thread(thread_ts.as_str())
}

/// Thread reply under the admin notification carrying a requester's answer.
#[must_use]
pub fn build_reply_thread(user: &UserId, reply: &str, thread_ts: Option<&MessageTs>) -> OutgoingMessage {
    let message = OutgoingMessage::text(format!("↩️ Svar fra <@{user}>:\n>{reply}"));
    match thread_ts {
        Some(ts) => message.in_thread(ts.as_str()),
        None => message,
    }
}

/// Short confirmation sent back to whoever acted.
#[must_use]
pub fn build_notice(text: impl Into<String>) -> OutgoingMessage {
    OutgoingMessage::text(text)
}

/// Notice for an action on a request that is no longer pending.
#[must_use]
pub fn build_already_handled_notice(request_id: &str, status: RequestStatus) -> OutgoingMessage {
    build_notice(format!(
        "ℹ️ Forespørsel {request_id} er allerede {}.",
        status.label().to_lowercase()
    ))
}

/// Notice for a non-admin attempting an admin action.
#[must_use]
pub fn build_not_admin_notice() -> OutgoingMessage {
    build_notice("⛔ Kun administratorer kan utføre denne handlingen.")
}

/// Notice for a click that carries no usable request id.
#[must_use]
pub fn build_unidentified_request_notice() -> OutgoingMessage {
    build_notice("⚠️ Kunne ikke identifisere forespørselen denne handlingen gjelder.")
}

/// Notice for an action on a request that cannot be found.
#[must_use]
pub fn build_not_found_notice(request_id: &str) -> OutgoingMessage {
    build_notice(format!(
        "⚠️ Fant ikke forespørsel {request_id}. Den kan ha blitt slettet."
    ))
}

/// Prompt posted once when no request list is configured.
#[must_use]
pub fn build_create_list_prompt(list_name: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        format!("📋 {list_name} må opprettes"),
        vec![
            Block::header(format!("📋 Opprett {list_name}")),
            Block::section(Text::mrkdwn(format!(
                "*{list_name} er ikke konfigurert ennå.*\n\nTrykk på knappen nedenfor for å \
                 opprette listen som brukes til å administrere alle forespørsler."
            ))),
            Block::section(Text::mrkdwn(
                "✨ Listen opprettes med:\n• Prosjektnavn\n• Forespørsels-ID\n• Status\n\
                 • Hastegrad\n• Tildelt til\n• Forespurt av\n• Type",
            )),
            Block::actions(vec![ActionElement::Button {
                text: super::types::PlainText::new("🚀 Opprett liste nå"),
                action_id: action::CREATE_LIST.to_string(),
                value: None,
                style: Some(ButtonStyle::Primary),
            }]),
        ],
    )
}

/// Confirmation after the list has been created, with the `.env` hint.
#[must_use]
pub fn build_list_created_message(list_name: &str, list_id: &str, created_by: &UserId) -> OutgoingMessage {
    OutgoingMessage::new(
        format!("✅ {list_name} opprettet!"),
        vec![
            Block::header("✅ Liste opprettet!"),
            Block::section(Text::mrkdwn(format!(
                "*{list_name}* er nå klar! 🎉\n\nListen er delt med denne kanalen."
            ))),
            Block::section(Text::mrkdwn(format!("📋 *Liste-ID:* `{list_id}`"))),
            Block::section(Text::mrkdwn(
                "⚠️ *VIKTIG:* Legg til følgende i `.env` for å bevare listen ved omstart:",
            )),
            Block::section(Text::mrkdwn(format!("```REQUEST_LIST_ID={list_id}```"))),
            Block::context(format!("Opprettet av <@{created_by}>")),
        ],
    )
}

/// Error notice when list creation failed.
#[must_use]
pub fn build_list_creation_failed(error: &str) -> OutgoingMessage {
    OutgoingMessage::new(
        "❌ Feil ved oppretting av liste",
        vec![Block::section(Text::mrkdwn(format!(
            "❌ *Kunne ikke opprette listen*\n\n```{error}```"
        )))],
    )
}

/// One-line summary used by the home tab and the CLI.
#[must_use]
pub fn summary_line(request: &Request) -> String {
    format!(
        "`{}` *{}* ({})",
        request.request_id,
        request.project_name,
        request.status.to_list().label()
    )
}

/// Build the App Home tab.
///
/// Lists the viewer's own open requests when any are known.
#[must_use]
pub fn build_home_view(user: &str, own_requests: &[Request]) -> View {
    let mut blocks = vec![
        Block::header("🔒 SåPe - Pentest-bestilling"),
        Block::section(Text::mrkdwn(format!(
            "Hei <@{user}>! Her kan du bestille pentest. Klikk på knappen under for å starte en ny forespørsel."
        ))),
        Block::actions(vec![ActionElement::button(
            "Bestill pentest",
            action::OPEN_PENTEST_MODAL,
            "open_pentest_modal",
            Some(ButtonStyle::Primary),
        )]),
        Block::Divider,
    ];

    let open: Vec<String> = own_requests
        .iter()
        .filter(|r| r.status.to_list() != ListStatus::Rejected)
        .map(summary_line)
        .collect();
    if !open.is_empty() {
        blocks.push(Block::section(Text::mrkdwn(format!(
            "*Dine forespørsler:*\n{}",
            open.join("\n")
        ))));
        blocks.push(Block::Divider);
    }

    blocks.push(Block::section(Text::mrkdwn(
        "*Målet er lav terskel: det viktigste er å melde fra om et behov, så tar vi dialogen etterpå.*\n\n\
         *Hva skjer når du bestiller?*\n\
         1. Du fyller ut det du vet i skjemaet.\n\
         2. Vi oppretter en privat Slack-kanal og en sak for dialog og oppfølging.\n\
         3. Sammen avklarer vi omfang, planlegger testen og finner et tidspunkt som passer.\n\n\
         *Viktig:* Ikke del sensitiv informasjon som passord eller personopplysninger i Slack.",
    )));

    View::home(blocks)
}
