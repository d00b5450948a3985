//! Modal views.
//!
//! Each modal has a callback id that routes its submission, and block/action
//! ids that address its inputs in the submitted state. Both are exported so
//! the submission handlers read exactly what the builders wrote.

use sape_core::{
    PENTEST_TYPES, PRIORITY_LEVELS, Request, RequestKind, RequestStatus, StatusHistoryEntry,
    THREAT_MODELING_TYPES, URGENCY_LEVELS,
};

use super::messages::{LABEL_PROJECT, LABEL_REQUEST_ID, LABEL_REQUESTED_BY, kind_noun, mentions};
use super::types::{Block, InputElement, OptionObject, PlainText, PrivateMetadata, Text, View};

/// Callback ids of submittable modals.
pub mod callback {
    pub const PENTEST_REQUEST: &str = "pentest_request_modal";
    pub const THREAT_MODELING_REQUEST: &str = "threatmodeling_request_modal";
    pub const APPROVE: &str = "approve_with_jira_modal";
    pub const REJECT: &str = "reject_reason_modal";
    pub const REQUEST_INFO: &str = "request_info_modal";
    pub const REPLY: &str = "reply_modal";
    pub const STATUS_UPDATE: &str = "status_update_modal";
}

/// `(block_id, action_id)` pairs of modal inputs.
pub mod field {
    pub const PROJECT_NAME: (&str, &str) = ("project_name", "project_name_input");
    pub const TARGET_SCOPE: (&str, &str) = ("target_scope", "target_scope_input");
    pub const PENTEST_TYPE: (&str, &str) = ("pentest_type", "pentest_type_select");
    pub const URGENCY: (&str, &str) = ("urgency", "urgency_select");
    pub const FULL_REPORT: (&str, &str) = ("full_report", "full_report_choice");
    pub const TEAM_MEMBERS: (&str, &str) = ("team_members", "team_members_select");
    pub const ADDITIONAL_INFO: (&str, &str) = ("additional_info", "additional_info_input");
    pub const SYSTEM_DESCRIPTION: (&str, &str) = ("system_description", "system_description_input");
    pub const THREAT_MODELING_TYPE: (&str, &str) =
        ("threatmodeling_type", "threatmodeling_type_select");
    pub const PRIORITY: (&str, &str) = ("priority", "priority_select");
    pub const JIRA_URL: (&str, &str) = ("jira_ticket_url", "jira_url_input");
    pub const REJECTION_REASON: (&str, &str) = ("rejection_reason", "reason_input");
    pub const INFO_REQUEST: (&str, &str) = ("info_request", "message_input");
    pub const REPLY_MESSAGE: (&str, &str) = ("reply_message", "message_input");
    pub const STATUS: (&str, &str) = ("status_select", "status_input");
    pub const STATUS_NOTE: (&str, &str) = ("status_note", "note_input");
}

fn input(
    (block_id, _): (&str, &str),
    label: &str,
    element: InputElement,
    optional: bool,
    hint: Option<&str>,
) -> Block {
    Block::Input {
        block_id: block_id.to_string(),
        label: PlainText::new(label),
        element,
        optional,
        hint: hint.map(PlainText::new),
    }
}

fn text_input((_, action_id): (&str, &str), multiline: bool, placeholder: &str) -> InputElement {
    InputElement::PlainTextInput {
        action_id: action_id.to_string(),
        multiline,
        placeholder: Some(PlainText::new(placeholder)),
    }
}

fn select(
    (_, action_id): (&str, &str),
    placeholder: &str,
    table: &[(&str, &str)],
) -> InputElement {
    InputElement::StaticSelect {
        action_id: action_id.to_string(),
        placeholder: Some(PlainText::new(placeholder)),
        options: OptionObject::from_table(table),
    }
}

fn users_select((_, action_id): (&str, &str), placeholder: &str) -> InputElement {
    InputElement::MultiUsersSelect {
        action_id: action_id.to_string(),
        placeholder: Some(PlainText::new(placeholder)),
    }
}

/// Open the intake modal for a request kind.
#[must_use]
pub fn request_modal(kind: RequestKind) -> View {
    match kind {
        RequestKind::Pentest => pentest_request_modal(),
        RequestKind::ThreatModeling => threat_modeling_request_modal(),
    }
}

/// Pentest intake modal.
#[must_use]
pub fn pentest_request_modal() -> View {
    let blocks = vec![
        Block::section(Text::mrkdwn(
            "*Bestill en pentest eller start en dialog*\n\n\
             Dette skjemaet er den raskeste veien for å komme i gang med en sikkerhetstest. \
             Det er helt uforpliktende, og du trenger *ikke* ha alle svarene klare nå.\n\n\
             *Hva skjer etter at du sender inn?*\n\
             1. Vi mottar forespørselen og oppretter en privat Slack-kanal og en sak.\n\
             2. Du og teamet ditt blir invitert, sammen med sikkerhetsteamet.\n\
             3. I kanalen avklarer vi scope, finner riktig tidspunkt og planlegger testen sammen.\n\n\
             *Viktig:* Ikke skriv passord, personopplysninger eller forretningshemmeligheter i skjemaet.",
        )),
        input(
            field::PROJECT_NAME,
            "Prosjektnavn",
            text_input(field::PROJECT_NAME, false, "Skriv inn prosjekt- eller applikasjonsnavn"),
            false,
            None,
        ),
        input(
            field::TARGET_SCOPE,
            "Hva skal testes?",
            text_input(
                field::TARGET_SCOPE,
                true,
                "F.eks. https://example.com, API-endepunkter, mobilapp, testmiljø, osv.",
            ),
            true,
            None,
        ),
        input(
            field::PENTEST_TYPE,
            "Type test",
            select(field::PENTEST_TYPE, "Velg testtype (hvis du vet)", PENTEST_TYPES),
            false,
            None,
        ),
        input(
            field::URGENCY,
            "Hastegrad",
            select(field::URGENCY, "Velg omtrentlig hastegrad", URGENCY_LEVELS),
            false,
            None,
        ),
        input(
            field::FULL_REPORT,
            "Fullstendig rapport?",
            InputElement::RadioButtons {
                action_id: field::FULL_REPORT.1.to_string(),
                options: vec![
                    OptionObject::new(
                        "Ja, jeg ønsker fullstendig rapport i tillegg til saker",
                        "yes",
                    ),
                    OptionObject::new("Nei, saker er tilstrekkelig", "no"),
                ],
            },
            true,
            Some("Velg om du ønsker en rapport (PDF) i tillegg til saker"),
        ),
        input(
            field::TEAM_MEMBERS,
            "Teammedlemmer",
            users_select(field::TEAM_MEMBERS, "Velg relevante personer (valgfritt)"),
            true,
            Some("Velg personer som kan være med i dialogen eller følge opp"),
        ),
        input(
            field::ADDITIONAL_INFO,
            "Tilleggsinformasjon",
            text_input(field::ADDITIONAL_INFO, true, "Del gjerne annen info eller spørsmål"),
            true,
            None,
        ),
        Block::context(
            "_Når forespørselen er sendt, oppretter vi en Slack-kanal og en sak for videre dialog._",
        ),
    ];

    View::modal("Pentest-forespørsel", "Avbryt", blocks)
        .with_submit(callback::PENTEST_REQUEST, "Send inn")
}

/// Threat-modeling intake modal.
#[must_use]
pub fn threat_modeling_request_modal() -> View {
    let blocks = vec![
        Block::section(Text::mrkdwn(
            "*Bestill trusselmodellering*\n\n\
             Beskriv systemet så godt du kan. Vi tar resten av dialogen i en egen kanal.",
        )),
        input(
            field::PROJECT_NAME,
            "Prosjektnavn",
            text_input(field::PROJECT_NAME, false, "Skriv inn prosjekt- eller systemnavn"),
            false,
            None,
        ),
        input(
            field::SYSTEM_DESCRIPTION,
            "Systembeskrivelse",
            text_input(
                field::SYSTEM_DESCRIPTION,
                true,
                "Kort om systemet, dataflyt og integrasjoner",
            ),
            true,
            None,
        ),
        input(
            field::THREAT_MODELING_TYPE,
            "Type trusselmodellering",
            select(field::THREAT_MODELING_TYPE, "Velg type", THREAT_MODELING_TYPES),
            true,
            None,
        ),
        input(
            field::PRIORITY,
            "Prioritet",
            select(field::PRIORITY, "Velg prioritet", PRIORITY_LEVELS),
            true,
            None,
        ),
        input(
            field::TEAM_MEMBERS,
            "Teammedlemmer",
            users_select(field::TEAM_MEMBERS, "Velg relevante personer (valgfritt)"),
            true,
            None,
        ),
        input(
            field::ADDITIONAL_INFO,
            "Tilleggsinformasjon",
            text_input(field::ADDITIONAL_INFO, true, "Del gjerne annen info eller spørsmål"),
            true,
            None,
        ),
    ];

    View::modal("Trusselmodellering", "Avbryt", blocks)
        .with_submit(callback::THREAT_MODELING_REQUEST, "Send inn")
}

/// Approval modal with an optional ticket URL.
#[must_use]
pub fn approve_modal(metadata: &PrivateMetadata, kind: RequestKind) -> View {
    View::modal(
        "Godkjenn forespørsel",
        "Avbryt",
        vec![
            Block::section(Text::mrkdwn(format!(
                "Du er i ferd med å godkjenne denne {}-forespørselen. \
                 Du kan eventuelt knytte en Jira-sak for oppfølging.",
                kind_noun(kind)
            ))),
            input(
                field::JIRA_URL,
                "Jira-sak URL",
                InputElement::UrlTextInput {
                    action_id: field::JIRA_URL.1.to_string(),
                    placeholder: Some(PlainText::new("https://firma.atlassian.net/browse/SEC-123")),
                },
                true,
                Some("Valgfritt: Lenke til saken for denne forespørselen"),
            ),
        ],
    )
    .with_submit(callback::APPROVE, "Godkjenn")
    .with_private_metadata(metadata.encode())
}

/// Rejection modal asking for a reason.
#[must_use]
pub fn reject_modal(metadata: &PrivateMetadata) -> View {
    View::modal(
        "Avvis forespørsel",
        "Avbryt",
        vec![input(
            field::REJECTION_REASON,
            "Grunn til avvisning",
            text_input(field::REJECTION_REASON, true, "Vennligst oppgi grunn for avvisning..."),
            false,
            None,
        )],
    )
    .with_submit(callback::REJECT, "Avvis")
    .with_private_metadata(metadata.encode())
}

/// Modal for asking the requester a question.
#[must_use]
pub fn request_info_modal(metadata: &PrivateMetadata) -> View {
    View::modal(
        "Forespør informasjon",
        "Avbryt",
        vec![input(
            field::INFO_REQUEST,
            "Melding til forespørrer",
            text_input(field::INFO_REQUEST, true, "Hvilken tilleggsinformasjon trenger du?"),
            false,
            None,
        )],
    )
    .with_submit(callback::REQUEST_INFO, "Send")
    .with_private_metadata(metadata.encode())
}

/// Modal for the requester's reply.
#[must_use]
pub fn reply_modal(metadata: &PrivateMetadata) -> View {
    View::modal(
        "Svar til administrator",
        "Avbryt",
        vec![input(
            field::REPLY_MESSAGE,
            "Ditt svar",
            text_input(field::REPLY_MESSAGE, true, "Ditt svar..."),
            false,
            None,
        )],
    )
    .with_submit(callback::REPLY, "Send")
    .with_private_metadata(metadata.encode())
}

/// Status update modal offering the updatable statuses.
#[must_use]
pub fn status_update_modal(metadata: &PrivateMetadata) -> View {
    let options = RequestStatus::UPDATABLE
        .iter()
        .map(|status| OptionObject::new(status.label(), status.code()))
        .collect();

    View::modal(
        "Oppdater status",
        "Avbryt",
        vec![
            input(
                field::STATUS,
                "Status",
                InputElement::StaticSelect {
                    action_id: field::STATUS.1.to_string(),
                    placeholder: Some(PlainText::new("Velg status")),
                    options,
                },
                false,
                None,
            ),
            input(
                field::STATUS_NOTE,
                "Notater",
                text_input(field::STATUS_NOTE, true, "Legg til notater eller oppdateringer..."),
                true,
                None,
            ),
        ],
    )
    .with_submit(callback::STATUS_UPDATE, "Oppdater")
    .with_private_metadata(metadata.encode())
}

/// Read-only details of a request and its status history.
#[must_use]
pub fn request_details_modal(request: &Request, history: &[StatusHistoryEntry]) -> View {
    let approved_by = request
        .approved_by
        .as_ref()
        .map_or_else(|| "Ikke godkjent".to_string(), |u| format!("<@{u}>"));
    let scope = if request.target_scope.is_empty() {
        "Ikke oppgitt"
    } else {
        request.target_scope.as_str()
    };
    let info = if request.additional_info.is_empty() {
        "Ingen"
    } else {
        request.additional_info.as_str()
    };

    let mut blocks = vec![
        Block::header(format!("Forespørselsdetaljer: {}", request.project_name)),
        Block::fields(vec![
            Text::mrkdwn(format!("*{LABEL_REQUEST_ID}:*\n{}", request.request_id)),
            Text::mrkdwn(format!("*Status:*\n{}", request.status.label())),
        ]),
        Block::fields(vec![
            Text::mrkdwn(format!("*{LABEL_REQUESTED_BY}:*\n<@{}>", request.requested_by)),
            Text::mrkdwn(format!("*Godkjent av:*\n{approved_by}")),
        ]),
        Block::fields(vec![
            Text::mrkdwn(format!("*{LABEL_PROJECT}:*\n{}", request.project_name)),
            Text::mrkdwn(format!("*Teammedlemmer:*\n{}", mentions(&request.team_members))),
        ]),
        Block::Divider,
        Block::section(Text::mrkdwn(format!(
            "*Testområde:*\n{scope}\n\n*Tilleggsinformasjon:*\n{info}"
        ))),
    ];

    if let Some(url) = &request.ticket_url {
        blocks.push(Block::section(Text::mrkdwn(format!("*Sak:*\n{url}"))));
    }

    if !history.is_empty() {
        let lines: Vec<String> = history
            .iter()
            .map(|entry| {
                format!(
                    "• {} - <@{}> ({})",
                    entry.status_text,
                    entry.updated_by,
                    entry.timestamp.format("%d.%m.%Y %H:%M")
                )
            })
            .collect();
        blocks.push(Block::Divider);
        blocks.push(Block::section(Text::mrkdwn(format!(
            "*Statushistorikk:*\n{}",
            lines.join("\n")
        ))));
    }

    View::modal("Forespørselsdetaljer", "Lukk", blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sape_core::{RequestId, UserId};

    fn json(view: &View) -> serde_json::Value {
        serde_json::to_value(view).expect("serialize")
    }

    fn block_ids(view: &View) -> Vec<String> {
        json(view)["blocks"]
            .as_array()
            .expect("blocks")
            .iter()
            .filter_map(|b| b["block_id"].as_str().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_pentest_modal_inputs() {
        let view = pentest_request_modal();
        assert_eq!(view.callback_id.as_deref(), Some(callback::PENTEST_REQUEST));
        assert_eq!(
            block_ids(&view),
            [
                "project_name",
                "target_scope",
                "pentest_type",
                "urgency",
                "full_report",
                "team_members",
                "additional_info"
            ]
        );
    }

    #[test]
    fn test_threat_modeling_modal_inputs() {
        let view = request_modal(RequestKind::ThreatModeling);
        assert_eq!(view.callback_id.as_deref(), Some(callback::THREAT_MODELING_REQUEST));
        let ids = block_ids(&view);
        assert!(ids.contains(&"system_description".to_string()));
        assert!(ids.contains(&"priority".to_string()));
    }

    #[test]
    fn test_action_modals_carry_private_metadata() {
        let metadata = PrivateMetadata {
            request_id: "PT-1000".to_string(),
            channel_id: Some("C012345678".to_string()),
            message_ts: Some("1700000000.000100".to_string()),
        };
        for view in [
            approve_modal(&metadata, RequestKind::Pentest),
            reject_modal(&metadata),
            request_info_modal(&metadata),
            reply_modal(&metadata),
            status_update_modal(&metadata),
        ] {
            let raw = view.private_metadata.as_deref().expect("metadata");
            assert_eq!(PrivateMetadata::decode(raw), metadata);
        }
    }

    #[test]
    fn test_status_modal_offers_updatable_statuses() {
        let view = status_update_modal(&PrivateMetadata::default());
        let body = json(&view);
        let options = body["blocks"][0]["element"]["options"]
            .as_array()
            .expect("options");
        let codes: Vec<&str> = options.iter().filter_map(|o| o["value"].as_str()).collect();
        assert_eq!(codes, ["in_progress", "review", "reporting", "complete", "on_hold"]);
    }

    #[test]
    fn test_details_modal_renders_history() {
        let at = chrono::Utc
            .timestamp_millis_opt(1_700_000_000_000)
            .single()
            .expect("time");
        let admin = UserId::parse("U0000000002").expect("user");
        let request = Request::new(
            RequestId::parse("PT-1700000000000").expect("id"),
            RequestKind::Pentest,
            "Foo",
            UserId::parse("U0000000001").expect("user"),
            at,
        );
        let history = [StatusHistoryEntry {
            status: RequestStatus::Review,
            status_text: RequestStatus::Review.label().to_string(),
            updated_by: admin,
            note: None,
            timestamp: at,
        }];

        let body = serde_json::to_string(&request_details_modal(&request, &history))
            .expect("serialize");
        assert!(body.contains("Statushistorikk"));
        assert!(body.contains("Gjennomgang av funn - <@U0000000002>"));
        assert!(body.contains("Ikke godkjent"));
    }
}
