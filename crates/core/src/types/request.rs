//! The intake request model.
//!
//! A [`Request`] is the full record of one submission. A [`RequestPatch`] is
//! the same record with every field optional; it describes partial updates
//! and is what the process-local cache stores, since the cache may only know
//! part of a request at any time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChannelId, MessageTs, RequestId, RequestKind, RowId, UserId};
use super::status::RequestStatus;

/// Pentest types offered in the request modal.
pub const PENTEST_TYPES: &[(&str, &str)] = &[
    ("web_app", "Webapplikasjon"),
    ("mobile_app", "Mobilapplikasjon"),
    ("api", "API"),
    ("network", "Nettverk"),
    ("cloud", "Skyinfrastruktur"),
    ("other", "Annet / usikker"),
];

/// Pentest urgency levels.
pub const URGENCY_LEVELS: &[(&str, &str)] = &[
    ("critical", "Kritisk (innen 1 uke)"),
    ("high", "Høy (1–2 uker)"),
    ("medium", "Normal (2–4 uker)"),
    ("low", "Lav (4+ uker eller fleksibelt)"),
    ("unknown", "Usikker enda"),
];

/// Threat-modeling types.
pub const THREAT_MODELING_TYPES: &[(&str, &str)] = &[
    ("standalone", "Enkeltstående trusselmodellering"),
    ("risk_assessment_part", "Del av en risikovurdering av system"),
    ("other", "Annet"),
];

/// Threat-modeling priorities.
pub const PRIORITY_LEVELS: &[(&str, &str)] = &[
    ("high", "Høy"),
    ("medium", "Middels"),
    ("low", "Lav"),
];

/// An enumerated code paired with its display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Choice {
    pub code: String,
    pub label: String,
}

impl Choice {
    /// Create a choice from an explicit code and label.
    #[must_use]
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }

    /// Look a code up in a label table, falling back to the code itself.
    #[must_use]
    pub fn from_table(table: &[(&str, &str)], code: &str) -> Self {
        let label = table
            .iter()
            .find(|(c, _)| *c == code)
            .map_or(code, |(_, label)| *label);
        Self::new(code, label)
    }

    /// Type choice for a request kind (pentest type or threat-modeling type).
    #[must_use]
    pub fn request_type(kind: RequestKind, code: &str) -> Self {
        Self::from_table(type_table(kind), code)
    }

    /// Urgency choice for a request kind (urgency or priority).
    #[must_use]
    pub fn urgency(kind: RequestKind, code: &str) -> Self {
        Self::from_table(urgency_table(kind), code)
    }

    /// True if no code has been set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

/// Label table for the type field of a request kind.
#[must_use]
pub const fn type_table(kind: RequestKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        RequestKind::Pentest => PENTEST_TYPES,
        RequestKind::ThreatModeling => THREAT_MODELING_TYPES,
    }
}

/// Label table for the urgency field of a request kind.
#[must_use]
pub const fn urgency_table(kind: RequestKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        RequestKind::Pentest => URGENCY_LEVELS,
        RequestKind::ThreatModeling => PRIORITY_LEVELS,
    }
}

/// Whether the requester wants a full written report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FullReport {
    Yes,
    No,
    #[default]
    Unspecified,
}

impl FullReport {
    /// Parse a radio-button value; anything other than `yes`/`no` is unspecified.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("yes") => Self::Yes,
            Some("no") => Self::No,
            _ => Self::Unspecified,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "Ja",
            Self::No => "Nei",
            Self::Unspecified => "Ikke oppgitt",
        }
    }
}

/// Requester checklist items shown on the channel welcome message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistItem {
    Scope,
    Access,
    Timing,
    Contacts,
    Considerations,
}

impl ChecklistItem {
    pub const ALL: [Self; 5] = [
        Self::Scope,
        Self::Access,
        Self::Timing,
        Self::Contacts,
        Self::Considerations,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Scope => "scope",
            Self::Access => "access",
            Self::Timing => "timing",
            Self::Contacts => "contacts",
            Self::Considerations => "considerations",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Scope => "Definer scope",
            Self::Access => "Tilganger / testdata",
            Self::Timing => "Tidspunkt for test",
            Self::Contacts => "Kontaktpersoner",
            Self::Considerations => "Spesielle hensyn",
        }
    }

    /// Resolve a checkbox value; unknown values are ignored by callers.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|item| item.code() == code)
    }
}

/// Where a request record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Read from the list and/or the cache.
    #[default]
    Store,
    /// Recovered from a rendered notification message after state loss.
    Reconstructed,
}

/// A complete intake request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    pub kind: RequestKind,
    pub project_name: String,
    /// Target scope for pentests, system description for threat modeling.
    pub target_scope: String,
    pub additional_info: String,
    pub full_report: FullReport,
    pub request_type: Choice,
    pub urgency: Choice,
    pub requested_by: UserId,
    pub team_members: Vec<UserId>,
    pub assigned_to: Vec<UserId>,
    pub status: RequestStatus,
    pub admin_message_ts: Option<MessageTs>,
    pub channel_id: Option<ChannelId>,
    pub list_item_id: Option<RowId>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Jira URL entered at approval, or the tracker card created for it.
    pub ticket_url: Option<String>,
    pub checklist: Vec<ChecklistItem>,
    pub requested_at: DateTime<Utc>,
    pub provenance: Provenance,
}

impl Request {
    /// Create a pending request with empty optional fields.
    #[must_use]
    pub fn new(
        request_id: RequestId,
        kind: RequestKind,
        project_name: impl Into<String>,
        requested_by: UserId,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            request_id,
            kind,
            project_name: project_name.into(),
            target_scope: String::new(),
            additional_info: String::new(),
            full_report: FullReport::Unspecified,
            request_type: Choice::default(),
            urgency: Choice::default(),
            requested_by,
            team_members: Vec::new(),
            assigned_to: Vec::new(),
            status: RequestStatus::Pending,
            admin_message_ts: None,
            channel_id: None,
            list_item_id: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
            ticket_url: None,
            checklist: Vec::new(),
            requested_at,
            provenance: Provenance::Store,
        }
    }

    /// Build a request from a patch.
    ///
    /// Returns `None` unless the patch knows at least the project name and
    /// the requester. The kind and creation time fall back to what the
    /// request id encodes.
    #[must_use]
    pub fn from_patch(request_id: RequestId, patch: RequestPatch) -> Option<Self> {
        let project_name = patch.project_name.clone()?;
        let requested_by = patch.requested_by.clone()?;
        let kind = patch
            .kind
            .or_else(|| request_id.kind())
            .unwrap_or(RequestKind::Pentest);
        let requested_at = patch
            .requested_at
            .or_else(|| request_id.timestamp())
            .unwrap_or_default();

        let mut request = Self::new(request_id, kind, project_name, requested_by, requested_at);
        request.apply(patch);
        Some(request)
    }

    /// Overwrite every field the patch sets.
    pub fn apply(&mut self, patch: RequestPatch) {
        let RequestPatch {
            kind,
            project_name,
            target_scope,
            additional_info,
            full_report,
            request_type,
            urgency,
            requested_by,
            team_members,
            assigned_to,
            status,
            admin_message_ts,
            channel_id,
            list_item_id,
            approved_by,
            approved_at,
            rejected_by,
            rejected_at,
            rejection_reason,
            ticket_url,
            checklist,
            requested_at,
            provenance,
        } = patch;

        set(&mut self.kind, kind);
        set(&mut self.project_name, project_name);
        set(&mut self.target_scope, target_scope);
        set(&mut self.additional_info, additional_info);
        set(&mut self.full_report, full_report);
        set(&mut self.request_type, request_type);
        set(&mut self.urgency, urgency);
        set(&mut self.requested_by, requested_by);
        set(&mut self.team_members, team_members);
        set(&mut self.assigned_to, assigned_to);
        set(&mut self.status, status);
        set_some(&mut self.admin_message_ts, admin_message_ts);
        set_some(&mut self.channel_id, channel_id);
        set_some(&mut self.list_item_id, list_item_id);
        set_some(&mut self.approved_by, approved_by);
        set_some(&mut self.approved_at, approved_at);
        set_some(&mut self.rejected_by, rejected_by);
        set_some(&mut self.rejected_at, rejected_at);
        set_some(&mut self.rejection_reason, rejection_reason);
        set_some(&mut self.ticket_url, ticket_url);
        set(&mut self.checklist, checklist);
        set(&mut self.requested_at, requested_at);
        set(&mut self.provenance, provenance);
    }

    /// A patch that sets every field of this request.
    #[must_use]
    pub fn to_patch(&self) -> RequestPatch {
        RequestPatch {
            kind: Some(self.kind),
            project_name: Some(self.project_name.clone()),
            target_scope: Some(self.target_scope.clone()),
            additional_info: Some(self.additional_info.clone()),
            full_report: Some(self.full_report),
            request_type: Some(self.request_type.clone()),
            urgency: Some(self.urgency.clone()),
            requested_by: Some(self.requested_by.clone()),
            team_members: Some(self.team_members.clone()),
            assigned_to: Some(self.assigned_to.clone()),
            status: Some(self.status),
            admin_message_ts: self.admin_message_ts.clone(),
            channel_id: self.channel_id.clone(),
            list_item_id: self.list_item_id.clone(),
            approved_by: self.approved_by.clone(),
            approved_at: self.approved_at,
            rejected_by: self.rejected_by.clone(),
            rejected_at: self.rejected_at,
            rejection_reason: self.rejection_reason.clone(),
            ticket_url: self.ticket_url.clone(),
            checklist: Some(self.checklist.clone()),
            requested_at: Some(self.requested_at),
            provenance: Some(self.provenance),
        }
    }

    /// Requester, team members and assignees, deduplicated in that order.
    #[must_use]
    pub fn participants(&self) -> Vec<UserId> {
        let mut out: Vec<UserId> = Vec::new();
        for user in std::iter::once(&self.requested_by)
            .chain(&self.team_members)
            .chain(&self.assigned_to)
        {
            if !out.contains(user) {
                out.push(user.clone());
            }
        }
        out
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_some<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// A partial request. `None` means "leave unchanged".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestPatch {
    pub kind: Option<RequestKind>,
    pub project_name: Option<String>,
    pub target_scope: Option<String>,
    pub additional_info: Option<String>,
    pub full_report: Option<FullReport>,
    pub request_type: Option<Choice>,
    pub urgency: Option<Choice>,
    pub requested_by: Option<UserId>,
    pub team_members: Option<Vec<UserId>>,
    pub assigned_to: Option<Vec<UserId>>,
    pub status: Option<RequestStatus>,
    pub admin_message_ts: Option<MessageTs>,
    pub channel_id: Option<ChannelId>,
    pub list_item_id: Option<RowId>,
    pub approved_by: Option<UserId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<UserId>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub ticket_url: Option<String>,
    pub checklist: Option<Vec<ChecklistItem>>,
    pub requested_at: Option<DateTime<Utc>>,
    pub provenance: Option<Provenance>,
}

impl RequestPatch {
    /// A patch that only sets the status.
    #[must_use]
    pub fn status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Fold another patch into this one; fields set in `other` win.
    pub fn merge(&mut self, other: Self) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            kind,
            project_name,
            target_scope,
            additional_info,
            full_report,
            request_type,
            urgency,
            requested_by,
            team_members,
            assigned_to,
            status,
            admin_message_ts,
            channel_id,
            list_item_id,
            approved_by,
            approved_at,
            rejected_by,
            rejected_at,
            rejection_reason,
            ticket_url,
            checklist,
            requested_at,
            provenance,
        );
    }

    /// True if the patch touches any field the backing list stores.
    #[must_use]
    pub const fn touches_row(&self) -> bool {
        self.project_name.is_some()
            || self.status.is_some()
            || self.urgency.is_some()
            || self.request_type.is_some()
            || self.requested_by.is_some()
            || self.assigned_to.is_some()
            || self.admin_message_ts.is_some()
    }
}

/// One status-update entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: RequestStatus,
    /// Label as shown to users when the entry was made.
    pub status_text: String,
    pub updated_by: UserId,
    pub note: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The request fields embedded in a notification message's metadata.
///
/// This is what survives in the chat history when the process restarts, so
/// it carries the submission fields the list does not store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub request_id: RequestId,
    pub project_name: String,
    pub requested_by: UserId,
    #[serde(default)]
    pub target_scope: String,
    #[serde(default)]
    pub additional_info: String,
    #[serde(default)]
    pub full_report: FullReport,
    #[serde(default)]
    pub request_type: Choice,
    #[serde(default)]
    pub urgency: Choice,
    #[serde(default)]
    pub team_members: Vec<UserId>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

impl From<&Request> for RequestSnapshot {
    fn from(request: &Request) -> Self {
        Self {
            request_id: request.request_id.clone(),
            project_name: request.project_name.clone(),
            requested_by: request.requested_by.clone(),
            target_scope: request.target_scope.clone(),
            additional_info: request.additional_info.clone(),
            full_report: request.full_report,
            request_type: request.request_type.clone(),
            urgency: request.urgency.clone(),
            team_members: request.team_members.clone(),
            requested_at: Some(request.requested_at),
        }
    }
}

impl RequestSnapshot {
    /// Rebuild a pending request of the given kind from the snapshot.
    #[must_use]
    pub fn into_request(self, kind: RequestKind) -> Request {
        let requested_at = self
            .requested_at
            .or_else(|| self.request_id.timestamp())
            .unwrap_or_default();
        let mut request = Request::new(
            self.request_id,
            kind,
            self.project_name,
            self.requested_by,
            requested_at,
        );
        request.target_scope = self.target_scope;
        request.additional_info = self.additional_info;
        request.full_report = self.full_report;
        request.request_type = self.request_type;
        request.urgency = self.urgency;
        request.team_members = self.team_members;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn user(id: &str) -> UserId {
        UserId::parse(id).expect("valid user id")
    }

    fn sample() -> Request {
        let at = Utc.timestamp_millis_opt(1_700_000_000_000).single().expect("time");
        let mut request = Request::new(
            RequestId::generate(RequestKind::Pentest, at),
            RequestKind::Pentest,
            "Foo",
            user("U0000000001"),
            at,
        );
        request.urgency = Choice::urgency(RequestKind::Pentest, "critical");
        request
    }

    #[test]
    fn test_choice_labels_from_tables() {
        let urgency = Choice::urgency(RequestKind::Pentest, "critical");
        assert_eq!(urgency.label, "Kritisk (innen 1 uke)");

        let priority = Choice::urgency(RequestKind::ThreatModeling, "medium");
        assert_eq!(priority.label, "Middels");

        let unknown = Choice::request_type(RequestKind::Pentest, "iot");
        assert_eq!(unknown.label, "iot");
    }

    #[test]
    fn test_patch_merge_overwrites_only_set_fields() {
        let mut base = RequestPatch {
            project_name: Some("Foo".to_owned()),
            target_scope: Some("https://foo.example".to_owned()),
            ..RequestPatch::default()
        };
        base.merge(RequestPatch {
            project_name: Some("Bar".to_owned()),
            status: Some(RequestStatus::Approved),
            ..RequestPatch::default()
        });

        assert_eq!(base.project_name.as_deref(), Some("Bar"));
        assert_eq!(base.target_scope.as_deref(), Some("https://foo.example"));
        assert_eq!(base.status, Some(RequestStatus::Approved));
    }

    #[test]
    fn test_from_patch_requires_identity_fields() {
        let id = RequestId::parse("PT-1000").expect("id");
        assert!(Request::from_patch(id.clone(), RequestPatch::default()).is_none());

        let patch = RequestPatch {
            project_name: Some("Foo".to_owned()),
            requested_by: Some(user("U0000000001")),
            ..RequestPatch::default()
        };
        let request = Request::from_patch(id, patch).expect("complete enough");
        assert_eq!(request.kind, RequestKind::Pentest);
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.requested_at.timestamp_millis(), 1000);
    }

    #[test]
    fn test_to_patch_then_from_patch_preserves_request() {
        let mut request = sample();
        request.ticket_url = Some("https://jira.example/browse/SEC-1".to_owned());
        request.checklist = vec![ChecklistItem::Scope, ChecklistItem::Timing];

        let rebuilt =
            Request::from_patch(request.request_id.clone(), request.to_patch()).expect("rebuild");
        assert_eq!(rebuilt, request);
    }

    #[test]
    fn test_participants_deduplicates() {
        let mut request = sample();
        request.team_members = vec![user("U0000000002"), user("U0000000001")];
        request.assigned_to = vec![user("U0000000002"), user("U0000000003")];

        let participants = request.participants();
        let ids: Vec<&str> = participants.iter().map(UserId::as_str).collect();
        assert_eq!(ids, ["U0000000001", "U0000000002", "U0000000003"]);
    }

    #[test]
    fn test_touches_row() {
        assert!(RequestPatch::status(RequestStatus::Approved).touches_row());
        let cache_only = RequestPatch {
            ticket_url: Some("https://trello.com/c/abc".to_owned()),
            ..RequestPatch::default()
        };
        assert!(!cache_only.touches_row());
    }

    #[test]
    fn test_full_report_codes() {
        assert_eq!(FullReport::from_code(Some("yes")), FullReport::Yes);
        assert_eq!(FullReport::from_code(Some("maybe")), FullReport::Unspecified);
        assert_eq!(FullReport::from_code(None).label(), "Ikke oppgitt");
    }

    #[test]
    fn test_checklist_codes() {
        for item in ChecklistItem::ALL {
            assert_eq!(ChecklistItem::from_code(item.code()), Some(item));
        }
        assert_eq!(ChecklistItem::from_code("deliverables"), None);
    }

    #[test]
    fn test_snapshot_round_trips_submission_fields() {
        let mut request = sample();
        request.target_scope = "https://foo.example".to_owned();
        request.team_members = vec![user("U0000000004")];

        let json = serde_json::to_value(RequestSnapshot::from(&request)).expect("serialize");
        assert_eq!(json["requestId"], request.request_id.as_str());
        assert_eq!(json["projectName"], "Foo");

        let snapshot: RequestSnapshot = serde_json::from_value(json).expect("deserialize");
        let rebuilt = snapshot.into_request(RequestKind::Pentest);
        assert_eq!(rebuilt, request);
    }
}
