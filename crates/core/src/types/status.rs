//! Status vocabularies for intake requests.
//!
//! Requests carry a fine-grained [`RequestStatus`]; the backing list only
//! understands the four-value [`ListStatus`]. The projection between the two
//! is lossy: `approved` and `on_hold` both land on list `pending`, and the
//! reverse direction can only recover the coarse status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Submitted, waiting for an admin decision.
    #[default]
    Pending,
    /// Approved; a discussion channel exists.
    Approved,
    /// Rejected by an admin. Terminal.
    Rejected,
    InProgress,
    /// Findings under review.
    Review,
    /// Report being written.
    Reporting,
    /// Marked complete from the status-update modal. Terminal.
    Complete,
    /// Completed as read back from the list. Terminal.
    Completed,
    OnHold,
    /// Alternate spelling of completed. Terminal.
    Done,
}

impl RequestStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::InProgress,
        Self::Review,
        Self::Reporting,
        Self::Complete,
        Self::Completed,
        Self::OnHold,
        Self::Done,
    ];

    /// Statuses an admin may pick in the status-update modal.
    pub const UPDATABLE: [Self; 5] = [
        Self::InProgress,
        Self::Review,
        Self::Reporting,
        Self::Complete,
        Self::OnHold,
    ];

    /// Wire code for this status.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Reporting => "reporting",
            Self::Complete => "complete",
            Self::Completed => "completed",
            Self::OnHold => "on_hold",
            Self::Done => "done",
        }
    }

    /// Norwegian display label used in messages and the details modal.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Venter",
            Self::Approved => "Godkjent",
            Self::Rejected => "Avvist",
            Self::InProgress => "Pågår",
            Self::Review => "Gjennomgang av funn",
            Self::Reporting => "Rapportskriving",
            Self::Complete | Self::Completed | Self::Done => "Fullført",
            Self::OnHold => "På vent",
        }
    }

    /// Project onto the list vocabulary.
    #[must_use]
    pub const fn to_list(self) -> ListStatus {
        match self {
            Self::Pending | Self::Approved | Self::OnHold => ListStatus::Pending,
            Self::InProgress | Self::Review | Self::Reporting => ListStatus::InProgress,
            Self::Complete | Self::Completed | Self::Done => ListStatus::Done,
            Self::Rejected => ListStatus::Rejected,
        }
    }

    /// True once no further transitions are accepted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Complete | Self::Completed | Self::Done
        )
    }

    /// True if a status update may move a request from this status.
    ///
    /// Only approved, not-yet-finished requests accept status updates.
    #[must_use]
    pub const fn accepts_status_update(self) -> bool {
        matches!(
            self,
            Self::Approved | Self::InProgress | Self::Review | Self::Reporting | Self::OnHold
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| format!("invalid request status: {s}"))
    }
}

/// Status vocabulary of the backing list's select column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Rejected,
}

impl ListStatus {
    /// Every list status, in column option order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::InProgress, Self::Done, Self::Rejected];

    /// Select option code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Rejected => "rejected",
        }
    }

    /// Option label shown in the list.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Venter",
            Self::InProgress => "Pågår",
            Self::Done => "Fullført",
            Self::Rejected => "Avvist",
        }
    }

    /// Recover a request status from a list status.
    #[must_use]
    pub const fn to_request(self) -> RequestStatus {
        match self {
            Self::Pending => RequestStatus::Pending,
            Self::InProgress => RequestStatus::InProgress,
            Self::Done => RequestStatus::Completed,
            Self::Rejected => RequestStatus::Rejected,
        }
    }

    /// Project an arbitrary request status code, defaulting to `pending` for
    /// anything unrecognized.
    #[must_use]
    pub fn from_request_code(code: &str) -> Self {
        code.parse::<RequestStatus>()
            .map_or(Self::Pending, RequestStatus::to_list)
    }
}

impl std::fmt::Display for ListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ListStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.code() == s)
            .ok_or_else(|| format!("invalid list status: {s}"))
    }
}

/// Pick the status to report when a row and a cached record disagree.
///
/// The cached status is finer-grained; it wins as long as it still projects
/// onto what the row says. Otherwise the row has moved on and its status wins.
#[must_use]
pub fn merge_status(row: ListStatus, cached: Option<RequestStatus>) -> RequestStatus {
    match cached {
        Some(status) if status.to_list() == row => status,
        _ => row.to_request(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_projection_is_lossy_and_total() {
        let expected = [
            (RequestStatus::Pending, ListStatus::Pending),
            (RequestStatus::Approved, ListStatus::Pending),
            (RequestStatus::OnHold, ListStatus::Pending),
            (RequestStatus::InProgress, ListStatus::InProgress),
            (RequestStatus::Review, ListStatus::InProgress),
            (RequestStatus::Reporting, ListStatus::InProgress),
            (RequestStatus::Complete, ListStatus::Done),
            (RequestStatus::Completed, ListStatus::Done),
            (RequestStatus::Done, ListStatus::Done),
            (RequestStatus::Rejected, ListStatus::Rejected),
        ];
        assert_eq!(expected.len(), RequestStatus::ALL.len());
        for (status, list) in expected {
            assert_eq!(status.to_list(), list, "{status}");
        }
    }

    #[test]
    fn test_reverse_projection() {
        assert_eq!(ListStatus::Pending.to_request(), RequestStatus::Pending);
        assert_eq!(ListStatus::InProgress.to_request(), RequestStatus::InProgress);
        assert_eq!(ListStatus::Done.to_request(), RequestStatus::Completed);
        assert_eq!(ListStatus::Rejected.to_request(), RequestStatus::Rejected);
    }

    #[test]
    fn test_round_trip_is_not_identity() {
        assert_eq!(
            RequestStatus::Approved.to_list().to_request(),
            RequestStatus::Pending
        );
        assert_eq!(
            RequestStatus::Review.to_list().to_request(),
            RequestStatus::InProgress
        );
    }

    #[test]
    fn test_from_request_code_defaults_to_pending() {
        assert_eq!(ListStatus::from_request_code("review"), ListStatus::InProgress);
        assert_eq!(ListStatus::from_request_code("processed"), ListStatus::Pending);
        assert_eq!(ListStatus::from_request_code(""), ListStatus::Pending);
    }

    #[test]
    fn test_codes_parse_back() {
        for status in RequestStatus::ALL {
            assert_eq!(status.code().parse::<RequestStatus>(), Ok(status));
        }
        for status in ListStatus::ALL {
            assert_eq!(status.to_string().parse::<ListStatus>(), Ok(status));
        }
        assert!("archived".parse::<ListStatus>().is_err());
    }

    #[test]
    fn test_merge_status_keeps_finer_cached_status() {
        assert_eq!(
            merge_status(ListStatus::Pending, Some(RequestStatus::Approved)),
            RequestStatus::Approved
        );
        assert_eq!(
            merge_status(ListStatus::Done, Some(RequestStatus::Approved)),
            RequestStatus::Completed
        );
        assert_eq!(merge_status(ListStatus::Rejected, None), RequestStatus::Rejected);
    }

    #[test]
    fn test_status_update_gate() {
        assert!(RequestStatus::Approved.accepts_status_update());
        assert!(RequestStatus::OnHold.accepts_status_update());
        assert!(!RequestStatus::Pending.accepts_status_update());
        assert!(!RequestStatus::Rejected.accepts_status_update());
        assert!(RequestStatus::Done.is_terminal());
    }

    #[test]
    fn test_serde_uses_snake_case_codes() {
        let json = serde_json::to_string(&RequestStatus::InProgress).expect("serialize");
        assert_eq!(json, "\"in_progress\"");
        let status: ListStatus = serde_json::from_str("\"rejected\"").expect("deserialize");
        assert_eq!(status, ListStatus::Rejected);
    }
}
