//! The fixed schema of the request list.

use sape_core::{ListStatus, PENTEST_TYPES, THREAT_MODELING_TYPES, URGENCY_LEVELS};

use super::types::{ColumnOptions, ColumnSchema, ColumnType, SelectChoice};

/// Display name of the request list.
pub const LIST_NAME: &str = "Pentest-bestillinger";

/// Text written to the admin message column before a notification exists.
pub const ADMIN_MESSAGE_PLACEHOLDER: &str = "Ingen melding ennå";

/// Semantic name of a list column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnAlias {
    ProjectName,
    RequestId,
    Status,
    Urgency,
    AssignedTo,
    RequestedBy,
    RequestType,
    AdminMessageTs,
}

impl ColumnAlias {
    pub const ALL: [Self; 8] = [
        Self::ProjectName,
        Self::RequestId,
        Self::Status,
        Self::Urgency,
        Self::AssignedTo,
        Self::RequestedBy,
        Self::RequestType,
        Self::AdminMessageTs,
    ];

    /// Column key in the list schema.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::ProjectName => "project_name",
            Self::RequestId => "request_id",
            Self::Status => "status",
            Self::Urgency => "urgency",
            Self::AssignedTo => "assigned_to",
            Self::RequestedBy => "requested_by",
            Self::RequestType => "request_type",
            Self::AdminMessageTs => "admin_message_ts",
        }
    }

    /// Column header shown in the list.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ProjectName => "Prosjektnavn",
            Self::RequestId => "Forespørsels-ID",
            Self::Status => "Status",
            Self::Urgency => "Hastegrad",
            Self::AssignedTo => "Tildelt til",
            Self::RequestedBy => "Forespurt av",
            Self::RequestType => "Type",
            Self::AdminMessageTs => "Admin-melding",
        }
    }

    #[must_use]
    pub const fn column_type(self) -> ColumnType {
        match self {
            Self::ProjectName | Self::RequestId | Self::AdminMessageTs => ColumnType::Text,
            Self::Status | Self::Urgency | Self::RequestType => ColumnType::Select,
            Self::AssignedTo | Self::RequestedBy => ColumnType::User,
        }
    }

    /// Resolve a schema column by key, falling back to its display name.
    #[must_use]
    pub fn resolve(key: Option<&str>, name: Option<&str>) -> Option<Self> {
        key.and_then(|k| Self::ALL.into_iter().find(|a| a.key() == k))
            .or_else(|| name.and_then(|n| Self::ALL.into_iter().find(|a| a.name() == n)))
    }

    fn choices(self) -> Vec<SelectChoice> {
        let choice = |value: &str, label: &str, color: &str| SelectChoice {
            value: value.to_string(),
            label: label.to_string(),
            color: Some(color.to_string()),
        };

        match self {
            Self::Status => ListStatus::ALL
                .iter()
                .map(|s| {
                    let color = match s {
                        ListStatus::Pending => "yellow",
                        ListStatus::InProgress => "blue",
                        ListStatus::Done => "green",
                        ListStatus::Rejected => "red",
                    };
                    choice(s.code(), s.label(), color)
                })
                .collect(),
            Self::Urgency => URGENCY_LEVELS
                .iter()
                .map(|(code, label)| {
                    let color = match *code {
                        "critical" => "red",
                        "high" => "orange",
                        "medium" => "yellow",
                        "low" => "green",
                        _ => "gray",
                    };
                    choice(*code, *label, color)
                })
                .collect(),
            Self::RequestType => {
                let mut out: Vec<SelectChoice> = Vec::new();
                for (code, label) in PENTEST_TYPES.iter().chain(THREAT_MODELING_TYPES) {
                    if !out.iter().any(|c| c.value == *code) {
                        out.push(choice(*code, *label, "gray"));
                    }
                }
                out
            }
            _ => Vec::new(),
        }
    }

    fn definition(self) -> ColumnSchema {
        let choices = self.choices();
        ColumnSchema {
            id: None,
            key: self.key().to_string(),
            name: self.name().to_string(),
            column_type: self.column_type(),
            is_primary_column: self == Self::ProjectName,
            options: (!choices.is_empty()).then_some(ColumnOptions { choices }),
        }
    }
}

/// Schema sent when provisioning the list.
#[must_use]
pub fn list_schema() -> Vec<ColumnSchema> {
    ColumnAlias::ALL.into_iter().map(ColumnAlias::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_one_primary_column() {
        let schema = list_schema();
        assert_eq!(schema.len(), ColumnAlias::ALL.len());
        let primary: Vec<&str> = schema
            .iter()
            .filter(|c| c.is_primary_column)
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(primary, ["project_name"]);
    }

    #[test]
    fn test_status_column_offers_list_vocabulary() {
        let schema = list_schema();
        let status = schema.iter().find(|c| c.key == "status").expect("status");
        let codes: Vec<&str> = status
            .options
            .as_ref()
            .expect("options")
            .choices
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(codes, ["pending", "in_progress", "done", "rejected"]);
    }

    #[test]
    fn test_request_type_choices_are_unique() {
        let schema = list_schema();
        let column = schema.iter().find(|c| c.key == "request_type").expect("type");
        let choices = &column.options.as_ref().expect("options").choices;
        let others = choices.iter().filter(|c| c.value == "other").count();
        assert_eq!(others, 1);
        assert!(choices.iter().any(|c| c.value == "standalone"));
    }

    #[test]
    fn test_resolve_by_key_then_name() {
        assert_eq!(
            ColumnAlias::resolve(Some("status"), None),
            Some(ColumnAlias::Status)
        );
        assert_eq!(
            ColumnAlias::resolve(Some("custom"), Some("Forespurt av")),
            Some(ColumnAlias::RequestedBy)
        );
        assert_eq!(ColumnAlias::resolve(Some("custom"), Some("Notes")), None);
    }
}
