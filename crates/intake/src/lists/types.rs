//! Slack Lists wire types.
//!
//! Cells are written as `{column_id, rich_text | select | user}` (plus
//! `row_id` on update). Items come back with a `fields` array whose entries
//! carry the column key and id alongside the value in the same shapes.

use sape_core::{ColumnId, ListId, RowId};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};

/// Value of a single list cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    /// Plain string wrapped as rich text on the wire.
    #[serde(serialize_with = "serialize_rich_text")]
    RichText(String),
    /// Select option codes.
    Select(Vec<String>),
    /// User ids.
    User(Vec<String>),
}

fn serialize_rich_text<S: Serializer>(text: &str, serializer: S) -> Result<S::Ok, S::Error> {
    rich_text(text).serialize(serializer)
}

/// Wrap a string in Slack's rich text structure.
#[must_use]
pub fn rich_text(text: &str) -> Value {
    json!([{
        "type": "rich_text",
        "elements": [{
            "type": "rich_text_section",
            "elements": [{ "type": "text", "text": text }]
        }]
    }])
}

/// Concatenate the text nodes of a rich text structure.
///
/// Anything not shaped like rich text yields an empty string.
#[must_use]
pub fn rich_text_to_plain(value: &Value) -> String {
    let mut out = String::new();
    let blocks = value.as_array().into_iter().flatten();
    for block in blocks {
        let sections = block.get("elements").and_then(Value::as_array).into_iter().flatten();
        for section in sections {
            let nodes = section.get("elements").and_then(Value::as_array).into_iter().flatten();
            for node in nodes {
                if let Some(text) = node.get("text").and_then(Value::as_str) {
                    out.push_str(text);
                }
            }
        }
    }
    out
}

/// A cell to write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub column_id: ColumnId,
    #[serde(flatten)]
    pub value: CellValue,
}

impl Cell {
    #[must_use]
    pub fn text(column_id: ColumnId, text: impl Into<String>) -> Self {
        Self {
            column_id,
            value: CellValue::RichText(text.into()),
        }
    }

    #[must_use]
    pub fn select(column_id: ColumnId, code: impl Into<String>) -> Self {
        Self {
            column_id,
            value: CellValue::Select(vec![code.into()]),
        }
    }

    #[must_use]
    pub fn users(column_id: ColumnId, users: Vec<String>) -> Self {
        Self {
            column_id,
            value: CellValue::User(users),
        }
    }
}

/// A cell update, addressed to a row.
#[derive(Debug, Serialize)]
pub struct RowCell<'a> {
    pub row_id: &'a RowId,
    #[serde(flatten)]
    pub cell: &'a Cell,
}

/// Column type in a list schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Select,
    User,
    #[serde(other)]
    Other,
}

/// Option of a select column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectChoice {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<SelectChoice>,
}

/// One column of a list schema.
///
/// `id` is assigned by Slack; it is absent in schemas sent to
/// `slackLists.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_primary_column: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ColumnOptions>,
}

/// A field of a list item as returned by `slackLists.items.list`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemField {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub rich_text: Option<Value>,
    #[serde(default)]
    pub select: Option<Vec<String>>,
    #[serde(default)]
    pub user: Option<Vec<String>>,
}

impl ItemField {
    /// The column this field belongs to.
    #[must_use]
    pub fn column(&self) -> Option<&str> {
        self.column_id.as_deref().or(self.id.as_deref())
    }

    /// Text content, from rich text, plain text or a string value.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        if let Some(rich) = &self.rich_text {
            let text = rich_text_to_plain(rich);
            if !text.is_empty() {
                return Some(text);
            }
        }
        self.text
            .clone()
            .or_else(|| self.value.as_ref()?.as_str().map(str::to_owned))
    }

    /// First selected option code.
    #[must_use]
    pub fn as_select(&self) -> Option<&str> {
        self.select.as_ref()?.first().map(String::as_str)
    }

    /// Selected users.
    #[must_use]
    pub fn as_users(&self) -> &[String] {
        self.user.as_deref().unwrap_or_default()
    }
}

/// A list row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListItem {
    pub id: String,
    #[serde(default)]
    pub fields: Vec<ItemField>,
}

impl ListItem {
    /// The field stored in the given column.
    #[must_use]
    pub fn field(&self, column: &ColumnId) -> Option<&ItemField> {
        self.fields
            .iter()
            .find(|f| f.column() == Some(column.as_str()))
    }
}

/// One read of a list's rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    pub items: Vec<ListItem>,
    /// Column schema, when Slack includes list metadata in the response.
    pub schema: Option<Vec<ColumnSchema>>,
}

/// A freshly provisioned list.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedList {
    pub list_id: ListId,
    pub schema: Vec<ColumnSchema>,
}

/// Access granted to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Read,
    Write,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: &str) -> ColumnId {
        ColumnId::parse(id).expect("column id")
    }

    #[test]
    fn test_cell_wire_shapes() {
        let text = serde_json::to_value(Cell::text(column("Col01"), "Foo")).expect("serialize");
        assert_eq!(text["column_id"], "Col01");
        assert_eq!(
            text["rich_text"][0]["elements"][0]["elements"][0]["text"],
            "Foo"
        );

        let select = serde_json::to_value(Cell::select(column("Col02"), "pending")).expect("serialize");
        assert_eq!(select["select"], json!(["pending"]));

        let users = serde_json::to_value(Cell::users(column("Col03"), vec!["U0000000001".into()]))
            .expect("serialize");
        assert_eq!(users["user"], json!(["U0000000001"]));
    }

    #[test]
    fn test_row_cell_adds_row_id() {
        let row = RowId::parse("Rec01").expect("row id");
        let cell = Cell::select(column("Col02"), "done");
        let json = serde_json::to_value(RowCell { row_id: &row, cell: &cell }).expect("serialize");
        assert_eq!(json["row_id"], "Rec01");
        assert_eq!(json["column_id"], "Col02");
    }

    #[test]
    fn test_rich_text_to_plain() {
        assert_eq!(rich_text_to_plain(&rich_text("PT-1000")), "PT-1000");
        let two_nodes = json!([{
            "type": "rich_text",
            "elements": [{"type": "rich_text_section", "elements": [
                {"type": "text", "text": "Foo "}, {"type": "text", "text": "Bar"}
            ]}]
        }]);
        assert_eq!(rich_text_to_plain(&two_nodes), "Foo Bar");
        assert_eq!(rich_text_to_plain(&json!("not rich text")), "");
    }

    #[test]
    fn test_item_field_decoding() {
        let item: ListItem = serde_json::from_value(json!({
            "id": "Rec01",
            "fields": [
                {"key": "request_id", "column_id": "Col01", "rich_text": rich_text("PT-1000")},
                {"key": "status", "column_id": "Col02", "select": ["in_progress"]},
                {"key": "requested_by", "column_id": "Col03", "user": ["U0000000001"]},
                {"key": "admin_message_ts", "column_id": "Col04", "text": "1700000000.000100"}
            ]
        }))
        .expect("parse");

        let field = |id: &str| item.field(&column(id)).expect("field");
        assert_eq!(field("Col01").as_text().as_deref(), Some("PT-1000"));
        assert_eq!(field("Col02").as_select(), Some("in_progress"));
        assert_eq!(field("Col03").as_users(), ["U0000000001"]);
        assert_eq!(field("Col04").as_text().as_deref(), Some("1700000000.000100"));
        assert!(item.field(&column("Col09")).is_none());
    }

    #[test]
    fn test_schema_column_parses_unknown_type() {
        let column: ColumnSchema = serde_json::from_value(json!({
            "id": "Col05", "key": "due", "name": "Frist", "type": "date"
        }))
        .expect("parse");
        assert_eq!(column.column_type, ColumnType::Other);
    }
}
