//! Column alias to column id mapping.

use std::collections::HashMap;

use sape_core::ColumnId;

use crate::lists::{ColumnAlias, ColumnSchema, ListItem};

/// Maps each [`ColumnAlias`] to at most one column id.
///
/// Maps are only ever built whole, from a schema or from an item's fields,
/// and swapped in place of the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    ids: HashMap<ColumnAlias, ColumnId>,
}

impl ColumnMap {
    /// Build a map from a list schema. `None` if no column was recognized.
    #[must_use]
    pub fn from_schema(schema: &[ColumnSchema]) -> Option<Self> {
        Self::build(schema.iter().map(|c| {
            (
                c.key.as_str(),
                c.name.as_str(),
                c.id.as_deref(),
            )
        }))
    }

    /// Build a map from the fields of an existing row.
    #[must_use]
    pub fn from_item(item: &ListItem) -> Option<Self> {
        Self::build(item.fields.iter().map(|f| {
            (
                f.key.as_deref().unwrap_or_default(),
                f.name.as_deref().unwrap_or_default(),
                f.column(),
            )
        }))
    }

    fn build<'a>(columns: impl Iterator<Item = (&'a str, &'a str, Option<&'a str>)>) -> Option<Self> {
        let mut ids = HashMap::new();
        for (key, name, id) in columns {
            let alias = ColumnAlias::resolve(Some(key), Some(name));
            let id = id.and_then(|id| ColumnId::parse(id).ok());
            if let (Some(alias), Some(id)) = (alias, id) {
                ids.insert(alias, id);
            }
        }
        (!ids.is_empty()).then_some(Self { ids })
    }

    #[must_use]
    pub fn get(&self, alias: ColumnAlias) -> Option<&ColumnId> {
        self.ids.get(&alias)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Aliases with no column, for logging.
    #[must_use]
    pub fn missing(&self) -> Vec<ColumnAlias> {
        ColumnAlias::ALL
            .into_iter()
            .filter(|alias| !self.ids.contains_key(alias))
            .collect()
    }
}
