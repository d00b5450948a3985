//! Slack Lists access.
//!
//! - [`ListGateway`] - create, read and update rows of the backing list
//! - [`schema`] - the fixed column set the list is provisioned with
//! - [`types`] - cell and schema wire types

mod gateway;
pub mod schema;
pub mod types;

pub use gateway::{ListGateway, SlackListGateway};
pub use schema::{ADMIN_MESSAGE_PLACEHOLDER, ColumnAlias, LIST_NAME, list_schema};
pub use types::{
    AccessLevel, Cell, CellValue, ColumnSchema, ColumnType, CreatedList, ItemField, ListItem,
    ListPage, SelectChoice,
};
