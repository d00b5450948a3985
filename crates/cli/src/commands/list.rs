//! Request list management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create the request list and share it with the admin channel
//! sape-cli list create
//!
//! # Print the column schema the list is created with
//! sape-cli list schema
//! ```
//!
//! # Environment Variables
//!
//! - `SLACK_BOT_TOKEN` - Bot token with `lists:write`
//! - `ADMIN_CHANNEL_ID` - Channel the list is shared with

use sape_intake::lists::list_schema;

use super::{CommandError, open_store};

/// Create the request list.
///
/// # Returns
///
/// The id of the created list, to be put in `REQUEST_LIST_ID`.
pub async fn create() -> Result<String, CommandError> {
    let (config, store) = open_store()?;
    if let Some(existing) = &config.request_list_id {
        tracing::warn!(list_id = %existing, "REQUEST_LIST_ID is already set; creating another list");
    }

    let list_id = store.create_list().await?;

    tracing::info!(list_id = %list_id, "Request list created");
    #[allow(clippy::print_stdout)]
    {
        println!("REQUEST_LIST_ID={list_id}");
    }
    Ok(list_id.into_inner())
}

/// Print the column schema as JSON.
pub fn schema() -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(&list_schema())?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(())
}
