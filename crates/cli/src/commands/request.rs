//! Request inspection commands.
//!
//! # Usage
//!
//! ```bash
//! # Show one request as JSON
//! sape-cli request get PT-1700000000000
//!
//! # List requests with a given list status
//! sape-cli request list --status in_progress
//! ```

use sape_core::{ListStatus, Request, RequestId};

use super::{CommandError, open_configured_store};

/// Print one request as JSON.
///
/// # Returns
///
/// Whether the request was found.
pub async fn get(id: &str) -> Result<bool, CommandError> {
    let request_id =
        RequestId::parse(id).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let store = open_configured_store().await?;

    let Some(request) = store.get_request(&request_id).await? else {
        tracing::warn!(request_id = %request_id, "Request not found");
        return Ok(false);
    };

    let rendered = serde_json::to_string_pretty(&request)?;
    #[allow(clippy::print_stdout)]
    {
        println!("{rendered}");
    }
    Ok(true)
}

/// Print a one-line summary of every request with `status`.
pub async fn list(status: ListStatus) -> Result<usize, CommandError> {
    let store = open_configured_store().await?;
    let requests = store.requests_by_status(status).await?;

    #[allow(clippy::print_stdout)]
    for request in &requests {
        println!("{}", summary_line(request));
    }
    tracing::info!(count = requests.len(), status = %status, "Requests listed");
    Ok(requests.len())
}

fn summary_line(request: &Request) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        request.request_id, request.status, request.requested_by, request.project_name
    )
}
