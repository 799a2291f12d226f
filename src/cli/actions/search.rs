use crate::api::{decode_error_response, ApiClient, ApiConfig, ApiResponse, JobStatus};
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::report::TracingReporter;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Handle the search status and matches actions
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    let client = ApiClient::new(
        ApiConfig::new(&globals.api_url)?,
        Arc::new(TracingReporter),
    )?;

    let output = match action {
        Action::CompareStatus { guid } => {
            let response = client.check_compare_status(&guid).await;
            if let ApiResponse::Success(compare) = &response {
                note_progress(compare.status);
            }
            render(response, &globals.api_url)?
        }
        Action::SearchStatus { guid } => {
            let response = client.check_search_status(&guid).await;
            if let ApiResponse::Success(search) = &response {
                note_progress(search.status);
            }
            render(response, &globals.api_url)?
        }
        Action::Matches { guid, face } => {
            render(client.get_matched_faces(&guid, face).await, &globals.api_url)?
        }
        Action::Login { .. } => return Err(anyhow!("login is not a search action")),
    };

    println!("{output}");

    Ok(())
}

fn progress_note(status: JobStatus) -> Option<&'static str> {
    if status.is_finished() {
        None
    } else {
        Some("job is not finished yet, ask again later")
    }
}

fn note_progress(status: JobStatus) {
    if let Some(note) = progress_note(status) {
        eprintln!("{note}");
    }
}

/// Pretty JSON for a success payload, the decoded message for a failure.
fn render<T: Serialize>(response: ApiResponse<T>, api_url: &str) -> Result<String> {
    match response.into_result() {
        Ok(payload) => Ok(serde_json::to_string_pretty(&payload)?),
        Err(error) => {
            debug!(code = %error.code, status = error.status, "request failed");
            let message = decode_error_response(&error);
            if error.is_communication_error() {
                Err(anyhow!("{message} ({api_url})"))
            } else {
                Err(anyhow!(message))
            }
        }
    }
}
