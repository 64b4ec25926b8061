//! Error detail resolution for the "error details" notification action.
//!
//! Runtime errors caused by a failing startup script only say so; the useful
//! output lives in an artifact in the runtime's staging bucket. Resolution
//! fetches that artifact instead of showing the terse backend message.

use std::sync::Arc;

use tracing::{debug, error};
use vigil_core::error::Result;
use vigil_core::source::DetailSource;
use vigil_core::types::{ResourceKind, ResourceRecord};

use crate::policy::display_app_type;

pub const USERSCRIPT_MARKER: &str = "Userscript failed";
pub const USERSCRIPT_ARTIFACT: &str = "userscript_output.txt";
pub const USERSCRIPT_TITLE_SUFFIX: &str = " due to Userscript Error";
pub const UNKNOWN_ERROR: &str = "An unknown error has occurred with the runtime";
pub const DETAILS_UNAVAILABLE: &str = "Could Not Retrieve Cloud Environment Error Info";

/// What the detail view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
    /// The message is startup script output rather than a backend error
    pub userscript: bool,
}

fn base_title(record: &ResourceRecord) -> String {
    match record.kind {
        ResourceKind::App => format!("{} App is in error state", display_app_type(&record.role)),
        _ => "Cloud Environment is in error state".to_string(),
    }
}

/// Fetch and assemble the error report for `record`.
pub async fn resolve_error_details(
    source: &dyn DetailSource,
    record: &ResourceRecord,
) -> Result<ErrorReport> {
    let details = source.fetch_details(record).await?;
    let title = base_title(record);

    if details
        .error_messages
        .iter()
        .any(|message| message.contains(USERSCRIPT_MARKER))
    {
        debug!(resource_id = %record.id, "Fetching startup script output");
        let output = source.fetch_error_artifact(record, USERSCRIPT_ARTIFACT).await?;
        return Ok(ErrorReport {
            title: format!("{title}{USERSCRIPT_TITLE_SUFFIX}"),
            message: output,
            userscript: true,
        });
    }

    let message = details
        .error_messages
        .into_iter()
        .next()
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
    Ok(ErrorReport {
        title,
        message,
        userscript: false,
    })
}

/// Shared resolver used by the renderer. Failures are reported, never raised.
#[derive(Clone)]
pub struct ErrorDetailResolver {
    source: Arc<dyn DetailSource>,
}

impl ErrorDetailResolver {
    pub fn new(source: Arc<dyn DetailSource>) -> Self {
        Self { source }
    }

    pub async fn resolve(&self, record: &ResourceRecord) -> Option<ErrorReport> {
        match resolve_error_details(self.source.as_ref(), record).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(resource_id = %record.id, error = %e, "{}", DETAILS_UNAVAILABLE);
                None
            }
        }
    }
}

impl std::fmt::Debug for ErrorDetailResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorDetailResolver").finish_non_exhaustive()
    }
}
