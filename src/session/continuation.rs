//! Continuation requests sent to the backend after a truncated round

use std::fmt::Write as _;

use serde::Serialize;

use crate::types::record::PendingPartial;

/// What the backend needs to know to resume a truncated generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinuationRequest {
    /// Files already materialized, never to be repeated
    pub completed_files: Vec<String>,
    /// Files the manifest still expects
    pub outstanding_files: Vec<String>,
    /// Record the previous round stopped inside
    pub pending_partial: Option<PendingPartial>,
}

impl ContinuationRequest {
    /// Render the natural-language instruction for chat-style backends
    #[must_use]
    pub fn to_message(&self) -> String {
        let mut message = String::from(
            "The previous response was cut off before the generation finished. \
             Continue it following these rules:\n",
        );
        message.push_str("- Do not repeat any file or content that was already generated.\n");
        message.push_str(
            "- Resume exactly where the output stopped, keeping the same format and structure.\n",
        );
        message.push_str("- After finishing the interrupted file, continue with the remaining files.\n");

        if !self.completed_files.is_empty() {
            let _ = writeln!(
                message,
                "\nFiles already generated: {}",
                self.completed_files.join(", ")
            );
        }
        if !self.outstanding_files.is_empty() {
            let _ = writeln!(
                message,
                "\nFiles still missing: {}",
                self.outstanding_files.join(", ")
            );
        }

        if let Some(partial) = &self.pending_partial {
            match &partial.file_name {
                Some(name) => {
                    let _ = writeln!(message, "\nThe interrupted file was: {name}");
                }
                None => message.push_str("\nThe output stopped before the next file name was complete.\n"),
            }
            // The whole partial, so the backend can resume at the exact cut
            let _ = writeln!(
                message,
                "The interrupted file so far was:\n{}",
                partial.decoded_content()
            );
        }

        message
    }
}
