pub mod rank;
pub mod select;

use crate::data::SkippedRow;
use crate::utils::progress::CliProgressHandler;
use siteopt::engine::state::SelectionResult;
use tracing::warn;

pub(crate) fn progress_handler(quiet: bool) -> CliProgressHandler {
    if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    }
}

/// Logs every skipped input row and engine warning, and echoes them to the
/// console unless `quiet`.
pub(crate) fn report_warnings(skipped: &[SkippedRow], result: &SelectionResult, quiet: bool) {
    for row in skipped {
        warn!(row = row.row, reason = %row.reason, "Input row was skipped.");
    }
    for warning in &result.warnings {
        warn!(%warning, "Run finished with a warning.");
    }
    if !quiet {
        for line in warning_lines(skipped, result) {
            println!("{line}");
        }
    }
}

fn warning_lines(skipped: &[SkippedRow], result: &SelectionResult) -> Vec<String> {
    skipped
        .iter()
        .map(ToString::to_string)
        .chain(result.warnings.iter().map(ToString::to_string))
        .map(|text| format!("  ! {text}"))
        .collect()
}
