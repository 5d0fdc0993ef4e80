use anyhow::Error;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::error::{ErrorKind, StoreError};

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Message and classification for a failed action. Store validation, lookup
/// and integrity errors already read as user-facing sentences; storage
/// failures show their innermost cause.
pub(crate) fn surface_error(err: &Error) -> (String, Option<ErrorKind>) {
    match err.downcast_ref::<StoreError>() {
        Some(store) if store.kind() != ErrorKind::Storage => {
            (store.to_string(), Some(store.kind()))
        }
        Some(store) => {
            tracing::error!(error = ?err, "store failure");
            (
                format!("Database error: {}", innermost(err)),
                Some(store.kind()),
            )
        }
        None => (innermost(err), None),
    }
}

fn innermost(err: &Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn store_messages_pass_through() {
        let err: Error = StoreError::validation("Please choose a key to bind to this action.").into();
        let (message, kind) = surface_error(&err);
        assert_eq!(message, "Please choose a key to bind to this action.");
        assert_eq!(kind, Some(ErrorKind::Validation));
    }

    #[test]
    fn other_errors_show_root_cause() {
        let err = anyhow!("no such file").context("Could not read image file cover.png");
        let (message, kind) = surface_error(&err);
        assert_eq!(message, "no such file");
        assert_eq!(kind, None);
    }
}
