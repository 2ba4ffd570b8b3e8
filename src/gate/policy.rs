//! Page-level access decisions. Pure, no I/O.

use crate::domain::models::{AccessState, ReadingProgress, Viewer};

/// Whether `viewer` may see `requested_page`.
///
/// Pages up to `free_page_limit` are open to everyone. Past it, only an
/// identified viewer whose progress is paid gets through. Page bounds against
/// the document are checked by the caller.
pub fn can_view(
    viewer: &Viewer,
    progress: Option<&ReadingProgress>,
    requested_page: u32,
    free_page_limit: u32,
) -> bool {
    if requested_page <= free_page_limit {
        return true;
    }
    match viewer {
        // progress is ignored even if one is somehow passed in
        Viewer::Anonymous => false,
        Viewer::Identified(_) => progress.is_some_and(|p| p.has_paid),
    }
}

/// The gate state for a requested page, as seen by the paywall prompt.
pub fn access_state(
    viewer: &Viewer,
    progress: Option<&ReadingProgress>,
    requested_page: u32,
    free_page_limit: u32,
) -> AccessState {
    let paid = viewer.is_identified() && progress.is_some_and(|p| p.has_paid);
    if paid {
        AccessState::Unlocked
    } else if requested_page <= free_page_limit {
        AccessState::Browsing
    } else {
        AccessState::Gated
    }
}
