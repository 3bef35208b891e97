//! Routing between dialogue nodes.

use super::state::ConversationState;

/// Node to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    CollectName,
    CollectEmail,
    ManageRegistration,
    Finalize,
}

/// Merged flow: finalize once the data is confirmed, otherwise keep managing.
pub fn route_registration(state: &ConversationState) -> Route {
    if state.info_confirmed {
        Route::Finalize
    } else {
        Route::ManageRegistration
    }
}

/// Sequential flow: re-collect while the stored name is empty or whitespace.
pub fn route_after_name(state: &ConversationState) -> Route {
    match state.known_name() {
        Some(_) => Route::CollectEmail,
        None => Route::CollectName,
    }
}

/// Sequential flow: re-collect while the stored email is empty or whitespace.
pub fn route_after_email(state: &ConversationState) -> Route {
    match state.known_email() {
        Some(_) => Route::Finalize,
        None => Route::CollectEmail,
    }
}
