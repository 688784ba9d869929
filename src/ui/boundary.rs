//! Top-level error boundary for the chat page.
//!
//! Failures that escape the page (a panic while rendering, or the chat
//! service disappearing) end up here, get classified, and are shown with a
//! single user-initiated recovery action.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use uuid::Uuid;

use crate::error::{ChatError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Re-mount the page.
    Retry,
    SignIn,
    Home,
}

impl RecoveryAction {
    pub fn label(self) -> &'static str {
        match self {
            RecoveryAction::Retry => "Try Again",
            RecoveryAction::SignIn => "Sign In",
            RecoveryAction::Home => "Go Home",
        }
    }
}

/// What the user clicked on the error screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryChoice {
    Recover(RecoveryAction),
    ContactSupport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorDetails {
    pub title: &'static str,
    pub description: &'static str,
    pub action: RecoveryAction,
}

impl ErrorDetails {
    pub fn for_code(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Connection => Self {
                title: "Connection Error",
                description: "Unable to connect to the chat service. Please check your internet connection.",
                action: RecoveryAction::Retry,
            },
            ErrorCode::Unauthorized => Self {
                title: "Session Expired",
                description: "Please sign in again to continue chatting.",
                action: RecoveryAction::SignIn,
            },
            ErrorCode::RateLimited => Self {
                title: "Too Many Requests",
                description: "Please wait a moment before sending more messages.",
                action: RecoveryAction::Retry,
            },
            ErrorCode::Server => Self {
                title: "Server Error",
                description: "We're experiencing technical difficulties. Please try again later.",
                action: RecoveryAction::Home,
            },
            ErrorCode::Unknown => Self {
                title: "Something Went Wrong",
                description: "An unexpected error occurred in the chat.",
                action: RecoveryAction::Retry,
            },
        }
    }

    pub fn for_error(error: &ChatError) -> Self {
        Self::for_code(error.code())
    }

    pub fn for_message(message: &str) -> Self {
        Self::for_code(ErrorCode::from_message(message))
    }
}

/// An error the boundary intercepted, ready to display.
#[derive(Debug, Clone)]
pub struct CaughtError {
    message: String,
    code: ErrorCode,
    reference: String,
}

impl CaughtError {
    pub fn new(error: &ChatError) -> Self {
        Self::record(error.to_string(), error.code())
    }

    /// Panics carry no code; classify them by their text.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = panic_message(payload);
        let code = ErrorCode::from_message(&message);
        Self::record(message, code)
    }

    fn record(message: String, code: ErrorCode) -> Self {
        let reference = Uuid::new_v4().simple().to_string()[..8].to_string();
        log::error!("ChatError [{reference}]: {message}");
        Self {
            message,
            code,
            reference,
        }
    }

    pub fn details(&self) -> ErrorDetails {
        ErrorDetails::for_code(self.code)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// Run `render`, turning a panic into a [`CaughtError`].
pub fn guard<R>(render: impl FnOnce() -> R) -> Result<R, CaughtError> {
    panic::catch_unwind(AssertUnwindSafe(render))
        .map_err(|payload| CaughtError::from_panic(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
