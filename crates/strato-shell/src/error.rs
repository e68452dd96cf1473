// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the shell drivers.

use strato_inspect::{InspectError, WaitError};
use strato_rest_client::RestClientError;
use thiserror::Error;

/// Errors surfaced by the install/uninstall drivers.
#[derive(Debug, Error)]
pub enum ShellError {
    /// A gateway call failed outside a polling wait.
    #[error(transparent)]
    Rest(#[from] RestClientError),

    /// Lifecycle inspection failed.
    #[error(transparent)]
    Inspect(#[from] InspectError),

    /// The wait budget elapsed and was not extended.
    #[error("{0}")]
    Timeout(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The application to operate on could not be found.
    #[error("application {0} could not be found")]
    ApplicationNotFound(String),

    /// The service to operate on could not be found.
    #[error("service {service_name} of application {application_name} could not be found")]
    ServiceNotFound {
        application_name: String,
        service_name: String,
    },

    /// Reading console input failed.
    #[error("failed to read console input: {0}")]
    Io(#[from] std::io::Error),
}

impl From<WaitError<InspectError>> for ShellError {
    fn from(err: WaitError<InspectError>) -> Self {
        match err {
            WaitError::Timeout(message) => ShellError::Timeout(message),
            WaitError::Cancelled => ShellError::Cancelled,
            WaitError::Failed(inspect) => ShellError::Inspect(inspect),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_outcomes_map_onto_shell_errors() {
        let timeout: ShellError =
            WaitError::<InspectError>::Timeout("took too long".to_string()).into();
        assert!(matches!(timeout, ShellError::Timeout(message) if message == "took too long"));

        let cancelled: ShellError = WaitError::<InspectError>::Cancelled.into();
        assert!(matches!(cancelled, ShellError::Cancelled));

        let failed: ShellError = WaitError::Failed(InspectError::Remote {
            message: "boom".to_string(),
        })
        .into();
        assert!(matches!(failed, ShellError::Inspect(_)));
    }

    #[test]
    fn test_not_found_display() {
        let err = ShellError::ServiceNotFound {
            application_name: "petclinic".to_string(),
            service_name: "tomcat".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("tomcat"));
        assert!(display.contains("petclinic"));
    }
}
