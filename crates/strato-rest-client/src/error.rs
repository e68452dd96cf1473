// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for strato-rest-client.

use thiserror::Error;

/// Result type using RestClientError.
pub type Result<T> = std::result::Result<T, RestClientError>;

/// Errors that can occur when talking to the admin gateway.
#[derive(Debug, Error)]
pub enum RestClientError {
    /// Configuration error (missing or invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure (connect, DNS, TLS, timeout).
    #[error("connection error: {0}")]
    Connection(String),

    /// The gateway answered with a non-success status.
    ///
    /// `verbose` carries the gateway's extended diagnostic text when the
    /// response body provided one, and is empty otherwise.
    #[error("gateway error [{status}]: {message}")]
    Response {
        status: u16,
        message: String,
        verbose: String,
    },

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The gateway answered with something the client cannot interpret.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl RestClientError {
    /// True when the gateway reported 404 for the queried resource.
    ///
    /// Lifecycle polling treats 404 as a signal ("not deployed yet" during
    /// install, "resources released" during uninstall) rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RestClientError::Response { status: 404, .. })
    }

    /// The most detailed diagnostic text available for this error.
    pub fn verbose_message(&self) -> String {
        match self {
            RestClientError::Response {
                message, verbose, ..
            } if !verbose.is_empty() => format!("{}: {}", message, verbose),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for RestClientError {
    fn from(err: reqwest::Error) -> Self {
        RestClientError::Connection(err.to_string())
    }
}

impl From<serde_json::Error> for RestClientError {
    fn from(err: serde_json::Error) -> Self {
        RestClientError::Serialization(err.to_string())
    }
}
