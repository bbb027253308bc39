// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Error type shared by the runtime lifecycle and its HTTP handlers.

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors produced by the EDR runtime.
///
/// HTTP handlers turn these into plain-text responses through [`IntoResponse`];
/// lifecycle methods return them directly to the owner of the runtime.
#[derive(Debug, Error)]
pub enum EdrError {
    /// The route does not accept the request's HTTP method
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// The request body could not be decoded
    #[error("{0}")]
    InvalidRequest(String),

    /// Tracing was requested but `tracer_enabled` is off
    #[error("tracing not enabled")]
    TracingDisabled,

    /// A hardhat operation was requested but `hardhat_mode` is off
    #[error("hardhat mode not enabled")]
    HardhatModeDisabled,

    /// The operation has no semantics yet
    #[error("not implemented")]
    NotImplemented,

    /// The chain collaborator failed; the message is passed through as is
    #[error("{0}")]
    Chain(eyre::Report),

    /// The listener could not be bound
    #[error("failed to bind EDR listener on {addr}: {source}")]
    Bind {
        /// Address the runtime tried to bind
        addr: SocketAddr,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// `start` was called on a runtime that is already serving
    #[error("EDR already started")]
    AlreadyStarted,

    /// `start` or `stop` was called after the runtime was stopped
    #[error("EDR already stopped")]
    AlreadyStopped,

    /// In-flight requests did not drain before the deadline
    #[error("EDR shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    /// The serving task ended abnormally
    #[error("EDR server error: {0}")]
    Server(String),
}

impl EdrError {
    /// HTTP status used when the error reaches a client
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            Self::TracingDisabled
            | Self::HardhatModeDisabled
            | Self::Chain(_)
            | Self::Bind { .. }
            | Self::AlreadyStarted
            | Self::AlreadyStopped
            | Self::ShutdownTimeout(_)
            | Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EdrError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
