// Copyright 2024-2026, NVIDIA CORPORATION & AFFILIATES. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions
// are met:
//  * Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//  * Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//  * Neither the name of NVIDIA CORPORATION nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS ``AS IS'' AND ANY
// EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED.  IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY
// OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Error types for the AI server client library.
//!
//! This module defines [`Error`] -- the unified error type returned by all
//! fallible operations -- along with the [`Result`] type alias used throughout
//! the crate.

/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that may occur when communicating with an AI inference server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed server URL, a missing mandatory configuration key, or an
    /// otherwise invalid argument.
    #[error("bad parameter: {0}")]
    BadParameter(String),

    /// The server reported a failure (`success: false`), an HTTP request
    /// returned a non-2xx status, or a transport-level I/O error occurred.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// A connect, send, receive, or queue wait exceeded its timeout budget.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The server response is missing the protocol version tag or carries a
    /// version older than the minimum this client supports.
    #[error("unsupported server protocol version: {0}")]
    NotSupportedVersion(String),

    /// The client API was used out of order (e.g. `submit` before
    /// `open_stream`, or `predict` while a streaming callback is installed).
    #[error("incorrect API use: {0}")]
    IncorrectApiUse(String),

    /// A DNS or connect-level operating system error that persisted after
    /// retries.
    #[error("system error: {0}")]
    System(String),

    /// A payload could not be decoded as JSON or MessagePack.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::OperationFailed(err.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::OperationFailed(format!("WebSocket error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_message() {
        let err = Error::BadParameter("empty server address".into());
        assert!(format!("{err}").contains("empty server address"));

        let err = Error::Timeout("180000 ms waiting for response".into());
        assert!(format!("{err}").contains("180000 ms"));
    }

    #[test]
    fn json_error_maps_to_parse() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn msgpack_error_maps_to_parse() {
        let bad = rmp_serde::from_slice::<serde_json::Value>(&[0xc1]);
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
