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

//! Protocol-level constants and payload helpers shared by both transports.
//!
//! Control commands are JSON objects of the form `{"op": "<name>", ...}`;
//! every control message exchanged with the server carries a protocol version
//! tag. Stream results arrive as MessagePack-serialized JSON documents.
//! Server-side failures are signalled with `{"success": false, "msg": ...}`
//! inside an otherwise well-formed response.

use serde_json::Value;

use crate::error::{Error, Result};

/// Client-server protocol version tag present in every control message.
pub const VERSION_TAG: &str = "VERSION";

/// Protocol version this client speaks.
pub const CURRENT_PROTOCOL_VERSION: i64 = 4;

/// Minimum server protocol version this client accepts.
pub const MIN_COMPATIBLE_PROTOCOL_VERSION: i64 = 4;

/// Command opcodes understood by the server.
pub mod commands {
    /// Open an inference stream.
    pub const STREAM: &str = "stream";
    /// Enumerate models in the model zoo.
    pub const MODEL_ZOO: &str = "modelzoo";
    /// Server-side sleep; used as a ping.
    pub const SLEEP: &str = "sleep";
    /// Ask the server to terminate.
    pub const SHUTDOWN: &str = "shutdown";
    /// Fetch a model label dictionary.
    pub const LABEL_DICT: &str = "label_dictionary";
    /// Fetch host capability information.
    pub const SYSTEM_INFO: &str = "system_info";
    /// Server-side tracing management.
    pub const TRACE_MANAGE: &str = "trace_manage";
    /// Model zoo administration.
    pub const ZOO_MANAGE: &str = "zoo_manage";
    /// Device administration.
    pub const DEV_CTRL: &str = "dev_ctrl";
}

/// Prepares an outbound control record: requires a JSON object, stamps the
/// protocol version tag when absent, and serializes to text.
///
/// # Errors
///
/// Returns [`Error::BadParameter`] when the value is not a JSON object.
pub fn message_prepare(record: &Value) -> Result<String> {
    let Value::Object(map) = record else {
        return Err(Error::BadParameter(
            "control record must be a JSON object".into(),
        ));
    };
    if map.contains_key(VERSION_TAG) {
        return Ok(record.to_string());
    }
    let mut stamped = map.clone();
    stamped.insert(VERSION_TAG.into(), Value::from(CURRENT_PROTOCOL_VERSION));
    Ok(Value::Object(stamped).to_string())
}

/// Verifies the protocol version tag of a control response.
///
/// # Errors
///
/// Returns [`Error::NotSupportedVersion`] when the response is not a JSON
/// object, the tag is missing, or the version is below
/// [`MIN_COMPATIBLE_PROTOCOL_VERSION`].
pub fn version_check(response: &Value, server: &str) -> Result<()> {
    if !response.is_object() {
        return Err(Error::NotSupportedVersion(format!(
            "response from server '{server}' is not a JSON object"
        )));
    }
    match response.get(VERSION_TAG).and_then(Value::as_i64) {
        Some(version) if version >= MIN_COMPATIBLE_PROTOCOL_VERSION => Ok(()),
        Some(version) => Err(Error::NotSupportedVersion(format!(
            "server '{server}' speaks protocol version {version}, \
             but at least {MIN_COMPATIBLE_PROTOCOL_VERSION} is required; \
             please upgrade the AI server instance"
        ))),
        None => Err(Error::NotSupportedVersion(format!(
            "protocol version data is missing in response from server \
             '{server}'; please upgrade the AI server instance"
        ))),
    }
}

/// Inspects a server document for the error-response shape and returns the
/// error message when `success` is `false`. A failure without a `msg` field
/// reads "unspecified error". Documents without a `success` field are
/// considered successful.
pub fn error_check(response: &Value) -> Option<String> {
    match response.get("success").and_then(Value::as_bool) {
        Some(false) => Some(
            response
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unspecified error")
                .to_owned(),
        ),
        _ => None,
    }
}

/// Like [`error_check`], but raises [`Error::OperationFailed`] with the
/// server message, prefixed with the operation initiator when non-empty.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] when the response reports a failure.
pub fn error_check_raise(response: &Value, source: &str) -> Result<()> {
    match error_check(response) {
        Some(msg) if source.is_empty() => Err(Error::OperationFailed(msg)),
        Some(msg) => Err(Error::OperationFailed(format!("{source}: {msg}"))),
        None => Ok(()),
    }
}

/// Serializes a JSON document to its MessagePack representation.
///
/// # Errors
///
/// Returns [`Error::Parse`] on encoder failure.
pub fn to_msgpack(doc: &Value) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(doc)?)
}

/// Deserializes a MessagePack payload into a JSON document.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the payload is not valid MessagePack.
pub fn from_msgpack(payload: &[u8]) -> Result<Value> {
    Ok(rmp_serde::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_prepare_stamps_version() {
        let prepared = message_prepare(&json!({"op": commands::SLEEP})).unwrap();
        let parsed: Value = serde_json::from_str(&prepared).unwrap();
        assert_eq!(parsed[VERSION_TAG], json!(CURRENT_PROTOCOL_VERSION));
        assert_eq!(parsed["op"], json!("sleep"));
    }

    #[test]
    fn message_prepare_keeps_existing_version() {
        let prepared = message_prepare(&json!({"op": "x", VERSION_TAG: 99})).unwrap();
        let parsed: Value = serde_json::from_str(&prepared).unwrap();
        assert_eq!(parsed[VERSION_TAG], json!(99));
    }

    #[test]
    fn message_prepare_rejects_non_objects() {
        assert!(message_prepare(&json!([1, 2, 3])).is_err());
        assert!(message_prepare(&json!("text")).is_err());
    }

    #[test]
    fn version_check_accepts_current() {
        let resp = json!({ VERSION_TAG: CURRENT_PROTOCOL_VERSION, "ok": true });
        assert!(version_check(&resp, "s:1").is_ok());
    }

    #[test]
    fn version_check_rejects_missing_and_old() {
        let missing = json!({ "ok": true });
        assert!(matches!(
            version_check(&missing, "s:1"),
            Err(Error::NotSupportedVersion(_))
        ));

        let old = json!({ VERSION_TAG: MIN_COMPATIBLE_PROTOCOL_VERSION - 1 });
        assert!(matches!(
            version_check(&old, "s:1"),
            Err(Error::NotSupportedVersion(_))
        ));

        assert!(matches!(
            version_check(&json!([1]), "s:1"),
            Err(Error::NotSupportedVersion(_))
        ));
    }

    #[test]
    fn error_check_extracts_message() {
        assert_eq!(
            error_check(&json!({"success": false, "msg": "boom"})),
            Some("boom".to_owned())
        );
        assert_eq!(
            error_check(&json!({"success": false})),
            Some("unspecified error".to_owned())
        );
        assert_eq!(error_check(&json!({"success": true})), None);
        assert_eq!(error_check(&json!({"result": 42})), None);
    }

    #[test]
    fn error_check_raise_prefixes_source() {
        let failed = json!({"success": false, "msg": "boom"});
        let err = error_check_raise(&failed, "modelzoo_list").unwrap_err();
        assert!(format!("{err}").contains("modelzoo_list: boom"));

        let err = error_check_raise(&failed, "").unwrap_err();
        assert!(format!("{err}").contains("boom"));
    }

    #[test]
    fn msgpack_round_trip_preserves_document() {
        let doc = json!({
            "results": [{"label": "cat", "score": 0.97}],
            "frame": 3,
            "nested": {"ok": true, "v": [1, 2, 3]},
        });
        let packed = to_msgpack(&doc).unwrap();
        assert_eq!(from_msgpack(&packed).unwrap(), doc);
    }
}
