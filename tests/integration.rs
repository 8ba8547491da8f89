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

//! Integration tests for the AI server client library.
//!
//! Tests that require a running AI server are gated behind the
//! `AISERVER_TEST_URL` environment variable. When the variable is not set,
//! only offline tests (address parsing, builder patterns, error types, etc.)
//! are executed.

use std::time::Duration;

use serde_json::json;

use aiserver_client::address::{ServerAddress, Transport, DEFAULT_PORT};
use aiserver_client::client::{Client, ClientOptions};
use aiserver_client::error::Error;
use aiserver_client::infer::{FrameBatch, DEFAULT_FRAME_QUEUE_DEPTH};
use aiserver_client::params::ModelParams;
use aiserver_client::protocol;

/// Helper to get the AI server URL from the environment.
fn server_url() -> Option<String> {
    std::env::var("AISERVER_TEST_URL").ok()
}

// ---------------------------------------------------------------------------
// Offline tests (no server required)
// ---------------------------------------------------------------------------

#[test]
fn client_options_builder() {
    // Ensure default construction and the full builder chain do not panic.
    let _options = ClientOptions::default()
        .connection_timeout(Duration::from_secs(10))
        .inference_timeout(Duration::from_secs(30))
        .token("opaque");
}

#[test]
fn address_parsing_matrix() {
    let addr = ServerAddress::parse("http://h").unwrap();
    assert_eq!(
        (addr.host.as_str(), addr.port, addr.transport),
        ("h", DEFAULT_PORT, Transport::Http)
    );

    let addr = ServerAddress::parse("h:9000").unwrap();
    assert_eq!(
        (addr.host.as_str(), addr.port, addr.transport),
        ("h", 9000, Transport::Tcp)
    );

    let addr = ServerAddress::parse("asio://h:1").unwrap();
    assert_eq!(
        (addr.host.as_str(), addr.port, addr.transport),
        ("h", 1, Transport::Tcp)
    );
}

#[test]
fn address_round_trip_normalization() {
    for url in ["http://h:8778", "h:9000", "127.0.0.1:8778"] {
        let addr = ServerAddress::parse(url).unwrap();
        assert_eq!(addr.to_string(), url);
        assert_eq!(ServerAddress::parse(&addr.to_string()).unwrap(), addr);
    }
}

#[test]
fn error_display_messages() {
    let err = Error::BadParameter("no host".into());
    assert!(format!("{err}").contains("no host"));

    let err = Error::OperationFailed("boom".into());
    assert!(format!("{err}").contains("boom"));

    let err = Error::Timeout("1000 ms".into());
    assert!(format!("{err}").contains("1000 ms"));

    let err = Error::NotSupportedVersion("upgrade".into());
    assert!(format!("{err}").contains("upgrade"));

    let err = Error::IncorrectApiUse("stream is not open".into());
    assert!(format!("{err}").contains("stream is not open"));
}

#[test]
fn frame_batch_shapes() {
    let batch = FrameBatch::buffer(vec![0u8; 128]);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.byte_len(), 128);

    let mut batch = FrameBatch::new();
    batch.push(vec![0u8; 64]).push(vec![0u8; 32]);
    assert_eq!(batch.len(), 2);
    assert_eq!(batch.byte_len(), 96);
    assert_eq!(DEFAULT_FRAME_QUEUE_DEPTH, 8);
}

#[test]
fn model_params_surface() {
    let mut params = ModelParams::from_json(json!({
        "DEVICE": [{"DeviceType": "NPU"}],
        "POST_PROCESS": [{"OutputConfThreshold": 0.3}],
    }))
    .unwrap();

    assert_eq!(params.device_type(), "NPU");
    assert_eq!(params.output_conf_threshold(), 0.3);

    let mut patch = ModelParams::new();
    patch.set_output_conf_threshold(0.7).set_device_type("GPU".into());
    params.merge(&patch);

    assert_eq!(params.output_conf_threshold(), 0.7);
    assert_eq!(params.device_type(), "NPU");
}

#[test]
fn protocol_constants() {
    assert_eq!(protocol::VERSION_TAG, "VERSION");
    assert!(protocol::CURRENT_PROTOCOL_VERSION >= protocol::MIN_COMPATIBLE_PROTOCOL_VERSION);
    assert_eq!(protocol::commands::STREAM, "stream");
    assert_eq!(protocol::commands::MODEL_ZOO, "modelzoo");
}

#[tokio::test]
async fn connect_to_unroutable_address_fails() {
    // TEST-NET (RFC 5737) address is guaranteed non-routable; use a short
    // timeout to avoid long waits.
    let options = ClientOptions::default().connection_timeout(Duration::from_millis(200));
    let result = Client::connect_with_options("192.0.2.1:1", options).await;
    assert!(matches!(result, Err(Error::System(_))));
}

// ---------------------------------------------------------------------------
// Online tests (require AISERVER_TEST_URL)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn online_ping() {
    let Some(url) = server_url() else {
        eprintln!("Skipping online test: AISERVER_TEST_URL not set");
        return;
    };
    let client = Client::connect(&url).await.unwrap();
    assert!(client.ping(0.0, false).await.unwrap(), "Expected server to answer");
}

#[tokio::test]
async fn online_modelzoo_list() {
    let Some(url) = server_url() else {
        eprintln!("Skipping online test: AISERVER_TEST_URL not set");
        return;
    };
    let client = Client::connect(&url).await.unwrap();
    let models = client.modelzoo_list().await.unwrap();
    // Just verify the call succeeds; the zoo may be empty.
    eprintln!("Model zoo contains {} models", models.len());
}

#[tokio::test]
async fn online_system_info() {
    let Some(url) = server_url() else {
        eprintln!("Skipping online test: AISERVER_TEST_URL not set");
        return;
    };
    let client = Client::connect(&url).await.unwrap();
    let info = client.system_info().await.unwrap();
    assert!(info.is_object(), "System info should be a dictionary");
}

#[tokio::test]
async fn online_single_shot_predict() {
    let Some(url) = server_url() else {
        eprintln!("Skipping online test: AISERVER_TEST_URL not set");
        return;
    };
    let client = Client::connect(&url).await.unwrap();

    let models = client.modelzoo_list().await.unwrap();
    let Some(model) = models.first() else {
        eprintln!("Skipping: model zoo is empty");
        return;
    };

    client.open_stream(&model.name, 4, None).await.unwrap();
    let result = client
        .predict(&FrameBatch::buffer(vec![0u8; 16 * 1024]))
        .await
        .unwrap();
    eprintln!("Prediction result: {result}");
    assert_eq!(client.outstanding_count(), 0);
    assert_eq!(client.last_error(), None);
    client.close_stream().await;
}
