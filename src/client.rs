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

//! The main AI server client implementation.
//!
//! [`Client`] is the polymorphic protocol handle: the factory picks the wire
//! protocol from the server URL scheme and every operation behaves
//! identically above the transport. Control operations (model zoo listing,
//! system information, management, ping, shutdown) are request/response
//! exchanges; inference runs over a dedicated stream channel with a bounded
//! outstanding-frame window and in-order result dispatch.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aiserver_client::client::Client;
//! use aiserver_client::infer::FrameBatch;
//!
//! # async fn example() -> aiserver_client::error::Result<()> {
//! let client = Client::connect("localhost:8778").await?;
//!
//! // Enumerate models and open a stream for one of them.
//! let models = client.modelzoo_list().await?;
//! client.open_stream(&models[0].name, 4, None).await?;
//!
//! // Stream frames; results arrive on the callback in submission order.
//! client.install_callback(Some(Arc::new(|result, tag| {
//!     println!("frame {tag}: {result}");
//! })))?;
//! for i in 0..10 {
//!     let batch = FrameBatch::buffer(vec![0u8; 1024]);
//!     client.submit(&batch, &i.to_string()).await?;
//! }
//! client.finish().await;
//! client.close_stream().await;
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::address::{ServerAddress, Transport};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::infer::{
    FrameBatch, ModelInfo, ResultCallback, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_INFERENCE_TIMEOUT,
};
use crate::params::ModelParams;
use crate::pipeline::Pipeline;
use crate::tcp::TcpClient;

/// Options for configuring a client connection.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use aiserver_client::client::ClientOptions;
///
/// let options = ClientOptions::default()
///     .connection_timeout(Duration::from_secs(5))
///     .inference_timeout(Duration::from_secs(60))
///     .token("opaque-credential");
/// ```
#[derive(Debug, Clone)]
pub struct ClientOptions {
    connection_timeout: Duration,
    inference_timeout: Duration,
    token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            inference_timeout: DEFAULT_INFERENCE_TIMEOUT,
            token: None,
        }
    }
}

impl ClientOptions {
    /// Sets the timeout applied to connection establishment and control
    /// requests.
    #[must_use]
    pub fn connection_timeout(self, timeout: Duration) -> Self {
        Self {
            connection_timeout: timeout,
            ..self
        }
    }

    /// Sets the timeout applied to inference responses and queue-full waits.
    #[must_use]
    pub fn inference_timeout(self, timeout: Duration) -> Self {
        Self {
            inference_timeout: timeout,
            ..self
        }
    }

    /// Sets an opaque credential passed through to the server: a bearer
    /// header on HTTP control requests and a `token` field in the
    /// stream-open record.
    #[must_use]
    pub fn token(self, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..self
        }
    }
}

/// Transport variant behind the façade.
enum Variant {
    Tcp(TcpClient),
    Http(HttpClient),
}

/// A client for communicating with an AI inference server.
///
/// Each client owns at most one inference stream at a time; opening a second
/// stream implicitly closes the first. Per stream, one producer (the caller
/// of [`submit`](Self::submit)) and one consumer (the internal reader task)
/// operate concurrently; results are dispatched to the installed callback
/// strictly in submission order.
pub struct Client {
    address: ServerAddress,
    inner: Variant,
}

impl Client {
    /// Connects to an AI server at the given URL with default options.
    ///
    /// # Arguments
    ///
    /// * `server_url` -- `[scheme://]host[:port]`; `http://` selects the
    ///   HTTP/WebSocket protocol, `asio://` or no scheme the TCP protocol.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] for a malformed URL and
    /// [`Error::System`] when the TCP command connection cannot be
    /// established after retries.
    pub async fn connect(server_url: &str) -> Result<Self> {
        Self::connect_with_options(server_url, ClientOptions::default()).await
    }

    /// Connects to an AI server with custom options.
    ///
    /// The TCP variant opens its command connection here; the HTTP variant
    /// connects lazily on the first request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] for a malformed URL and
    /// [`Error::System`] when the TCP command connection cannot be
    /// established after retries.
    pub async fn connect_with_options(server_url: &str, options: ClientOptions) -> Result<Self> {
        let address = ServerAddress::parse(server_url)?;
        let inner = match address.transport {
            Transport::Tcp => Variant::Tcp(
                TcpClient::connect(
                    address.clone(),
                    options.connection_timeout,
                    options.inference_timeout,
                    options.token.clone(),
                )
                .await?,
            ),
            Transport::Http => Variant::Http(HttpClient::new(
                address.clone(),
                options.connection_timeout,
                options.inference_timeout,
                options.token.clone(),
            )?),
        };
        Ok(Self { address, inner })
    }

    /// The parsed server address this client talks to.
    #[must_use]
    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn pipeline(&self) -> &Pipeline {
        match &self.inner {
            Variant::Tcp(client) => client.pipeline(),
            Variant::Http(client) => client.pipeline(),
        }
    }

    // -----------------------------------------------------------------------
    // Control operations
    // -----------------------------------------------------------------------

    /// Lists the models available in the server's model zoo.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn modelzoo_list(&self) -> Result<Vec<ModelInfo>> {
        match &self.inner {
            Variant::Tcp(client) => client.modelzoo_list().await,
            Variant::Http(client) => client.modelzoo_list().await,
        }
    }

    /// Retrieves the host capability dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn system_info(&self) -> Result<Value> {
        match &self.inner {
            Variant::Tcp(client) => client.system_info().await,
            Variant::Http(client) => client.system_info().await,
        }
    }

    /// Retrieves the label dictionary of the given model.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn label_dictionary(&self, model_name: &str) -> Result<Value> {
        match &self.inner {
            Variant::Tcp(client) => client.label_dictionary(model_name).await,
            Variant::Http(client) => client.label_dictionary(model_name).await,
        }
    }

    /// Server tracing facility management. The result is request-specific.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn trace_manage(&self, req: &Value) -> Result<Value> {
        match &self.inner {
            Variant::Tcp(client) => client.trace_manage(req).await,
            Variant::Http(client) => client.trace_manage(req).await,
        }
    }

    /// Model zoo administration. The result is request-specific.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn zoo_manage(&self, req: &Value) -> Result<Value> {
        match &self.inner {
            Variant::Tcp(client) => client.zoo_manage(req).await,
            Variant::Http(client) => client.zoo_manage(req).await,
        }
    }

    /// Device administration. The result is request-specific.
    ///
    /// # Errors
    ///
    /// Returns an error if the command exchange fails.
    pub async fn dev_ctrl(&self, req: &Value) -> Result<Value> {
        match &self.inner {
            Variant::Tcp(client) => client.dev_ctrl(req).await,
            Variant::Http(client) => client.dev_ctrl(req).await,
        }
    }

    /// Pings the server with an instantaneous command.
    ///
    /// # Arguments
    ///
    /// * `sleep_ms` -- optional server-side sleep time in milliseconds.
    /// * `ignore_errors` -- when `true`, any failure yields `Ok(false)`
    ///   instead of an error.
    ///
    /// # Errors
    ///
    /// With `ignore_errors` set to `false`, returns the underlying command
    /// failure.
    pub async fn ping(&self, sleep_ms: f64, ignore_errors: bool) -> Result<bool> {
        match &self.inner {
            Variant::Tcp(client) => client.ping(sleep_ms, ignore_errors).await,
            Variant::Http(client) => client.ping(sleep_ms, ignore_errors).await,
        }
    }

    /// Asks the server to terminate.
    ///
    /// # Errors
    ///
    /// Returns an error when the shutdown command cannot be delivered; a
    /// missing reply is not an error (the server may stop before answering).
    pub async fn shutdown(&self) -> Result<()> {
        match &self.inner {
            Variant::Tcp(client) => client.shutdown().await,
            Variant::Http(client) => client.shutdown().await,
        }
    }

    // -----------------------------------------------------------------------
    // Stream lifecycle
    // -----------------------------------------------------------------------

    /// Opens the inference stream for the given model.
    ///
    /// An already open stream is closed first. Opening a stream clears the
    /// sticky error of the previous streaming session; the installed
    /// callback, if any, is kept.
    ///
    /// # Arguments
    ///
    /// * `model_name` -- model to run, as listed by
    ///   [`modelzoo_list`](Self::modelzoo_list).
    /// * `frame_queue_depth` -- maximum number of outstanding frames.
    /// * `extra_params` -- model configuration overrides merged into the
    ///   stream-open record.
    ///
    /// # Errors
    ///
    /// Returns an error when the stream connection cannot be established or
    /// the server rejects the configuration.
    pub async fn open_stream(
        &self,
        model_name: &str,
        frame_queue_depth: usize,
        extra_params: Option<&ModelParams>,
    ) -> Result<()> {
        match &self.inner {
            Variant::Tcp(client) => {
                client
                    .open_stream(model_name, frame_queue_depth, extra_params)
                    .await
            }
            Variant::Http(client) => {
                client
                    .open_stream(model_name, frame_queue_depth, extra_params)
                    .await
            }
        }
    }

    /// Closes the inference stream. Idempotent; errors on the close path are
    /// swallowed.
    pub async fn close_stream(&self) {
        match &self.inner {
            Variant::Tcp(client) => client.close_stream().await,
            Variant::Http(client) => client.close_stream().await,
        }
    }

    // -----------------------------------------------------------------------
    // Asynchronous prediction
    // -----------------------------------------------------------------------

    /// Installs or removes the prediction result callback.
    ///
    /// The callback is invoked on the stream reader task, without any
    /// internal lock held, once per submitted frame and strictly in
    /// submission order. Panics raised by the callback are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectApiUse`] while inference results are
    /// outstanding.
    pub fn install_callback(&self, callback: Option<ResultCallback>) -> Result<()> {
        self.pipeline().install_callback(callback)
    }

    /// Sends one frame batch for prediction.
    ///
    /// Requires an open stream and an installed callback. When the
    /// outstanding-frame window is full, waits until a result frees a slot,
    /// bounded by the inference timeout. After a streaming error, submissions
    /// become silent no-ops -- the error stays readable through
    /// [`last_error`](Self::last_error) until the next stream open.
    ///
    /// # Arguments
    ///
    /// * `batch` -- the frame data buffers.
    /// * `frame_tag` -- opaque string delivered verbatim to the callback
    ///   with the corresponding result. May be empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectApiUse`] without a stream or callback, and
    /// [`Error::Timeout`] when the queue-full wait exceeds the inference
    /// timeout.
    pub async fn submit(&self, batch: &FrameBatch, frame_tag: &str) -> Result<()> {
        match &self.inner {
            Variant::Tcp(client) => client.submit(batch, frame_tag).await,
            Variant::Http(client) => client.submit(batch, frame_tag).await,
        }
    }

    /// Finalizes the sequence of submitted frames: waits until every
    /// outstanding result has been dispatched or an error is set.
    ///
    /// Never fails; a streaming error -- including a timeout while waiting
    /// for the drain -- is surfaced only through
    /// [`last_error`](Self::last_error). Calling `finish` twice has the same
    /// effect as once, and submitting again after a healthy `finish` resumes
    /// the stream.
    pub async fn finish(&self) {
        self.pipeline().request_stop();
        self.pipeline().wait_drained().await;
    }

    /// Number of frames submitted for which no result has been dispatched
    /// yet.
    #[must_use]
    pub fn outstanding_count(&self) -> usize {
        self.pipeline().outstanding()
    }

    /// The sticky error of the current streaming session, if any. Cleared
    /// only by [`open_stream`](Self::open_stream).
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.pipeline().last_error()
    }

    // -----------------------------------------------------------------------
    // Synchronous prediction
    // -----------------------------------------------------------------------

    /// Runs a single prediction on the open stream and returns its result
    /// document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectApiUse`] when a streaming callback is
    /// installed or no stream is open, and [`Error::OperationFailed`] or
    /// [`Error::Timeout`] when the prediction fails.
    pub async fn predict(&self, batch: &FrameBatch) -> Result<Value> {
        if self.pipeline().callback_installed() {
            return Err(Error::IncorrectApiUse(
                "cannot perform single-frame inference: \
                 client is configured for streaming inference"
                    .into(),
            ));
        }

        // Capture the single result through a temporary internal callback.
        let slot: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&slot);
        self.pipeline()
            .install_callback(Some(Arc::new(move |result: &Value, _tag: &str| {
                *sink.lock().expect("result slot mutex poisoned") = Some(result.clone());
            })))?;

        let submitted = self.submit(batch, "").await;
        if submitted.is_ok() {
            self.finish().await;
        }
        let _ = self.pipeline().install_callback(None);
        submitted?;

        if let Some(msg) = self.last_error() {
            return Err(Error::OperationFailed(msg));
        }
        let result = slot
            .lock()
            .expect("result slot mutex poisoned")
            .take()
            .ok_or_else(|| Error::OperationFailed("no inference result received".into()));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builder_chain() {
        let options = ClientOptions::default()
            .connection_timeout(Duration::from_secs(3))
            .inference_timeout(Duration::from_secs(30))
            .token("secret");
        assert_eq!(options.connection_timeout, Duration::from_secs(3));
        assert_eq!(options.inference_timeout, Duration::from_secs(30));
        assert_eq!(options.token.as_deref(), Some("secret"));
    }

    #[test]
    fn options_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.connection_timeout, DEFAULT_CONNECTION_TIMEOUT);
        assert_eq!(options.inference_timeout, DEFAULT_INFERENCE_TIMEOUT);
        assert!(options.token.is_none());
    }

    #[tokio::test]
    async fn connect_rejects_malformed_urls() {
        assert!(matches!(
            Client::connect("").await,
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(
            Client::connect("http://").await,
            Err(Error::BadParameter(_))
        ));
    }
}
