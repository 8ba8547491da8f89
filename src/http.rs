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

//! Client for the HTTP/WebSocket protocol.
//!
//! Control commands map onto `GET`/`POST` requests under `/v1/`; the stream
//! channel is a WebSocket at `/v1/stream` whose first text frame carries the
//! model name and configuration, answered by an acknowledgement text frame.
//! Thereafter binary frames carry inference requests toward the server and
//! MessagePack-encoded results back.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::SinkExt;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_stream::StreamExt as _;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::address::ServerAddress;
use crate::error::{Error, Result};
use crate::infer::{FrameBatch, ModelInfo};
use crate::params::ModelParams;
use crate::pipeline::Pipeline;
use crate::protocol;

/// Connect attempts before a stream connection failure is reported.
const CONNECT_RETRIES: usize = 3;

/// Upper bound on the close-path grace period.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Open stream state: the shared WebSocket sink half plus the reader task
/// owning the message stream.
struct WsHandle {
    sink: Arc<tokio::sync::Mutex<WsSink>>,
    reader: JoinHandle<()>,
}

impl Drop for WsHandle {
    fn drop(&mut self) {
        // Force-cancel on abandonment; the graceful path is close_stream.
        self.reader.abort();
    }
}

/// Client speaking the HTTP/WebSocket protocol.
pub(crate) struct HttpClient {
    address: ServerAddress,
    connection_timeout: Duration,
    token: Option<String>,
    http: reqwest::Client,
    pipeline: Arc<Pipeline>,
    stream: tokio::sync::Mutex<Option<WsHandle>>,
}

/// Stream reader task: dispatches binary result messages through the
/// pipeline and answers server pings.
async fn reader_loop(
    pipeline: Arc<Pipeline>,
    mut messages: SplitStream<WsStream>,
    sink: Arc<tokio::sync::Mutex<WsSink>>,
    peer: String,
) {
    while pipeline.wait_for_work().await {
        let message = match timeout(pipeline.inference_timeout(), messages.next()).await {
            Err(_) => {
                pipeline.fail(format!(
                    "timeout {} ms waiting for response from AI server '{peer}'",
                    pipeline.inference_timeout().as_millis()
                ));
                break;
            }
            Ok(None) | Ok(Some(Ok(Message::Close(_)))) => {
                pipeline.fail(format!("AI server '{peer}' closed the stream channel"));
                break;
            }
            Ok(Some(Err(e))) => {
                pipeline.fail(Error::from(e).to_string());
                break;
            }
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Binary(bytes) => match protocol::from_msgpack(&bytes) {
                Ok(result) => pipeline.dispatch(&result),
                Err(e) => {
                    pipeline.fail(e.to_string());
                    break;
                }
            },
            Message::Ping(payload) => {
                let _ = sink.lock().await.send(Message::Pong(payload)).await;
            }
            // Text and pong frames are not part of the result stream.
            _ => {}
        }
    }
    tracing::trace!(%peer, "stream reader task exited");
}

impl HttpClient {
    /// Builds the client. The control connection is established lazily by
    /// the first request.
    pub(crate) fn new(
        address: ServerAddress,
        connection_timeout: Duration,
        inference_timeout: Duration,
        token: Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connection_timeout)
            .timeout(connection_timeout)
            .build()
            .map_err(|e| Error::System(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            address,
            connection_timeout,
            token,
            http,
            pipeline: Arc::new(Pipeline::new(inference_timeout)),
            stream: tokio::sync::Mutex::new(None),
        })
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}:{}{path}", self.address.host, self.address.port)
    }

    /// Sends one control request and returns the response body after status
    /// checking.
    async fn request(&self, builder: reqwest::RequestBuilder, path: &str) -> Result<String> {
        let builder = match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let response = builder.send().await.map_err(|e| {
            let detail = format!(
                "error sending HTTP request '{path}' to {}: {e}",
                self.address
            );
            if e.is_timeout() {
                Error::Timeout(detail)
            } else {
                Error::OperationFailed(detail)
            }
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::OperationFailed(format!(
                "error sending HTTP request '{path}' to {}: {} ({}) {body}",
                self.address,
                status.canonical_reason().unwrap_or("request failed"),
                status.as_u16()
            )));
        }
        Ok(body)
    }

    async fn get(&self, path: &str) -> Result<String> {
        self.request(self.http.get(self.url(path)), path).await
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<String> {
        let mut builder = self.http.post(self.url(path));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.request(builder, path).await
    }

    // -----------------------------------------------------------------------
    // Control operations
    // -----------------------------------------------------------------------

    pub(crate) async fn modelzoo_list(&self) -> Result<Vec<ModelInfo>> {
        let body = self.get("/v1/modelzoo").await?;
        let model_map: Value = serde_json::from_str(&body)?;
        let Some(model_map) = model_map.as_object() else {
            return Err(Error::Parse("model zoo response is not an object".into()));
        };

        let mut list = Vec::with_capacity(model_map.len());
        for (name, params) in model_map {
            list.push(ModelInfo {
                name: name.clone(),
                extended_params: ModelParams::from_json(params.clone())?,
            });
        }
        Ok(list)
    }

    pub(crate) async fn system_info(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.get("/v1/system_info").await?)?)
    }

    pub(crate) async fn label_dictionary(&self, model_name: &str) -> Result<Value> {
        let body = self.get(&format!("/v1/label_dictionary/{model_name}")).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub(crate) async fn trace_manage(&self, req: &Value) -> Result<Value> {
        Ok(serde_json::from_str(
            &self.post("/v1/trace_manage", Some(req)).await?,
        )?)
    }

    pub(crate) async fn zoo_manage(&self, req: &Value) -> Result<Value> {
        Ok(serde_json::from_str(
            &self.post("/v1/zoo_manage", Some(req)).await?,
        )?)
    }

    pub(crate) async fn dev_ctrl(&self, req: &Value) -> Result<Value> {
        Ok(serde_json::from_str(
            &self.post("/v1/dev_ctrl", Some(req)).await?,
        )?)
    }

    pub(crate) async fn ping(&self, sleep_ms: f64, ignore_errors: bool) -> Result<bool> {
        match self.post(&format!("/v1/sleep/{sleep_ms}"), None).await {
            Ok(_) => Ok(true),
            Err(_) if ignore_errors => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        // Probe first so an unreachable server is reported; the shutdown
        // reply itself may never arrive and its errors are ignored.
        self.post("/v1/sleep/0", None).await?;
        if let Err(e) = self.post("/v1/shutdown", None).await {
            tracing::debug!(error = %e, "shutdown reply not received");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Stream channel
    // -----------------------------------------------------------------------

    pub(crate) async fn open_stream(
        &self,
        model_name: &str,
        frame_queue_depth: usize,
        extra_params: Option<&ModelParams>,
    ) -> Result<()> {
        self.close_stream().await;

        let ws_url = format!(
            "ws://{}:{}/v1/stream",
            self.address.host, self.address.port
        );
        let mut ws = None;
        let mut connect_error = Error::Timeout(format!(
            "{} ms connecting to WebSocket server at {ws_url}",
            self.connection_timeout.as_millis()
        ));
        for _attempt in 0..CONNECT_RETRIES {
            match timeout(self.connection_timeout, connect_async(&ws_url)).await {
                Ok(Ok((socket, _response))) => {
                    ws = Some(socket);
                    break;
                }
                Ok(Err(e)) => connect_error = Error::from(e),
                Err(_) => {
                    connect_error = Error::Timeout(format!(
                        "{} ms connecting to WebSocket server at {ws_url}",
                        self.connection_timeout.as_millis()
                    ))
                }
            }
        }
        let Some(mut ws) = ws else {
            return Err(connect_error);
        };

        let config = match extra_params {
            Some(extra) => {
                let mut config = extra.clone();
                config.set_device_timeout_ms(self.pipeline.inference_timeout().as_millis() as f64);
                config.into_json()
            }
            None => json!({}),
        };
        let mut record = json!({ "name": model_name, "config": config });
        if let Some(token) = &self.token {
            record["token"] = Value::from(token.clone());
        }
        ws.send(Message::Text(record.to_string())).await?;

        // The acknowledgement is the first text frame back.
        let ack = loop {
            let message = timeout(self.connection_timeout, ws.next())
                .await
                .map_err(|_| {
                    Error::Timeout(format!(
                        "{} ms waiting for stream configuration on AI server '{}'",
                        self.connection_timeout.as_millis(),
                        self.address
                    ))
                })?
                .ok_or_else(|| {
                    Error::OperationFailed(format!(
                        "AI server '{}' closed the stream channel during configuration",
                        self.address
                    ))
                })??;
            match message {
                Message::Text(text) => break text,
                Message::Ping(payload) => ws.send(Message::Pong(payload)).await?,
                Message::Close(_) => {
                    return Err(Error::OperationFailed(format!(
                        "AI server '{}' closed the stream channel during configuration",
                        self.address
                    )))
                }
                _ => {}
            }
        };
        let ack: Value = serde_json::from_str(&ack)?;
        protocol::error_check_raise(
            &ack,
            &format!(
                "error configuring model {model_name} on AI server {}",
                self.address
            ),
        )?;

        self.pipeline.reset(frame_queue_depth);
        let (sink, messages) = futures_util::StreamExt::split(ws);
        let sink = Arc::new(tokio::sync::Mutex::new(sink));
        let reader = tokio::spawn(reader_loop(
            Arc::clone(&self.pipeline),
            messages,
            Arc::clone(&sink),
            self.address.to_string(),
        ));
        *self.stream.lock().await = Some(WsHandle { sink, reader });
        tracing::debug!(model = model_name, depth = frame_queue_depth, "stream opened");
        Ok(())
    }

    pub(crate) async fn close_stream(&self) {
        let Some(mut handle) = self.stream.lock().await.take() else {
            return;
        };
        // The window must be empty before the channel goes away; a sticky
        // error ends the drain immediately.
        self.pipeline.request_stop();
        self.pipeline.wait_drained().await;
        self.pipeline.request_close();

        let grace = self.connection_timeout.min(CLOSE_GRACE);
        let close = async {
            let _ = handle.sink.lock().await.send(Message::Close(None)).await;
        };
        let _ = timeout(grace, close).await;
        if timeout(grace, &mut handle.reader).await.is_err() {
            handle.reader.abort();
        }
        tracing::debug!(server = %self.address, "stream closed");
    }

    pub(crate) async fn submit(&self, batch: &FrameBatch, frame_tag: &str) -> Result<()> {
        if self.stream.lock().await.is_none() {
            return Err(Error::IncorrectApiUse("submit: stream is not open".into()));
        }
        if !self.pipeline.callback_installed() {
            return Err(Error::IncorrectApiUse(
                "submit: result callback is not installed".into(),
            ));
        }

        // Window reservation happens before any socket I/O; a sticky error
        // turns the submission into a silent drop.
        if !self.pipeline.reserve(frame_tag).await? {
            return Ok(());
        }

        let guard = self.stream.lock().await;
        let Some(handle) = guard.as_ref() else {
            return Err(Error::IncorrectApiUse("submit: stream is not open".into()));
        };
        let mut sink = handle.sink.lock().await;
        for buffer in batch.iter() {
            if let Err(e) = sink.send(Message::Binary(buffer.to_vec())).await {
                let e = Error::from(e);
                self.pipeline.fail(e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }
}
