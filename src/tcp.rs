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

//! Client for the proprietary length-prefixed TCP protocol.
//!
//! Two sockets are used: a command socket, opened at construction and shared
//! by all control operations, and a stream socket, opened per stream by
//! `open_stream`. The stream socket's read half is owned by a reader task
//! that drives the shared [`Pipeline`]; the write half is used only by the
//! submitting caller.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::address::ServerAddress;
use crate::codec::{self, Frame};
use crate::error::{Error, Result};
use crate::infer::{FrameBatch, ModelInfo};
use crate::params::ModelParams;
use crate::pipeline::Pipeline;
use crate::protocol::{self, commands};

/// Connect attempts before a connection failure is reported.
const CONNECT_RETRIES: usize = 3;

/// Upper bound on the close-path grace period.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Open stream state: the socket write half plus the reader task driving the
/// read half.
struct StreamHandle {
    writer: OwnedWriteHalf,
    reader: JoinHandle<()>,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        // Force-cancel on abandonment; the graceful path is close_stream.
        self.reader.abort();
    }
}

/// Client speaking the proprietary TCP protocol.
pub(crate) struct TcpClient {
    address: ServerAddress,
    connection_timeout: Duration,
    token: Option<String>,
    command: tokio::sync::Mutex<TcpStream>,
    pipeline: Arc<Pipeline>,
    stream: tokio::sync::Mutex<Option<StreamHandle>>,
}

/// Opens a socket to the server: IPv4 resolution, then up to
/// [`CONNECT_RETRIES`] attempts, each bounded by `connect_timeout`.
async fn socket_connect(
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<TcpStream> {
    let endpoints: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::System(format!("error resolving '{host}': {e}")))?
        .filter(SocketAddr::is_ipv4)
        .collect();
    if endpoints.is_empty() {
        return Err(Error::System(format!(
            "no IPv4 address found for '{host}'"
        )));
    }

    let mut last_error = String::new();
    for _attempt in 0..CONNECT_RETRIES {
        match timeout(connect_timeout, TcpStream::connect(endpoints.as_slice())).await {
            Ok(Ok(socket)) => {
                socket
                    .set_nodelay(true)
                    .map_err(|e| Error::System(e.to_string()))?;
                return Ok(socket);
            }
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = "connect timed out".into(),
        }
    }
    Err(Error::System(format!(
        "error connecting to {host}:{port} after {CONNECT_RETRIES} retries \
         with timeout {} ms: {last_error}",
        connect_timeout.as_millis()
    )))
}

/// Stream reader task: one framed MessagePack response is expected per
/// outstanding frame; each is dispatched through the pipeline in order.
async fn reader_loop(pipeline: Arc<Pipeline>, mut reader: OwnedReadHalf, peer: String) {
    while pipeline.wait_for_work().await {
        let bytes = match timeout(pipeline.inference_timeout(), codec::read_frame(&mut reader))
            .await
        {
            Err(_) => {
                pipeline.fail(format!(
                    "timeout {} ms waiting for response from AI server '{peer}'",
                    pipeline.inference_timeout().as_millis()
                ));
                break;
            }
            Ok(Err(e)) => {
                pipeline.fail(e.to_string());
                break;
            }
            Ok(Ok(Frame::Eof)) => {
                pipeline.fail(format!("AI server '{peer}' closed the stream connection"));
                break;
            }
            Ok(Ok(Frame::Payload(bytes))) => bytes,
        };

        match protocol::from_msgpack(&bytes) {
            Ok(result) => pipeline.dispatch(&result),
            Err(e) => {
                pipeline.fail(e.to_string());
                break;
            }
        }
    }
    tracing::trace!(%peer, "stream reader task exited");
}

impl TcpClient {
    /// Connects the command socket and readies the client.
    pub(crate) async fn connect(
        address: ServerAddress,
        connection_timeout: Duration,
        inference_timeout: Duration,
        token: Option<String>,
    ) -> Result<Self> {
        let command = socket_connect(&address.host, address.port, connection_timeout).await?;
        tracing::debug!(server = %address, "command connection established");
        Ok(Self {
            address,
            connection_timeout,
            token,
            command: tokio::sync::Mutex::new(command),
            pipeline: Arc::new(Pipeline::new(inference_timeout)),
            stream: tokio::sync::Mutex::new(None),
        })
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Sends one command record on the command socket and returns the
    /// version-checked, error-checked response.
    async fn transmit_command(&self, source: &str, request: &Value) -> Result<Value> {
        let text = protocol::message_prepare(request)?;

        let mut socket = self.command.lock().await;
        codec::write_frame(&mut *socket, text.as_bytes()).await?;
        let frame = timeout(self.connection_timeout, codec::read_frame(&mut *socket))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{} ms waiting for command response from AI server '{}'",
                    self.connection_timeout.as_millis(),
                    self.address
                ))
            })??;
        drop(socket);

        let Frame::Payload(bytes) = frame else {
            return Err(Error::OperationFailed(format!(
                "AI server '{}' closed the command connection",
                self.address
            )));
        };
        let response: Value = serde_json::from_slice(&bytes)?;
        protocol::version_check(&response, &self.address.to_string())?;
        protocol::error_check_raise(&response, source)?;
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Control operations
    // -----------------------------------------------------------------------

    pub(crate) async fn modelzoo_list(&self) -> Result<Vec<ModelInfo>> {
        let request = json!({ "op": commands::MODEL_ZOO });
        let response = self.transmit_command("modelzoo_list", &request).await?;

        let mut list = Vec::new();
        if let Some(models) = response.get(commands::MODEL_ZOO).and_then(Value::as_array) {
            for node in models {
                let name = node
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::Parse("model zoo entry has no name".into()))?
                    .to_owned();
                // Model parameters travel as JSON text inside the record.
                let extended_params = match node.get("ModelParams") {
                    Some(Value::String(text)) => ModelParams::from_text(text)?,
                    Some(doc) => ModelParams::from_json(doc.clone())?,
                    None => ModelParams::new(),
                };
                list.push(ModelInfo {
                    name,
                    extended_params,
                });
            }
        }
        Ok(list)
    }

    pub(crate) async fn system_info(&self) -> Result<Value> {
        let request = json!({ "op": commands::SYSTEM_INFO });
        let response = self.transmit_command("system_info", &request).await?;
        Ok(response
            .get(commands::SYSTEM_INFO)
            .cloned()
            .unwrap_or_default())
    }

    pub(crate) async fn label_dictionary(&self, model_name: &str) -> Result<Value> {
        let request = json!({ "op": commands::LABEL_DICT, "name": model_name });
        let response = self.transmit_command("label_dictionary", &request).await?;
        Ok(response
            .get(commands::LABEL_DICT)
            .cloned()
            .unwrap_or_default())
    }

    pub(crate) async fn trace_manage(&self, req: &Value) -> Result<Value> {
        let request = json!({ "op": commands::TRACE_MANAGE, "args": req });
        let response = self.transmit_command("trace_manage", &request).await?;
        Ok(response
            .get(commands::TRACE_MANAGE)
            .cloned()
            .unwrap_or_default())
    }

    pub(crate) async fn zoo_manage(&self, req: &Value) -> Result<Value> {
        let request = json!({ "op": commands::ZOO_MANAGE, "args": req });
        let response = self.transmit_command("zoo_manage", &request).await?;
        Ok(response
            .get(commands::ZOO_MANAGE)
            .cloned()
            .unwrap_or_default())
    }

    pub(crate) async fn dev_ctrl(&self, req: &Value) -> Result<Value> {
        let request = json!({ "op": commands::DEV_CTRL, "args": req });
        let response = self.transmit_command("dev_ctrl", &request).await?;
        Ok(response
            .get(commands::DEV_CTRL)
            .cloned()
            .unwrap_or_default())
    }

    pub(crate) async fn ping(&self, sleep_ms: f64, ignore_errors: bool) -> Result<bool> {
        let request = json!({ "op": commands::SLEEP, "sleep_time_ms": sleep_ms });
        match self.transmit_command("ping", &request).await {
            Ok(_) => Ok(true),
            Err(_) if ignore_errors => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        let request = json!({ "op": commands::SHUTDOWN });
        self.transmit_command("shutdown", &request).await?;

        // Epilogue: a fresh connection delivering a zero-byte frame pushes
        // the server past its accept loop. Errors here are ignored.
        let epilogue = async {
            let mut socket =
                socket_connect(&self.address.host, self.address.port, self.connection_timeout)
                    .await?;
            codec::write_frame(&mut socket, b"").await
        };
        if let Err(e) = epilogue.await {
            tracing::debug!(error = %e, "shutdown epilogue failed");
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

        let mut record = json!({ "op": commands::STREAM, "name": model_name });
        if let Some(extra) = extra_params {
            let mut config = extra.clone();
            config.set_device_timeout_ms(self.pipeline.inference_timeout().as_millis() as f64);
            record["config"] = config.into_json();
        }
        if let Some(token) = &self.token {
            record["token"] = Value::from(token.clone());
        }

        let mut socket =
            socket_connect(&self.address.host, self.address.port, self.connection_timeout).await?;
        let text = protocol::message_prepare(&record)?;
        codec::write_frame(&mut socket, text.as_bytes()).await?;

        // The server acknowledges the stream configuration with a JSON
        // record; a failure there aborts the open.
        let ack = timeout(self.connection_timeout, codec::read_frame(&mut socket))
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "{} ms waiting for stream configuration on AI server '{}'",
                    self.connection_timeout.as_millis(),
                    self.address
                ))
            })??;
        let Frame::Payload(bytes) = ack else {
            return Err(Error::OperationFailed(format!(
                "AI server '{}' closed the stream connection during configuration",
                self.address
            )));
        };
        let ack: Value = serde_json::from_slice(&bytes)?;
        protocol::error_check_raise(
            &ack,
            &format!(
                "error configuring model {model_name} on AI server {}",
                self.address
            ),
        )?;

        self.pipeline.reset(frame_queue_depth);
        let (read_half, write_half) = socket.into_split();
        let reader = tokio::spawn(reader_loop(
            Arc::clone(&self.pipeline),
            read_half,
            self.address.to_string(),
        ));
        *self.stream.lock().await = Some(StreamHandle {
            writer: write_half,
            reader,
        });
        tracing::debug!(model = model_name, depth = frame_queue_depth, "stream opened");
        Ok(())
    }

    pub(crate) async fn close_stream(&self) {
        let Some(mut handle) = self.stream.lock().await.take() else {
            return;
        };
        // The window must be empty before the socket goes away; a sticky
        // error ends the drain immediately.
        self.pipeline.request_stop();
        self.pipeline.wait_drained().await;
        self.pipeline.request_close();

        let grace = self.connection_timeout.min(CLOSE_GRACE);
        // End-of-stream marker, best effort.
        let _ = timeout(grace, codec::write_frame(&mut handle.writer, b"")).await;
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

        let mut guard = self.stream.lock().await;
        let Some(handle) = guard.as_mut() else {
            return Err(Error::IncorrectApiUse("submit: stream is not open".into()));
        };
        for buffer in batch.iter() {
            if let Err(e) = codec::write_frame(&mut handle.writer, buffer).await {
                self.pipeline.fail(e.to_string());
                return Err(e);
            }
        }
        Ok(())
    }
}
