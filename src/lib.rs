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

//! Rust client library for AI inference servers.
//!
//! This crate submits inference requests to a remote AI server and streams
//! results back with bounded concurrency. Two wire protocols are supported
//! and behave identically above the transport: a proprietary length-prefixed
//! TCP protocol, and an HTTP control surface paired with a WebSocket data
//! channel. The factory selects the transport from the server URL scheme.
//!
//! Streaming inference keeps a bounded window of outstanding frames: `submit`
//! applies backpressure when the window is full, results are dispatched to a
//! user callback strictly in submission order, and the first error on a
//! stream becomes sticky until the stream is re-opened.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use aiserver_client::client::Client;
//! use aiserver_client::infer::FrameBatch;
//!
//! # async fn example() -> aiserver_client::error::Result<()> {
//! // Connect over the TCP protocol (no scheme) with default options.
//! let client = Client::connect("localhost:8778").await?;
//!
//! // Check the server is reachable.
//! assert!(client.ping(0.0, true).await?);
//!
//! // Open a stream and run a single-shot prediction.
//! client.open_stream("mobilenet_v2", 4, None).await?;
//! let result = client.predict(&FrameBatch::buffer(b"frame".to_vec())).await?;
//! println!("Result: {result}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] -- The main [`Client`](client::Client) façade, its factory,
//!   and connection options.
//! - [`address`] -- Server URL parsing and transport selection.
//! - [`infer`] -- Frame batches, model descriptions, and the result callback
//!   contract.
//! - [`params`] -- Typed access to model configuration documents.
//! - [`codec`] -- Length-prefixed framing of the TCP wire protocol.
//! - [`protocol`] -- Command opcodes, version tags, and payload helpers.
//! - [`error`] -- Error types and the [`Result`](error::Result) alias.

pub mod address;
pub mod client;
pub mod codec;
pub mod error;
pub mod infer;
pub mod params;
pub mod protocol;

mod http;
mod pipeline;
mod tcp;

/// Re-export of the main client type for convenience.
pub use client::Client;
