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

//! Streaming inference example.
//!
//! Demonstrates connecting to an AI server, listing the model zoo, opening
//! an inference stream, and pipelining a handful of frames through it with
//! an ordered result callback.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example stream_infer -- [server-url] [model-name]
//! ```
//!
//! The server URL defaults to `localhost:8778` (TCP protocol); pass an
//! `http://` URL to use the HTTP/WebSocket protocol instead.

use std::sync::Arc;

use aiserver_client::client::Client;
use aiserver_client::error::Result;
use aiserver_client::infer::FrameBatch;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let url = args.next().unwrap_or_else(|| "localhost:8778".to_owned());
    let model_arg = args.next();

    println!("Connecting to AI server at {url}...");
    let client = Client::connect(&url).await?;

    // -- Server health -------------------------------------------------------

    let alive = client.ping(0.0, true).await?;
    println!("Server reachable: {alive}");

    // -- Model zoo -----------------------------------------------------------

    let models = client.modelzoo_list().await?;
    println!("Available models:");
    for model in &models {
        println!("  {} [{}]", model.name, model.device_type());
    }

    let Some(model_name) = model_arg.or_else(|| models.first().map(|m| m.name.clone())) else {
        println!("Model zoo is empty, nothing to run.");
        return Ok(());
    };

    // -- Streaming inference -------------------------------------------------

    println!("\nStreaming 8 frames through '{model_name}'...");
    client.open_stream(&model_name, 4, None).await?;

    client.install_callback(Some(Arc::new(|result, tag| {
        println!("frame {tag}: {result}");
    })))?;

    for i in 0..8 {
        let batch = FrameBatch::buffer(vec![0u8; 4 * 1024]);
        client.submit(&batch, &i.to_string()).await?;
    }
    client.finish().await;

    if let Some(error) = client.last_error() {
        println!("Streaming ended with error: {error}");
    } else {
        println!("All frames processed.");
    }

    client.close_stream().await;
    println!("Done!");
    Ok(())
}
