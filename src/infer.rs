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

//! Inference data model: frame batches, model descriptions, and the result
//! callback contract.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::params::ModelParams;

/// Default depth of the outstanding-frame queue.
pub const DEFAULT_FRAME_QUEUE_DEPTH: usize = 8;

/// Default connection timeout.
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default inference timeout.
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(180);

/// Prediction result callback.
///
/// Invoked on the receiver task, without any pipeline lock held, once per
/// submitted frame and strictly in submission order. The first argument is
/// the result document; the second is the frame tag supplied to
/// [`submit`](crate::client::Client::submit). The callback is treated as
/// hostile code: panics are caught and discarded.
pub type ResultCallback = Arc<dyn Fn(&Value, &str) + Send + Sync + 'static>;

/// One logical inference input: an ordered sequence of opaque byte buffers.
///
/// A batch may comprise several physical buffers (for example one per model
/// input); all of them are sent back-to-back on the stream channel, and the
/// server emits exactly one result per batch.
///
/// # Example
///
/// ```rust
/// use aiserver_client::infer::FrameBatch;
///
/// let batch = FrameBatch::buffer(b"jpeg bytes".to_vec());
/// assert_eq!(batch.len(), 1);
///
/// let mut batch = FrameBatch::new();
/// batch.push(vec![1, 2, 3]);
/// batch.push(vec![4, 5]);
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameBatch {
    buffers: Vec<Vec<u8>>,
}

impl FrameBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch holding a single buffer.
    #[must_use]
    pub fn buffer(data: Vec<u8>) -> Self {
        Self {
            buffers: vec![data],
        }
    }

    /// Appends a buffer to the batch.
    pub fn push(&mut self, data: Vec<u8>) -> &mut Self {
        self.buffers.push(data);
        self
    }

    /// Number of buffers in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the batch holds no buffers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.buffers.iter().map(Vec::len).sum()
    }

    /// Iterates over the buffers in send order.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.buffers.iter().map(Vec::as_slice)
    }
}

impl From<Vec<u8>> for FrameBatch {
    fn from(data: Vec<u8>) -> Self {
        Self::buffer(data)
    }
}

impl FromIterator<Vec<u8>> for FrameBatch {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self {
            buffers: iter.into_iter().collect(),
        }
    }
}

/// Description of one model hosted by the server, as returned by the
/// model-zoo listing.
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name; the key used to open a stream.
    pub name: String,
    /// Extended model parameters.
    pub extended_params: ModelParams,
}

impl ModelInfo {
    /// Device type the model runs on, read from the extended parameters.
    #[must_use]
    pub fn device_type(&self) -> String {
        self.extended_params.device_type()
    }

    /// Runtime agent executing the model.
    #[must_use]
    pub fn runtime_agent(&self) -> String {
        self.extended_params.runtime_agent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_construction_and_accessors() {
        let mut batch = FrameBatch::new();
        assert!(batch.is_empty());

        batch.push(vec![0u8; 10]).push(vec![0u8; 5]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.byte_len(), 15);

        let sizes: Vec<usize> = batch.iter().map(<[u8]>::len).collect();
        assert_eq!(sizes, vec![10, 5]);
    }

    #[test]
    fn single_buffer_constructors_agree() {
        let from_vec: FrameBatch = vec![1u8, 2, 3].into();
        assert_eq!(from_vec, FrameBatch::buffer(vec![1, 2, 3]));

        let collected: FrameBatch = [vec![1u8, 2, 3]].into_iter().collect();
        assert_eq!(collected, from_vec);
    }

    #[test]
    fn model_info_reads_through_params() {
        let info = ModelInfo {
            name: "det".into(),
            extended_params: ModelParams::from_json(json!({
                "DEVICE": [{"DeviceType": "NPU", "RuntimeAgent": "OPENVINO"}]
            }))
            .unwrap(),
        };
        assert_eq!(info.device_type(), "NPU");
        assert_eq!(info.runtime_agent(), "OPENVINO");
    }
}
