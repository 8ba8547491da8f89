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

//! Wire framing for the proprietary TCP transport.
//!
//! Every message on the wire is a 4-byte big-endian unsigned length `N`
//! followed by `N` payload bytes. The codec only frames: control payloads are
//! UTF-8 JSON text, stream requests are arbitrary byte batches, and stream
//! responses are MessagePack documents, but none of that is interpreted here.
//! Zero-length frames are legal and serve as end-of-stream markers.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// A frame read from the wire: either a payload or a clean end of stream
/// observed before the length prefix.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// Payload of a complete frame. May be empty (zero-length frame).
    Payload(Vec<u8>),
    /// The peer closed the connection between frames.
    Eof,
}

/// Writes one length-prefixed frame: the 4-byte big-endian length first, then
/// the payload. Partial writes are completed before returning.
///
/// # Errors
///
/// Returns [`Error::BadParameter`] for payloads of 2 GiB or more, and
/// [`Error::OperationFailed`] on socket errors.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= i32::MAX as u32)
        .ok_or_else(|| {
            Error::BadParameter(format!("frame of {} bytes exceeds wire limit", payload.len()))
        })?;

    writer
        .write_u32(len)
        .await
        .map_err(|e| Error::OperationFailed(format!("failed to send frame header: {e}")))?;
    if !payload.is_empty() {
        writer
            .write_all(payload)
            .await
            .map_err(|e| Error::OperationFailed(format!("failed to send frame payload: {e}")))?;
    }
    writer
        .flush()
        .await
        .map_err(|e| Error::OperationFailed(format!("failed to flush frame: {e}")))?;
    Ok(())
}

/// Reads one length-prefixed frame. A connection closed cleanly before the
/// length prefix yields [`Frame::Eof`]; a connection dropped mid-frame is an
/// error.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] on socket errors or truncated frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(Frame::Eof),
        Err(e) => {
            return Err(Error::OperationFailed(format!(
                "failed to read frame header: {e}"
            )))
        }
    };

    let mut payload = vec![0u8; len];
    if len > 0 {
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| Error::OperationFailed(format!("failed to read frame payload: {e}")))?;
    }
    Ok(Frame::Payload(payload))
}
