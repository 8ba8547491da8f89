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

//! The bounded-window submit/receive engine shared by both transports.
//!
//! One producer (the caller of `submit`) and one consumer (the stream reader
//! task) cooperate through a [`Pipeline`]: the producer reserves a slot in
//! the outstanding-frame window before writing to the socket, and the
//! consumer dispatches each received result to the user callback in
//! submission order. The window never exceeds the queue depth fixed at stream
//! open.
//!
//! The first error observed on a stream -- whether reported by the server or
//! raised by the transport -- becomes *sticky*: it disables further dispatch,
//! turns subsequent submissions into no-ops, and is surfaced through
//! [`last_error`](Pipeline::last_error) until the next stream open resets the
//! engine.
//!
//! The mutex guards only queue state and is never held across socket I/O or
//! a callback invocation.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::infer::ResultCallback;
use crate::protocol;

/// Pipeline state guarded by the mutex.
struct PipeState {
    /// One tag per outstanding frame, in submission order. The head
    /// corresponds to the next result the server will emit.
    pending: VecDeque<String>,
    /// Maximum number of outstanding frames; fixed at stream open.
    queue_depth: usize,
    /// First error observed on the current stream; sticky until reset.
    last_error: Option<String>,
    /// Cooperative stop signal raised by `finish`.
    stop_requested: bool,
    /// Terminal close signal raised by `close_stream`; ends the reader.
    closed: bool,
    /// Installed result callback; survives stream re-opens.
    callback: Option<ResultCallback>,
}

/// In-order, bounded-window submit/receive engine with sticky-error
/// semantics. Shared between the submitting caller and the stream reader
/// task via `Arc`.
pub(crate) struct Pipeline {
    state: Mutex<PipeState>,
    notify: Notify,
    inference_timeout: Duration,
}

impl Pipeline {
    pub(crate) fn new(inference_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(PipeState {
                pending: VecDeque::new(),
                queue_depth: crate::infer::DEFAULT_FRAME_QUEUE_DEPTH,
                last_error: None,
                stop_requested: false,
                closed: true,
                callback: None,
            }),
            notify: Notify::new(),
            inference_timeout,
        }
    }

    fn locked(&self) -> MutexGuard<'_, PipeState> {
        // The callback never runs under the lock, so the mutex cannot be
        // poisoned by user code.
        self.state.lock().expect("pipeline mutex poisoned")
    }

    /// Re-arms the engine for a freshly opened stream: clears the sticky
    /// error and the window, fixes the queue depth. The installed callback
    /// is kept.
    pub(crate) fn reset(&self, queue_depth: usize) {
        let mut st = self.locked();
        st.pending.clear();
        st.queue_depth = queue_depth.max(1);
        st.last_error = None;
        st.stop_requested = false;
        st.closed = false;
        drop(st);
        self.notify.notify_waiters();
    }

    /// Installs or removes the result callback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncorrectApiUse`] while results are outstanding; the
    /// receiver must be quiescent before the callback can change.
    pub(crate) fn install_callback(&self, callback: Option<ResultCallback>) -> Result<()> {
        let mut st = self.locked();
        if !st.pending.is_empty() {
            return Err(Error::IncorrectApiUse(
                "cannot change the result callback while inference results are outstanding".into(),
            ));
        }
        st.callback = callback;
        Ok(())
    }

    pub(crate) fn callback_installed(&self) -> bool {
        self.locked().callback.is_some()
    }

    /// Reserves a window slot for one frame, blocking while the window is
    /// full. Returns `Ok(false)` when the frame must be dropped because a
    /// sticky error is set. A stop requested on a healthy stream is cleared
    /// here: submitting again after `finish` resumes the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] when the inference timeout elapses while
    /// waiting for space.
    pub(crate) async fn reserve(&self, tag: &str) -> Result<bool> {
        let deadline = Instant::now() + self.inference_timeout;
        loop {
            // Register for wakeups before checking the condition, so a
            // notification arriving in between is not lost.
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut st = self.locked();
                if st.last_error.is_some() {
                    return Ok(false);
                }
                if st.pending.len() < st.queue_depth {
                    st.stop_requested = false;
                    st.pending.push_back(tag.to_owned());
                    drop(st);
                    // Wake the reader: there is work to receive now.
                    self.notify.notify_waiters();
                    return Ok(true);
                }
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero()
                || tokio::time::timeout(remaining, notified).await.is_err()
            {
                let st = self.locked();
                return Err(Error::Timeout(format!(
                    "{} ms waiting for space in the frame queue (queue depth is {})",
                    self.inference_timeout.as_millis(),
                    st.queue_depth
                )));
            }
        }
    }

    /// Consumer side: accounts one received result document and dispatches
    /// it to the user callback.
    ///
    /// The head tag is read under the lock; the callback runs outside it and
    /// the tag is popped once the callback returns.
    /// A result carrying the error-response shape sticks as `last_error`,
    /// clears the window, and stops the stream; only the first error on a
    /// stream reaches the callback -- anything dispatched after an error is
    /// suppressed to avoid racing a caller that already returned from
    /// `finish`.
    pub(crate) fn dispatch(&self, result: &Value) {
        let err_msg = protocol::error_check(result);
        let (tag, callback, suppress) = {
            let mut st = self.locked();
            let suppress = st.last_error.is_some();
            let tag = st.pending.front().cloned().unwrap_or_default();
            if let Some(msg) = &err_msg {
                tracing::debug!(error = %msg, "server reported inference error");
                if st.last_error.is_none() {
                    st.last_error = Some(msg.clone());
                }
                st.stop_requested = true;
            }
            (tag, st.callback.clone(), suppress)
        };

        if !suppress {
            if let Some(cb) = callback {
                // The callback is hostile code: panics must not reach the
                // reader task.
                if catch_unwind(AssertUnwindSafe(|| cb(result, &tag))).is_err() {
                    tracing::warn!("result callback panicked; panic discarded");
                }
            }
        }

        // The frame leaves the window only after its callback has returned,
        // so a drain wait cannot complete while a callback is mid-flight.
        {
            let mut st = self.locked();
            st.pending.pop_front();
            if err_msg.is_some() {
                st.pending.clear();
            }
        }
        self.notify.notify_waiters();
    }

    /// Consumer side: records a transport-level failure. Sticks the error,
    /// clears the window, stops the stream, and wakes every waiter. The
    /// callback is not invoked for transport failures.
    pub(crate) fn fail(&self, msg: impl Into<String>) {
        let msg = msg.into();
        let mut st = self.locked();
        tracing::debug!(error = %msg, "stream pipeline failed");
        if st.last_error.is_none() {
            st.last_error = Some(msg);
        }
        st.stop_requested = true;
        st.pending.clear();
        drop(st);
        self.notify.notify_waiters();
    }

    /// Reader-side wait: resolves `true` when a result is expected on the
    /// wire and `false` when the reader should exit (stream closed or
    /// errored).
    pub(crate) async fn wait_for_work(&self) -> bool {
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let st = self.locked();
                if st.last_error.is_some() || st.closed {
                    return false;
                }
                if !st.pending.is_empty() {
                    return true;
                }
            }
            notified.await;
        }
    }

    /// `finish`-side wait: blocks until the window drains or an error is
    /// set. Progress is bounded: when no result arrives within the
    /// inference timeout the wait gives up and sticks a timeout error.
    /// Never returns an error -- `finish` reports only through
    /// [`last_error`](Self::last_error).
    pub(crate) async fn wait_drained(&self) {
        loop {
            let watermark = {
                let st = self.locked();
                if st.pending.is_empty() || st.last_error.is_some() {
                    return;
                }
                st.pending.len()
            };
            // Wait for the window to shrink below the watermark; each step
            // of progress gets a fresh timeout budget.
            let deadline = Instant::now() + self.inference_timeout;
            loop {
                let mut notified = std::pin::pin!(self.notify.notified());
                notified.as_mut().enable();
                {
                    let st = self.locked();
                    if st.pending.len() < watermark || st.last_error.is_some() {
                        break;
                    }
                }
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero()
                    || tokio::time::timeout(remaining, notified).await.is_err()
                {
                    self.fail(format!(
                        "timeout {} ms waiting for inference completion \
                         (current queue size is {watermark})",
                        self.inference_timeout.as_millis()
                    ));
                    return;
                }
            }
        }
    }

    /// Raises the cooperative stop signal and wakes every waiter.
    pub(crate) fn request_stop(&self) {
        self.locked().stop_requested = true;
        self.notify.notify_waiters();
    }

    /// Marks the stream closed, ending the reader task, and wakes every
    /// waiter.
    pub(crate) fn request_close(&self) {
        let mut st = self.locked();
        st.stop_requested = true;
        st.closed = true;
        drop(st);
        self.notify.notify_waiters();
    }

    /// Number of frames submitted for which no result has been dispatched.
    pub(crate) fn outstanding(&self) -> usize {
        self.locked().pending.len()
    }

    /// The sticky error of the current stream, if any.
    pub(crate) fn last_error(&self) -> Option<String> {
        self.locked().last_error.clone()
    }

    pub(crate) fn inference_timeout(&self) -> Duration {
        self.inference_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn collector() -> (ResultCallback, Arc<Mutex<Vec<(Value, String)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ResultCallback = Arc::new(move |result: &Value, tag: &str| {
            sink.lock().unwrap().push((result.clone(), tag.to_owned()));
        });
        (cb, seen)
    }

    fn pipeline(depth: usize, timeout: Duration) -> Pipeline {
        let p = Pipeline::new(timeout);
        p.reset(depth);
        p
    }

    #[tokio::test]
    async fn results_dispatch_in_submission_order() {
        let p = pipeline(4, Duration::from_secs(1));
        let (cb, seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        for i in 0..3 {
            assert!(p.reserve(&i.to_string()).await.unwrap());
        }
        assert_eq!(p.outstanding(), 3);

        for i in 0..3 {
            p.dispatch(&json!({"result": i}));
        }

        let seen = seen.lock().unwrap();
        let tags: Vec<&str> = seen.iter().map(|(_, tag)| tag.as_str()).collect();
        assert_eq!(tags, vec!["0", "1", "2"]);
        assert_eq!(p.outstanding(), 0);
        assert_eq!(p.last_error(), None);
    }

    #[tokio::test]
    async fn full_window_blocks_until_timeout() {
        let p = pipeline(1, Duration::from_millis(50));
        p.install_callback(Some(collector().0)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        let err = p.reserve("1").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        // The blocked reservation did not enter the window.
        assert_eq!(p.outstanding(), 1);
    }

    #[tokio::test]
    async fn full_window_unblocks_on_dispatch() {
        let p = Arc::new(pipeline(2, Duration::from_secs(5)));
        let (cb, _seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        assert!(p.reserve("1").await.unwrap());

        let p2 = Arc::clone(&p);
        let waiter = tokio::spawn(async move { p2.reserve("2").await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        p.dispatch(&json!({"result": 0}));
        assert!(waiter.await.unwrap().unwrap());
        assert_eq!(p.outstanding(), 2);
    }

    #[tokio::test]
    async fn first_error_sticks_and_later_dispatches_are_suppressed() {
        let p = pipeline(4, Duration::from_secs(1));
        let (cb, seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        for i in 0..3 {
            assert!(p.reserve(&i.to_string()).await.unwrap());
        }
        p.dispatch(&json!({"success": false, "msg": "boom"}));
        // Late arrivals from already-queued frames never reach the callback.
        p.dispatch(&json!({"result": 1}));
        p.dispatch(&json!({"success": false, "msg": "boom again"}));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "0");
        assert_eq!(p.last_error().as_deref(), Some("boom"));
        assert_eq!(p.outstanding(), 0);
    }

    #[tokio::test]
    async fn submissions_after_error_are_dropped() {
        let p = pipeline(4, Duration::from_secs(1));
        p.install_callback(Some(collector().0)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        p.dispatch(&json!({"success": false, "msg": "boom"}));

        assert!(!p.reserve("1").await.unwrap());
        assert_eq!(p.outstanding(), 0);
        assert_eq!(p.last_error().as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn transport_failure_skips_callback() {
        let p = pipeline(2, Duration::from_secs(1));
        let (cb, seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        p.fail("connection reset");

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(p.last_error().as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn callback_panic_is_swallowed() {
        let p = pipeline(2, Duration::from_secs(1));
        p.install_callback(Some(Arc::new(|_: &Value, _: &str| {
            panic!("hostile callback");
        })))
        .unwrap();

        assert!(p.reserve("0").await.unwrap());
        p.dispatch(&json!({"ok": true}));
        assert_eq!(p.outstanding(), 0);
        assert_eq!(p.last_error(), None);
    }

    #[tokio::test]
    async fn wait_drained_returns_once_window_empties() {
        let p = Arc::new(pipeline(4, Duration::from_secs(5)));
        let (cb, _seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        assert!(p.reserve("1").await.unwrap());

        let p2 = Arc::clone(&p);
        let drainer = tokio::spawn(async move { p2.wait_drained().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!drainer.is_finished());

        p.dispatch(&json!({"r": 0}));
        p.dispatch(&json!({"r": 1}));
        drainer.await.unwrap();
        assert_eq!(p.last_error(), None);
    }

    #[tokio::test]
    async fn wait_drained_sticks_timeout_when_no_progress() {
        let p = pipeline(1, Duration::from_millis(50));
        p.install_callback(Some(collector().0)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        p.wait_drained().await;

        let err = p.last_error().unwrap();
        assert!(err.contains("timeout"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn callback_change_requires_quiescence() {
        let p = pipeline(2, Duration::from_secs(1));
        let (cb, _seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        assert!(matches!(
            p.install_callback(None),
            Err(Error::IncorrectApiUse(_))
        ));

        p.dispatch(&json!({"r": 0}));
        assert!(p.install_callback(None).is_ok());
        assert!(!p.callback_installed());
    }

    #[tokio::test]
    async fn reset_clears_sticky_error_but_keeps_callback() {
        let p = pipeline(2, Duration::from_secs(1));
        let (cb, _seen) = collector();
        p.install_callback(Some(cb)).unwrap();

        assert!(p.reserve("0").await.unwrap());
        p.dispatch(&json!({"success": false, "msg": "boom"}));
        assert!(p.last_error().is_some());

        p.reset(4);
        assert_eq!(p.last_error(), None);
        assert_eq!(p.outstanding(), 0);
        assert!(p.callback_installed());
    }

    #[tokio::test]
    async fn submit_after_healthy_stop_resumes() {
        let p = pipeline(2, Duration::from_secs(1));
        p.install_callback(Some(collector().0)).unwrap();

        p.request_stop();
        assert!(p.reserve("0").await.unwrap());
        assert_eq!(p.outstanding(), 1);
    }
}
