#![forbid(unsafe_code)]

//! The deferred outcome of a form operation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::LocalBoxFuture;

enum State {
    Ready(bool),
    Waiting(LocalBoxFuture<'static, bool>),
    Done,
}

/// Resolves to whether the operation left its target valid.
///
/// Every synchronous effect of the operation (document write, flags,
/// cascade) has already happened when a `Pending` is returned. Awaiting it
/// only waits for validation. Dropping it abandons the validation result
/// but not the write.
#[must_use = "a Pending resolves to the validation outcome"]
pub struct Pending {
    state: State,
}

impl Pending {
    pub(crate) fn ready(valid: bool) -> Self {
        Self {
            state: State::Ready(valid),
        }
    }

    pub(crate) fn new(future: impl Future<Output = bool> + 'static) -> Self {
        Self {
            state: State::Waiting(future.boxed_local()),
        }
    }

    /// Whether the outcome is known without polling.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }
}

impl Future for Pending {
    type Output = bool;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(valid) => {
                let valid = *valid;
                this.state = State::Done;
                Poll::Ready(valid)
            }
            State::Waiting(future) => match future.poll_unpin(cx) {
                Poll::Ready(valid) => {
                    this.state = State::Done;
                    Poll::Ready(valid)
                }
                Poll::Pending => Poll::Pending,
            },
            State::Done => panic!("Pending polled after completion"),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Ready(valid) => format!("Ready({valid})"),
            State::Waiting(_) => "Waiting".to_string(),
            State::Done => "Done".to_string(),
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}
