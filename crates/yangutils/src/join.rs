// Copyright (C) 2025-present The NetGauze Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Join point for a batch of concurrently running requests.
//!
//! Every request is registered with [`RequestJoin::spawn_request`] and
//! releases its registration when its [`RequestHandle`] is removed or
//! dropped. [`RequestJoin::wait_for`] resolves once nothing is outstanding
//! or when the join timeout elapses, whichever comes first.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, warn};

pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(180);

pub type RequestId = u64;

type Outstanding = BTreeMap<RequestId, Box<str>>;

/// Result handed to the [`RequestJoin::wait_for`] callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Completed,
    /// Tags of the requests that were still running
    TimedOut { pending: Vec<String> },
}

impl JoinOutcome {
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[derive(Debug, Clone)]
pub struct RequestJoin {
    outstanding: Arc<watch::Sender<Outstanding>>,
    next_id: Arc<AtomicU64>,
    timeout: Duration,
}

impl Default for RequestJoin {
    fn default() -> Self {
        Self::new(DEFAULT_JOIN_TIMEOUT)
    }
}

impl RequestJoin {
    pub fn new(timeout: Duration) -> Self {
        let (tx, _) = watch::channel(Outstanding::new());
        Self {
            outstanding: Arc::new(tx),
            next_id: Arc::new(AtomicU64::new(0)),
            timeout,
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Register a new outstanding request
    pub fn spawn_request(&self, tag: impl Into<String>) -> RequestHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tag = tag.into();
        debug!(request = id, tag = tag.as_str(), "request spawned");
        self.outstanding.send_modify(|x| {
            x.insert(id, tag.into_boxed_str());
        });
        RequestHandle {
            id,
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Mark the request as finished
    pub fn remove_request(&self, handle: RequestHandle) {
        drop(handle)
    }

    /// Number of requests still running
    pub fn outstanding(&self) -> usize {
        self.outstanding.borrow().len()
    }

    /// Wait until every request finished or the timeout elapsed, then call
    /// `callback` exactly once.
    pub async fn wait_for<F, T>(&self, callback: F) -> T
    where
        F: FnOnce(JoinOutcome) -> T,
    {
        let mut rx = self.outstanding.subscribe();
        let completed = tokio::time::timeout(self.timeout, rx.wait_for(|x| x.is_empty()))
            .await
            .is_ok_and(|x| x.is_ok());
        let outcome = if completed {
            JoinOutcome::Completed
        } else {
            let pending = self
                .outstanding
                .borrow()
                .values()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            warn!(
                timeout = ?self.timeout,
                pending = ?pending,
                "timed out waiting for outstanding requests"
            );
            JoinOutcome::TimedOut { pending }
        };
        callback(outcome)
    }
}

/// Registration of a single outstanding request, released on drop
#[derive(Debug)]
pub struct RequestHandle {
    id: RequestId,
    outstanding: Arc<watch::Sender<Outstanding>>,
}

impl RequestHandle {
    pub const fn id(&self) -> RequestId {
        self.id
    }
}

impl Drop for RequestHandle {
    fn drop(&mut self) {
        let id = self.id;
        self.outstanding.send_if_modified(|x| x.remove(&id).is_some());
    }
}
