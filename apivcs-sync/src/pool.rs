//! Bounded worker pool for remote calls.
//!
//! Workers pull jobs from a shared queue and send `(key, job, result)` over an
//! `mpsc` channel. The calling thread is the only consumer of that channel and
//! the only writer of the result map, so no outcome is ever shared mutably.
//! Jobs still queued when the cancel token trips are answered with
//! [`RemoteError::Cancelled`] without invoking the call.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{mpsc, Mutex};
use std::thread;

use apivcs_core::ProjectKey;

use crate::api::{CancelToken, RemoteError};

/// Result of one job, keyed by project.
pub(crate) type JobResults<J> = BTreeMap<ProjectKey, (J, Result<(), RemoteError>)>;

/// Run `call` over `jobs` on at most `workers` threads.
pub(crate) fn run_jobs<J, F>(
    jobs: Vec<(ProjectKey, J)>,
    workers: usize,
    cancel: &CancelToken,
    call: F,
) -> JobResults<J>
where
    J: Send,
    F: Fn(&ProjectKey, &J) -> Result<(), RemoteError> + Sync,
{
    let mut results = BTreeMap::new();
    if jobs.is_empty() {
        return results;
    }

    let workers = workers.clamp(1, jobs.len());
    let queue = Mutex::new(jobs.into_iter().collect::<VecDeque<_>>());
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let queue = &queue;
            let call = &call;
            scope.spawn(move || loop {
                let next = queue
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .pop_front();
                let Some((key, job)) = next else { break };

                let result = if cancel.is_cancelled() {
                    Err(RemoteError::Cancelled)
                } else {
                    call(&key, &job)
                };
                if tx.send((key, job, result)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (key, job, result) in rx {
            results.insert(key, (job, result));
        }
    });

    results
}
