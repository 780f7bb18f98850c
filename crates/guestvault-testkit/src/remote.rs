//! Scripted and gated remote sync handlers

use async_trait::async_trait;
use guestvault_core::{GuestRecord, RecordId, RemoteSyncEffects, VaultError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug)]
struct RemoteState {
    script: VecDeque<Result<(), VaultError>>,
    fallback_ok: bool,
    pushed: Vec<GuestRecord>,
}

/// Remote that replays scripted outcomes and records every push
///
/// Once the script is exhausted every push uses the fallback outcome.
#[derive(Debug, Clone)]
pub struct ScriptedRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl ScriptedRemote {
    fn with_fallback(fallback_ok: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(RemoteState {
                script: VecDeque::new(),
                fallback_ok,
                pushed: Vec::new(),
            })),
        }
    }

    /// Every push succeeds
    pub fn succeeding() -> Self {
        Self::with_fallback(true)
    }

    /// Every push fails
    pub fn failing() -> Self {
        Self::with_fallback(false)
    }

    /// Queue the next `n` pushes to fail
    pub fn fail_next(&self, n: usize) -> &Self {
        let mut state = self.state.lock();
        for _ in 0..n {
            state
                .script
                .push_back(Err(VaultError::sync("scripted remote failure")));
        }
        self
    }

    /// Queue the next push to succeed
    pub fn succeed_next(&self) -> &Self {
        self.state.lock().script.push_back(Ok(()));
        self
    }

    /// Change the outcome used after the script runs out
    pub fn set_fallback(&self, ok: bool) {
        self.state.lock().fallback_ok = ok;
    }

    /// Number of push attempts so far
    pub fn push_count(&self) -> usize {
        self.state.lock().pushed.len()
    }

    /// Attempts for one record
    pub fn pushes_for(&self, id: RecordId) -> usize {
        self.state
            .lock()
            .pushed
            .iter()
            .filter(|record| record.id == id)
            .count()
    }

    /// Snapshot of every record pushed, in order
    pub fn pushed(&self) -> Vec<GuestRecord> {
        self.state.lock().pushed.clone()
    }
}

#[async_trait]
impl RemoteSyncEffects for ScriptedRemote {
    async fn push_record(&self, record: &GuestRecord) -> Result<(), VaultError> {
        let mut state = self.state.lock();
        state.pushed.push(record.clone());
        match state.script.pop_front() {
            Some(outcome) => outcome,
            None if state.fallback_ok => Ok(()),
            None => Err(VaultError::sync("remote unavailable")),
        }
    }
}

#[derive(Debug, Default)]
struct Gate {
    entered: Notify,
    release: Notify,
    pushes: AtomicUsize,
}

/// Remote that parks every push until the test releases it
///
/// Lets a test act while an attempt is in flight. Released pushes succeed.
#[derive(Debug, Clone, Default)]
pub struct GatedRemote {
    gate: Arc<Gate>,
}

impl GatedRemote {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a push is parked at the gate
    pub async fn entered(&self) {
        self.gate.entered.notified().await;
    }

    /// Let one parked push finish
    pub fn release(&self) {
        self.gate.release.notify_one();
    }

    /// Number of pushes that reached the gate
    pub fn push_count(&self) -> usize {
        self.gate.pushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSyncEffects for GatedRemote {
    async fn push_record(&self, _record: &GuestRecord) -> Result<(), VaultError> {
        self.gate.pushes.fetch_add(1, Ordering::SeqCst);
        self.gate.entered.notify_one();
        self.gate.release.notified().await;
        Ok(())
    }
}
