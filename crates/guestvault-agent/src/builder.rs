//! Service builder
//!
//! Every collaborator except the record store has a default: the system
//! clock, a disconnected remote, an online connectivity signal, and a fresh
//! event bus. Tests swap in simulated pieces through the `with_*` methods.

use guestvault_core::{
    Connectivity, EventBus, RecordStore, RemoteSyncEffects, SystemClock, TimeSource, VaultConfig,
    VaultError,
};
use guestvault_sync::DisconnectedRemote;
use std::sync::Arc;

use crate::GuestDataService;

/// Builder for [`GuestDataService`]
#[derive(Default)]
pub struct GuestDataServiceBuilder {
    config: Option<VaultConfig>,
    store: Option<Arc<dyn RecordStore>>,
    remote: Option<Arc<dyn RemoteSyncEffects>>,
    clock: Option<Arc<dyn TimeSource>>,
    connectivity: Option<Connectivity>,
    events: Option<EventBus>,
}

impl GuestDataServiceBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    pub fn with_config(mut self, config: VaultConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the record store
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the remote sync collaborator
    pub fn with_remote(mut self, remote: Arc<dyn RemoteSyncEffects>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Set the time source
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share a connectivity signal with the host
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Share an event bus with the host
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Validate the configuration and assemble the service
    pub fn build(self) -> Result<GuestDataService, VaultError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let store = self
            .store
            .ok_or_else(|| VaultError::invalid("record store is required"))?;

        Ok(GuestDataService::assemble(
            config,
            store,
            self.remote.unwrap_or_else(|| Arc::new(DisconnectedRemote)),
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.connectivity.unwrap_or_default(),
            self.events.unwrap_or_default(),
        ))
    }
}
