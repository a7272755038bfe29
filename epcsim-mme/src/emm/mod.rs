//! EPS Mobility Management
//!
//! Network-side EMM layer: per-UE mobility contexts, the common-procedure
//! registry and the common procedures themselves (currently identification,
//! 3GPP TS 24.301 Section 5.4.4), dispatching their effects through the
//! EMM-SAP seam.

pub mod context;
pub mod identification;
pub mod registry;
pub mod sap;

pub use context::{EmmContext, EmmContextStore, SecurityContext};
pub use identification::{
    IdentificationData, IdentificationError, IdentityType, MobileIdentity,
    IDENTIFICATION_COUNTER_MAX,
};
pub use registry::{
    CommonProcedure, CommonProcedureRegistry, ProcedureCallbacks, ProcedureEntry, RegistryError,
};
pub use sap::{
    ChannelSapDispatch, EmmSapPrimitive, NasSecurityData, RecordingSapDispatch, SapDispatch,
    SapError,
};

use tracing::{error, info};

use epcsim_common::types::UeId;
use epcsim_common::MmeConfig;

/// The MME-side EMM layer.
///
/// Owns the UE context store, the common-procedure registry and the SAP
/// dispatcher, and runs the EMM procedure state machines over them. All
/// events for a UE (procedure initiation, UE responses, timer expiries,
/// aborts) are delivered through `&mut self` methods on the owning event
/// loop, so per-UE event handling is serialized by construction.
pub struct EmmLayer<S: SapDispatch> {
    /// MME configuration (network identity, timer intervals)
    config: MmeConfig,
    /// Per-UE mobility contexts
    contexts: EmmContextStore,
    /// In-flight common procedures
    procedures: CommonProcedureRegistry,
    /// EMM-SAP dispatch seam
    sap: S,
}

impl<S: SapDispatch> EmmLayer<S> {
    /// Creates an EMM layer with no UE contexts.
    pub fn new(config: MmeConfig, sap: S) -> Self {
        Self {
            config,
            contexts: EmmContextStore::new(),
            procedures: CommonProcedureRegistry::new(),
            sap,
        }
    }

    /// Admits a UE: creates a fresh EMM context with the configured timer
    /// intervals, replacing any previous context for the same identifier.
    pub fn add_ue(&mut self, ue_id: UeId) {
        info!("EMM-CTX - Create EMM context ({ue_id})");
        self.contexts
            .insert(EmmContext::new(ue_id, self.config.t3470_interval_secs));
    }

    /// Removes a UE and aborts any common procedure still in flight for it.
    pub fn remove_ue(&mut self, ue_id: UeId) {
        if let Err(err) = self.abort_common_procedure(ue_id) {
            error!("EMM-CTX - Abort on removal failed for {ue_id}: {err}");
        }
        if self.contexts.remove(ue_id).is_some() {
            info!("EMM-CTX - Release EMM context ({ue_id})");
        }
    }

    /// Advances every armed timer and handles the expiries.
    ///
    /// Called once per second by the owning event loop. Failures are per-UE:
    /// an error handling one UE's expiry never prevents the others from
    /// being handled.
    pub fn perform_tick(&mut self) {
        let expired: Vec<UeId> = self
            .contexts
            .iter_mut()
            .filter_map(|ctx| ctx.t3470.perform_tick().then(|| ctx.ue_id()))
            .collect();

        for ue_id in expired {
            if let Err(err) = self.handle_t3470_expiry(ue_id) {
                error!("EMM-PROC - T3470 expiry handling failed for {ue_id}: {err}");
            }
        }
    }

    /// Returns the MME configuration.
    pub fn config(&self) -> &MmeConfig {
        &self.config
    }

    /// Returns the UE context store.
    pub fn contexts(&self) -> &EmmContextStore {
        &self.contexts
    }

    /// Returns the UE context store, mutably.
    pub fn contexts_mut(&mut self) -> &mut EmmContextStore {
        &mut self.contexts
    }

    /// Returns the common-procedure registry.
    pub fn procedures(&self) -> &CommonProcedureRegistry {
        &self.procedures
    }

    /// Returns the SAP dispatcher.
    pub fn sap(&self) -> &S {
        &self.sap
    }

    /// Returns the SAP dispatcher, mutably.
    pub fn sap_mut(&mut self) -> &mut S {
        &mut self.sap
    }
}
