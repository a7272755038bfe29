//! Identification Procedure
//!
//! This module implements the network-side identification procedure as
//! defined in 3GPP TS 24.301 Section 5.4.4.
//!
//! The network initiates the procedure by sending an Identity Request
//! message to the UE and starting timer T3470 (Section 5.4.4.2). Upon
//! receiving the Identity Response, the MME stops T3470 and records the
//! disclosed identity (Section 5.4.4.4). On T3470 expiry the request is
//! retransmitted; when the retransmission counter is exceeded the MME aborts
//! the procedure and notifies the owning EMM procedure of the failure
//! (Section 5.4.4.6, case b).
//!
//! The begin / retransmit / complete / abort shape implemented here is the
//! generic EMM common-procedure lifecycle; authentication and security mode
//! control run the same engine with different request/response payloads.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use epcsim_common::types::{Guti, Imei, Imsi, UeId};

use super::context::EmmContextStore;
use super::registry::{
    CommonProcedure, ProcedureCallbacks, ProcedureEntry, RegistryError,
};
use super::sap::{EmmSapPrimitive, NasSecurityData, SapDispatch, SapError};
use super::EmmLayer;

/// Maximum number of Identity Request transmissions before the procedure is
/// aborted (initial send plus four retransmissions).
pub const IDENTIFICATION_COUNTER_MAX: u32 = 5;

/// Identity parameter requested from the UE.
///
/// 3GPP TS 24.301 Section 9.9.3.17 (Identity type 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityType {
    /// Permanent subscriber identity
    Imsi,
    /// Equipment identity
    Imei,
    /// Equipment identity with software version
    ImeiSv,
    /// Temporary identity
    Tmsi,
}

impl std::fmt::Display for IdentityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityType::Imsi => write!(f, "IMSI"),
            IdentityType::Imei => write!(f, "IMEI"),
            IdentityType::ImeiSv => write!(f, "IMEISV"),
            IdentityType::Tmsi => write!(f, "TMSI"),
        }
    }
}

/// Identity disclosed by the UE in an Identity Response.
///
/// Exactly one identity kind per response; the variant makes "more than one
/// supplied" unrepresentable. A TMSI response carries only the M-TMSI short
/// identifier; the stored GUTI is composed with this MME's configured
/// GUMMEI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileIdentity {
    /// Permanent subscriber identity
    Imsi(Imsi),
    /// Equipment identity
    Imei(Imei),
    /// MME-local temporary identifier
    Tmsi(u32),
}

/// Retransmission state of one in-flight identification procedure.
///
/// Created by `begin_identification`, owned by the registry entry while the
/// procedure is in flight, and dropped on the terminal transition that
/// removes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentificationData {
    /// UE the procedure runs for
    ue_id: UeId,
    /// Retransmission counter (0 ..= IDENTIFICATION_COUNTER_MAX)
    retransmission_count: u32,
    /// Requested identity parameter
    identity_type: IdentityType,
    /// Whether an abort must notify the owner of the failure.
    ///
    /// Set only on retry exhaustion; external cancellation aborts silently.
    notify_failure: bool,
}

impl IdentificationData {
    /// Creates fresh retransmission state for a new procedure.
    pub fn new(ue_id: UeId, identity_type: IdentityType) -> Self {
        Self {
            ue_id,
            retransmission_count: 0,
            identity_type,
            notify_failure: false,
        }
    }

    /// Returns the UE identifier.
    pub fn ue_id(&self) -> UeId {
        self.ue_id
    }

    /// Returns the requested identity type.
    pub fn identity_type(&self) -> IdentityType {
        self.identity_type
    }

    /// Returns the retransmission counter.
    pub fn retransmission_count(&self) -> u32 {
        self.retransmission_count
    }

    /// Increments the retransmission counter.
    pub fn increment_retransmission_count(&mut self) {
        self.retransmission_count += 1;
    }

    /// Returns whether an abort must notify the owner.
    pub fn notify_failure(&self) -> bool {
        self.notify_failure
    }

    /// Marks the procedure so that its abort notifies the owner.
    pub fn set_notify_failure(&mut self) {
        self.notify_failure = true;
    }
}

/// Error type for the identification procedure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentificationError {
    /// No EMM context exists for the UE.
    #[error("no EMM context for {0}")]
    UnknownUe(UeId),
    /// Another common procedure is already in flight for the UE.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The SAP rejected a primitive.
    #[error(transparent)]
    Sap(#[from] SapError),
}

impl<S: SapDispatch> EmmLayer<S> {
    /// Initiates an identification procedure for a UE.
    ///
    /// Registers the procedure with the common-procedure registry, sends the
    /// first Identity Request and, once that send is accepted, notifies the
    /// owner layer that the common procedure has started.
    ///
    /// Fails without partial state if no EMM context exists for the UE or if
    /// another common procedure is already in flight. A rejected initial
    /// send is returned as an error with the registration left in place and
    /// no timer armed; the caller owns the consequence.
    pub fn begin_identification(
        &mut self,
        ue_id: UeId,
        identity_type: IdentityType,
        callbacks: ProcedureCallbacks,
    ) -> Result<(), IdentificationError> {
        info!("EMM-PROC - Initiate identification type = {identity_type} ({ue_id})");

        if !self.contexts.contains(ue_id) {
            return Err(IdentificationError::UnknownUe(ue_id));
        }

        let data = IdentificationData::new(ue_id, identity_type);
        self.procedures.register(
            ue_id,
            ProcedureEntry {
                procedure: CommonProcedure::Identification(data),
                callbacks,
            },
        )?;

        send_identity_request(&mut self.sap, &mut self.contexts, ue_id, identity_type)?;

        self.sap.send(EmmSapPrimitive::ProcedureStarted { ue_id })?;
        Ok(())
    }

    /// Completes the identification procedure with the identity the UE
    /// disclosed.
    ///
    /// Stops T3470, records the identity in the EMM context and confirms the
    /// common procedure to the owner. If no EMM context exists the procedure
    /// is rejected instead. A completion for a UE with a context but no
    /// pending procedure is a no-op, so late responses after a terminal
    /// transition are harmless.
    pub fn complete_identification(
        &mut self,
        ue_id: UeId,
        identity: MobileIdentity,
    ) -> Result<(), IdentificationError> {
        info!("EMM-PROC - Identification complete ({ue_id})");

        // Release the retransmission bookkeeping; an absent entry only means
        // there is nothing to free.
        let entry = self.procedures.take(ue_id);

        let Some(ctx) = self.contexts.get_mut(ue_id) else {
            error!("EMM-PROC - No EMM context exists ({ue_id})");
            self.sap.send(EmmSapPrimitive::ProcedureRejected { ue_id })?;
            if let Some(mut entry) = entry {
                (entry.callbacks.on_reject)(ue_id);
            }
            return Ok(());
        };

        let Some(mut entry) = entry else {
            debug!("EMM-PROC - No pending identification for {ue_id}, ignoring");
            return Ok(());
        };

        info!("EMM-PROC - Stop timer {} ({ue_id})", ctx.t3470);
        ctx.t3470.stop();

        match identity {
            MobileIdentity::Imsi(imsi) => ctx.imsi = Some(imsi),
            MobileIdentity::Imei(imei) => ctx.imei = Some(imei),
            MobileIdentity::Tmsi(m_tmsi) => {
                ctx.guti = Some(Guti::new(self.config.gummei(), m_tmsi));
            }
        }

        let is_attached = ctx.is_attached;
        self.sap.send(EmmSapPrimitive::ProcedureConfirmed {
            ue_id,
            is_attached,
        })?;
        (entry.callbacks.on_success)(ue_id, is_attached);
        Ok(())
    }

    /// Handles a T3470 expiry for a UE.
    ///
    /// Retransmits the Identity Request while the retransmission counter is
    /// below the maximum; otherwise aborts the procedure with failure
    /// notification. An expiry for a UE with no pending procedure is a
    /// no-op.
    pub fn handle_t3470_expiry(&mut self, ue_id: UeId) -> Result<(), IdentificationError> {
        let resend_type = {
            let Some(entry) = self.procedures.get_mut(ue_id) else {
                debug!("EMM-PROC - T3470 expiry for {ue_id} with no pending procedure, ignoring");
                return Ok(());
            };
            let CommonProcedure::Identification(data) = &mut entry.procedure;

            data.increment_retransmission_count();
            warn!(
                "EMM-PROC - T3470 timer expired, retransmission counter = {} ({ue_id})",
                data.retransmission_count()
            );

            if data.retransmission_count() < IDENTIFICATION_COUNTER_MAX {
                Some(data.identity_type())
            } else {
                data.set_notify_failure();
                None
            }
        };

        match resend_type {
            Some(identity_type) => {
                // The timer drives resends unconditionally: a rejected send
                // is surfaced but the rearmed timer retries on next expiry.
                send_identity_request(&mut self.sap, &mut self.contexts, ue_id, identity_type)
            }
            None => match self.procedures.take(ue_id) {
                Some(entry) => abort_identification(&mut self.sap, &mut self.contexts, entry),
                None => Ok(()),
            },
        }
    }

    /// Aborts the in-flight common procedure for a UE, if any.
    ///
    /// This is the entry point bound at registration time, invoked when the
    /// owning outer procedure is torn down. The procedure kind tag selects
    /// the teardown path. Idempotent: a second abort finds no entry and
    /// no-ops.
    pub fn abort_common_procedure(&mut self, ue_id: UeId) -> Result<(), IdentificationError> {
        match self.procedures.take(ue_id) {
            Some(entry) => match entry.procedure {
                CommonProcedure::Identification(_) => {
                    abort_identification(&mut self.sap, &mut self.contexts, entry)
                }
            },
            None => {
                debug!("EMM-PROC - No common procedure to abort for {ue_id}");
                Ok(())
            }
        }
    }
}

/// Sends an Identity Request to the UE and arms T3470.
///
/// The request carries the requested identity type and protection metadata
/// snapshotted from the UE's security context. On an accepted send the
/// timer is started if inactive (first send) or restarted for the same
/// interval (retransmission) - the timer state alone distinguishes the two.
fn send_identity_request<S: SapDispatch>(
    sap: &mut S,
    contexts: &mut EmmContextStore,
    ue_id: UeId,
    identity_type: IdentityType,
) -> Result<(), IdentificationError> {
    let ctx = contexts
        .get_mut(ue_id)
        .ok_or(IdentificationError::UnknownUe(ue_id))?;

    let security = ctx.security.as_ref().map(NasSecurityData::from);
    sap.send(EmmSapPrimitive::IdentityRequest {
        ue_id,
        identity_type,
        security,
    })?;

    if ctx.t3470.is_running() {
        ctx.t3470.restart();
        debug!("EMM-PROC - T3470 restarted ({ue_id})");
    } else {
        ctx.t3470.start();
        debug!("EMM-PROC - T3470 started ({ue_id})");
    }
    info!(
        "EMM-PROC - Timer {} expires in {} seconds ({ue_id})",
        ctx.t3470.code(),
        ctx.t3470.interval()
    );
    Ok(())
}

/// Tears down an identification procedure.
///
/// Stops T3470 if still armed and, when the failure flag is set (retry
/// exhaustion), emits the rejected primitive and invokes the owner's failure
/// callback. Without the flag (external cancellation) the teardown is
/// silent: the caller already knows it is tearing the procedure down.
fn abort_identification<S: SapDispatch>(
    sap: &mut S,
    contexts: &mut EmmContextStore,
    entry: ProcedureEntry,
) -> Result<(), IdentificationError> {
    let CommonProcedure::Identification(data) = entry.procedure;
    let mut callbacks = entry.callbacks;
    let ue_id = data.ue_id();

    warn!("EMM-PROC - Abort identification procedure ({ue_id})");

    if let Some(ctx) = contexts.get_mut(ue_id) {
        if ctx.t3470.is_running() {
            info!("EMM-PROC - Stop timer {} ({ue_id})", ctx.t3470);
            ctx.t3470.stop();
        }
    }

    if data.notify_failure() {
        sap.send(EmmSapPrimitive::ProcedureRejected { ue_id })?;
        (callbacks.on_failure)(ue_id);
    }
    Ok(())
}
