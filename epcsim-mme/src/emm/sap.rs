//! EMM Service Access Point
//!
//! Typed primitives the EMM procedures hand to the rest of the stack, and
//! the dispatch seam they go through. The EMM-AS side (Identity Request
//! towards the UE) and the EMM-REG side (procedure lifecycle notifications
//! towards the owning procedure layer) share the single `send` operation, as
//! in the original SAP design; message encoding and delivery are the
//! receiver's concern.

use thiserror::Error;

use epcsim_common::types::UeId;

use super::context::SecurityContext;
use super::identification::IdentityType;

/// Security metadata attached to a protected downlink NAS request.
///
/// A read-only snapshot taken from the UE's security context at send time;
/// the context itself is never mutated by the sending procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NasSecurityData {
    /// Key set identifier (eKSI)
    pub ksi: u8,
    /// Downlink NAS count to stamp into the message
    pub dl_count: u32,
}

impl From<&SecurityContext> for NasSecurityData {
    fn from(security: &SecurityContext) -> Self {
        Self {
            ksi: security.ksi,
            dl_count: security.dl_count,
        }
    }
}

/// Primitives dispatched by the EMM common procedures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmmSapPrimitive {
    /// Send an Identity Request message to the UE (EMM-AS).
    IdentityRequest {
        /// Target UE
        ue_id: UeId,
        /// Requested identity parameter
        identity_type: IdentityType,
        /// Protection metadata, if a security context exists
        security: Option<NasSecurityData>,
    },
    /// A common procedure has been initiated for the UE (EMM-REG).
    ProcedureStarted {
        /// UE the procedure runs for
        ue_id: UeId,
    },
    /// A common procedure completed successfully (EMM-REG).
    ProcedureConfirmed {
        /// UE the procedure ran for
        ue_id: UeId,
        /// Attachment state reported back to the owner
        is_attached: bool,
    },
    /// A common procedure was rejected or failed (EMM-REG).
    ProcedureRejected {
        /// UE the procedure ran for
        ue_id: UeId,
    },
}

impl EmmSapPrimitive {
    /// Returns the UE this primitive concerns.
    pub fn ue_id(&self) -> UeId {
        match self {
            EmmSapPrimitive::IdentityRequest { ue_id, .. }
            | EmmSapPrimitive::ProcedureStarted { ue_id }
            | EmmSapPrimitive::ProcedureConfirmed { ue_id, .. }
            | EmmSapPrimitive::ProcedureRejected { ue_id } => *ue_id,
        }
    }
}

/// Error type for SAP dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SapError {
    /// The receiving side rejected or could not accept the primitive.
    #[error("SAP dispatch failed for {0}")]
    Dispatch(UeId),
}

/// Dispatch seam for EMM-SAP primitives.
///
/// Implementations must not block; a primitive is either accepted for
/// delivery or rejected with an error, synchronously.
pub trait SapDispatch {
    /// Hands one primitive to the rest of the stack.
    fn send(&mut self, primitive: EmmSapPrimitive) -> Result<(), SapError>;
}

/// SAP dispatcher backed by a tokio channel.
///
/// Used by the task wiring: primitives are forwarded to whatever task owns
/// the receiving end (the access-stratum simulator, a test harness, ...).
#[derive(Debug, Clone)]
pub struct ChannelSapDispatch {
    tx: tokio::sync::mpsc::UnboundedSender<EmmSapPrimitive>,
}

impl ChannelSapDispatch {
    /// Creates a dispatcher and the receiving end of its channel.
    pub fn new() -> (
        Self,
        tokio::sync::mpsc::UnboundedReceiver<EmmSapPrimitive>,
    ) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SapDispatch for ChannelSapDispatch {
    fn send(&mut self, primitive: EmmSapPrimitive) -> Result<(), SapError> {
        let ue_id = primitive.ue_id();
        self.tx
            .send(primitive)
            .map_err(|_| SapError::Dispatch(ue_id))
    }
}

/// Recording dispatcher for tests and offline runs.
///
/// Stores every accepted primitive; `reject_sends` makes every send fail,
/// for exercising the dispatch-failure paths.
#[derive(Debug, Default)]
pub struct RecordingSapDispatch {
    /// Primitives accepted so far, in dispatch order
    pub sent: Vec<EmmSapPrimitive>,
    /// When true, every send is rejected
    pub reject_sends: bool,
}

impl RecordingSapDispatch {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded primitives matching a predicate.
    pub fn filter<'a>(
        &'a self,
        predicate: impl Fn(&EmmSapPrimitive) -> bool + 'a,
    ) -> impl Iterator<Item = &'a EmmSapPrimitive> {
        self.sent.iter().filter(move |p| predicate(p))
    }
}

impl SapDispatch for RecordingSapDispatch {
    fn send(&mut self, primitive: EmmSapPrimitive) -> Result<(), SapError> {
        if self.reject_sends {
            return Err(SapError::Dispatch(primitive.ue_id()));
        }
        self.sent.push(primitive);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_ue_id() {
        let prim = EmmSapPrimitive::ProcedureConfirmed {
            ue_id: UeId(9),
            is_attached: true,
        };
        assert_eq!(prim.ue_id(), UeId(9));
    }

    #[test]
    fn test_recording_dispatch() {
        let mut sap = RecordingSapDispatch::new();
        sap.send(EmmSapPrimitive::ProcedureStarted { ue_id: UeId(1) })
            .unwrap();
        assert_eq!(sap.sent.len(), 1);

        sap.reject_sends = true;
        let err = sap
            .send(EmmSapPrimitive::ProcedureStarted { ue_id: UeId(2) })
            .unwrap_err();
        assert_eq!(err, SapError::Dispatch(UeId(2)));
        assert_eq!(sap.sent.len(), 1);
    }

    #[tokio::test]
    async fn test_channel_dispatch() {
        let (mut sap, mut rx) = ChannelSapDispatch::new();
        sap.send(EmmSapPrimitive::ProcedureRejected { ue_id: UeId(3) })
            .unwrap();

        let prim = rx.recv().await.unwrap();
        assert_eq!(prim, EmmSapPrimitive::ProcedureRejected { ue_id: UeId(3) });

        // Dropping the receiver makes subsequent sends fail
        drop(rx);
        assert!(sap
            .send(EmmSapPrimitive::ProcedureStarted { ue_id: UeId(4) })
            .is_err());
    }
}
