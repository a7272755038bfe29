//! Common Procedure Registry
//!
//! Process-wide table tracking, per UE, the single in-flight abortable EMM
//! common procedure together with the owning procedure's callbacks. The
//! registry is the arbitration point enforcing "at most one identification
//! procedure per UE": registration fails while an entry exists, and every
//! terminal transition removes the entry, so a late event for an
//! already-terminated procedure finds nothing and no-ops.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use epcsim_common::types::UeId;

use super::identification::IdentificationData;

/// Callback invoked when the procedure completes successfully.
///
/// Receives the UE identifier and its current attachment state.
pub type SuccessCallback = Box<dyn FnMut(UeId, bool) + Send>;
/// Callback invoked when the procedure is rejected.
pub type RejectCallback = Box<dyn FnMut(UeId) + Send>;
/// Callback invoked when the procedure fails (e.g., retry exhaustion).
pub type FailureCallback = Box<dyn FnMut(UeId) + Send>;

/// Callback set supplied by the owning procedure at registration time.
///
/// At most one of the three is invoked per procedure instance, on its first
/// terminal transition.
pub struct ProcedureCallbacks {
    /// Invoked on successful completion
    pub on_success: SuccessCallback,
    /// Invoked on reject (e.g., no EMM context at completion time)
    pub on_reject: RejectCallback,
    /// Invoked on failure (retry exhaustion)
    pub on_failure: FailureCallback,
}

impl ProcedureCallbacks {
    /// Creates a callback set that does nothing; useful for owners that only
    /// observe the EMM-REG primitives.
    pub fn noop() -> Self {
        Self {
            on_success: Box::new(|_, _| {}),
            on_reject: Box::new(|_| {}),
            on_failure: Box::new(|_| {}),
        }
    }
}

impl fmt::Debug for ProcedureCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProcedureCallbacks { .. }")
    }
}

/// The in-flight common procedure, tagged by kind.
///
/// Each kind carries its own strongly-typed retransmission state; the tag
/// selects the abort entry point when the registry tears a procedure down.
/// Sibling common procedures (authentication, security mode control) add
/// their variants here.
#[derive(Debug)]
pub enum CommonProcedure {
    /// Identification procedure (TS 24.301 §5.4.4)
    Identification(IdentificationData),
}

/// Registry entry: the procedure state plus its owner's callbacks.
#[derive(Debug)]
pub struct ProcedureEntry {
    /// In-flight procedure, tagged by kind
    pub procedure: CommonProcedure,
    /// Owner callbacks bound at registration time
    pub callbacks: ProcedureCallbacks,
}

/// Error type for registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A common procedure is already registered for this UE.
    #[error("a common procedure is already in progress for {0}")]
    AlreadyInProgress(UeId),
}

/// Table of in-flight common procedures, keyed by UE identifier.
#[derive(Debug, Default)]
pub struct CommonProcedureRegistry {
    entries: HashMap<UeId, ProcedureEntry>,
}

impl CommonProcedureRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a procedure for a UE.
    ///
    /// Fails without touching the existing entry if one is already in
    /// flight for the same UE.
    pub fn register(&mut self, ue_id: UeId, entry: ProcedureEntry) -> Result<(), RegistryError> {
        if self.entries.contains_key(&ue_id) {
            return Err(RegistryError::AlreadyInProgress(ue_id));
        }
        self.entries.insert(ue_id, entry);
        Ok(())
    }

    /// Returns the entry for a UE, mutably, if one is in flight.
    pub fn get_mut(&mut self, ue_id: UeId) -> Option<&mut ProcedureEntry> {
        self.entries.get_mut(&ue_id)
    }

    /// Removes and returns the entry for a UE.
    ///
    /// Returning `None` for an unknown UE is how late events for an
    /// already-terminated procedure become no-ops.
    pub fn take(&mut self, ue_id: UeId) -> Option<ProcedureEntry> {
        self.entries.remove(&ue_id)
    }

    /// Returns true if a procedure is in flight for the UE.
    pub fn contains(&self, ue_id: UeId) -> bool {
        self.entries.contains_key(&ue_id)
    }

    /// Returns the number of in-flight procedures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no procedure is in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emm::identification::IdentityType;

    fn entry_for(ue_id: UeId) -> ProcedureEntry {
        ProcedureEntry {
            procedure: CommonProcedure::Identification(IdentificationData::new(
                ue_id,
                IdentityType::Imsi,
            )),
            callbacks: ProcedureCallbacks::noop(),
        }
    }

    #[test]
    fn test_register_and_take() {
        let mut registry = CommonProcedureRegistry::new();
        assert!(registry.is_empty());

        registry.register(UeId(1), entry_for(UeId(1))).unwrap();
        assert!(registry.contains(UeId(1)));
        assert_eq!(registry.len(), 1);

        let entry = registry.take(UeId(1)).unwrap();
        let CommonProcedure::Identification(data) = entry.procedure;
        assert_eq!(data.ue_id(), UeId(1));
        assert!(registry.take(UeId(1)).is_none());
    }

    #[test]
    fn test_single_flight_enforced() {
        let mut registry = CommonProcedureRegistry::new();
        registry.register(UeId(2), entry_for(UeId(2))).unwrap();

        let err = registry.register(UeId(2), entry_for(UeId(2))).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyInProgress(UeId(2)));
        // The original entry survives the failed registration
        assert!(registry.contains(UeId(2)));
    }

    #[test]
    fn test_get_mut_updates_in_place() {
        let mut registry = CommonProcedureRegistry::new();
        registry.register(UeId(3), entry_for(UeId(3))).unwrap();

        {
            let entry = registry.get_mut(UeId(3)).unwrap();
            let CommonProcedure::Identification(data) = &mut entry.procedure;
            data.increment_retransmission_count();
        }

        let entry = registry.take(UeId(3)).unwrap();
        let CommonProcedure::Identification(data) = entry.procedure;
        assert_eq!(data.retransmission_count(), 1);
    }
}
