//! EMM UE Context
//!
//! Per-UE mobility context held by the MME, plus the store resolving a UE
//! identifier to its context.
//!
//! The identity fields (`imsi`, `imei`, `guti`) are written by the
//! identification procedure on completion; the security context is read-only
//! input used to protect outgoing requests. Each context owns its T3470
//! instance, so an armed timer can never outlive the context it belongs to.

use std::collections::HashMap;

use epcsim_common::types::{Guti, Imei, Imsi, UeId};

use crate::timer::{EmmTimer, DEFAULT_T3470_INTERVAL, TIMER_T3470};

/// EPS NAS security context (read-only input for message protection).
///
/// Only the fields the EMM procedures consume; key material and the full
/// security-mode state live with the security procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityContext {
    /// Key set identifier (eKSI)
    pub ksi: u8,
    /// Downlink NAS count
    pub dl_count: u32,
    /// Uplink NAS count
    pub ul_count: u32,
}

/// Per-UE EMM context.
#[derive(Debug)]
pub struct EmmContext {
    /// UE identifier (store key)
    ue_id: UeId,
    /// Permanent subscriber identity, once known
    pub imsi: Option<Imsi>,
    /// Equipment identity, once known
    pub imei: Option<Imei>,
    /// Assigned temporary identity, once known
    pub guti: Option<Guti>,
    /// Current NAS security context, if one has been established
    pub security: Option<SecurityContext>,
    /// Whether the UE is currently attached
    pub is_attached: bool,
    /// T3470 identification retransmission timer
    pub t3470: EmmTimer,
}

impl EmmContext {
    /// Creates a fresh context with the given T3470 interval.
    pub fn new(ue_id: UeId, t3470_interval_secs: u32) -> Self {
        Self {
            ue_id,
            imsi: None,
            imei: None,
            guti: None,
            security: None,
            is_attached: false,
            t3470: EmmTimer::new(TIMER_T3470, t3470_interval_secs),
        }
    }

    /// Returns the UE identifier.
    pub fn ue_id(&self) -> UeId {
        self.ue_id
    }
}

impl Default for EmmContext {
    fn default() -> Self {
        Self::new(UeId(0), DEFAULT_T3470_INTERVAL)
    }
}

/// Store resolving UE identifiers to EMM contexts.
///
/// Map-backed; whether contexts sit in a fixed array or a map is internal to
/// this store, callers only ever use the `get`/`get_mut` capability.
#[derive(Debug, Default)]
pub struct EmmContextStore {
    contexts: HashMap<UeId, EmmContext>,
}

impl EmmContextStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a context, replacing any previous context for the same UE.
    pub fn insert(&mut self, context: EmmContext) {
        self.contexts.insert(context.ue_id(), context);
    }

    /// Resolves a UE identifier to its context.
    pub fn get(&self, ue_id: UeId) -> Option<&EmmContext> {
        self.contexts.get(&ue_id)
    }

    /// Resolves a UE identifier to its context, mutably.
    pub fn get_mut(&mut self, ue_id: UeId) -> Option<&mut EmmContext> {
        self.contexts.get_mut(&ue_id)
    }

    /// Removes and returns the context for a UE.
    pub fn remove(&mut self, ue_id: UeId) -> Option<EmmContext> {
        self.contexts.remove(&ue_id)
    }

    /// Returns true if a context exists for the UE.
    pub fn contains(&self, ue_id: UeId) -> bool {
        self.contexts.contains_key(&ue_id)
    }

    /// Iterates over all contexts, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EmmContext> {
        self.contexts.values_mut()
    }

    /// Returns the number of stored contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context() {
        let ctx = EmmContext::new(UeId(7), 6);
        assert_eq!(ctx.ue_id(), UeId(7));
        assert!(ctx.imsi.is_none());
        assert!(ctx.imei.is_none());
        assert!(ctx.guti.is_none());
        assert!(!ctx.is_attached);
        assert!(!ctx.t3470.is_running());
        assert_eq!(ctx.t3470.interval(), 6);
    }

    #[test]
    fn test_store_get_and_remove() {
        let mut store = EmmContextStore::new();
        assert!(store.is_empty());

        store.insert(EmmContext::new(UeId(1), 6));
        store.insert(EmmContext::new(UeId(2), 6));
        assert_eq!(store.len(), 2);
        assert!(store.contains(UeId(1)));
        assert!(store.get(UeId(3)).is_none());

        let removed = store.remove(UeId(1)).unwrap();
        assert_eq!(removed.ue_id(), UeId(1));
        assert!(!store.contains(UeId(1)));
    }

    #[test]
    fn test_store_get_mut() {
        let mut store = EmmContextStore::new();
        store.insert(EmmContext::new(UeId(5), 6));

        store.get_mut(UeId(5)).unwrap().is_attached = true;
        assert!(store.get(UeId(5)).unwrap().is_attached);
    }
}
