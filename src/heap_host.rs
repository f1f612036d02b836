//! An in-process host backed by the Rust heap.
//!
//! [`HeapHost`] keeps every string in a registry keyed by handle and
//! reference-counts them the way an embedding runtime would. It is a real
//! host for in-process use, the executable form of the contract in
//! [`host`](crate::host), and the harness the tests lean on: touching a
//! handle whose count already reached zero panics immediately instead of
//! silently reading freed storage, and handle values are never reused, so a
//! stale token can never alias a live string.
//!
//! The `fail_next_*` switches arm a single failure of the matching host
//! call, which is how the soft and hard failure paths get exercised without
//! a real runtime running out of resources.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::host::{Handle, HostEnv, StringEnv};

/// Error for a refused string creation.
///
/// Real hosts refuse creation under resource exhaustion; this host refuses
/// only when [`HeapHost::fail_next_create`] armed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocFailed;

impl fmt::Display for AllocFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("host string allocation failed")
    }
}

impl std::error::Error for AllocFailed {}

/// Stored representation of one host string.
#[derive(Debug, PartialEq, Eq)]
enum StrData {
    Utf16(Box<[u16]>),
    Bytes(Box<[u8]>),
}

#[derive(Debug)]
struct HostString {
    data: StrData,
    refs: usize,
}

#[derive(Debug, Default)]
struct Registry {
    strings: HashMap<u64, HostString>,
    last_id: u64,
}

/// A host environment over heap-allocated strings.
#[derive(Debug, Default)]
pub struct HeapHost {
    registry: Mutex<Registry>,
    fail_create: AtomicBool,
    fail_durable: AtomicBool,
    fail_local: AtomicBool,
}

impl HeapHost {
    /// An empty host with no strings and no armed failures.
    pub fn new() -> HeapHost {
        HeapHost::default()
    }

    /// Number of distinct strings still alive.
    pub fn live_strings(&self) -> usize {
        self.registry.lock().strings.len()
    }

    /// Outstanding references summed over all live strings.
    pub fn live_refs(&self) -> usize {
        self.registry.lock().strings.values().map(|s| s.refs).sum()
    }

    /// Arm exactly one failure of the next `create`, either encoding.
    pub fn fail_next_create(&self) {
        self.fail_create.store(true, Ordering::Relaxed);
    }

    /// Arm exactly one failure of the next `acquire_durable`.
    pub fn fail_next_durable(&self) {
        self.fail_durable.store(true, Ordering::Relaxed);
    }

    /// Arm exactly one failure of the next `acquire_local`.
    pub fn fail_next_local(&self) {
        self.fail_local.store(true, Ordering::Relaxed);
    }

    fn create_entry(&self, data: StrData) -> Result<Handle, AllocFailed> {
        if self.fail_create.swap(false, Ordering::Relaxed) {
            return Err(AllocFailed);
        }
        let mut registry = self.registry.lock();
        registry.last_id += 1;
        // Ids start at 1 and are never reused; a wrapped counter shows up
        // as exhaustion rather than an aliased handle.
        let handle = Handle::from_raw(registry.last_id).ok_or(AllocFailed)?;
        registry
            .strings
            .insert(handle.raw(), HostString { data, refs: 1 });
        Ok(handle)
    }

    fn add_ref(&self, handle: Handle) -> Handle {
        let mut registry = self.registry.lock();
        let Some(string) = registry.strings.get_mut(&handle.raw()) else {
            panic!("acquire of released handle {handle:?}");
        };
        string.refs += 1;
        handle
    }
}

impl HostEnv for HeapHost {
    fn acquire_durable(&self, handle: Handle) -> Option<Handle> {
        if self.fail_durable.swap(false, Ordering::Relaxed) {
            return None;
        }
        Some(self.add_ref(handle))
    }

    fn acquire_local(&self, handle: Handle) -> Option<Handle> {
        if self.fail_local.swap(false, Ordering::Relaxed) {
            return None;
        }
        Some(self.add_ref(handle))
    }

    fn release(&self, handle: Handle) {
        let mut registry = self.registry.lock();
        let Some(string) = registry.strings.get_mut(&handle.raw()) else {
            panic!("release of released handle {handle:?}");
        };
        string.refs -= 1;
        if string.refs == 0 {
            registry.strings.remove(&handle.raw());
        }
    }
}

impl StringEnv<u16> for HeapHost {
    type Error = AllocFailed;

    fn create(&self, units: &[u16]) -> Result<Handle, AllocFailed> {
        self.create_entry(StrData::Utf16(units.into()))
    }

    fn value_equals(&self, handle: Handle, units: &[u16]) -> bool {
        let registry = self.registry.lock();
        match registry.strings.get(&handle.raw()) {
            Some(HostString {
                data: StrData::Utf16(stored),
                ..
            }) => stored.as_ref() == units,
            Some(_) => false,
            None => panic!("equality check on released handle {handle:?}"),
        }
    }
}

impl StringEnv<u8> for HeapHost {
    type Error = AllocFailed;

    fn create(&self, bytes: &[u8]) -> Result<Handle, AllocFailed> {
        self.create_entry(StrData::Bytes(bytes.into()))
    }

    fn value_equals(&self, handle: Handle, bytes: &[u8]) -> bool {
        let registry = self.registry.lock();
        match registry.strings.get(&handle.raw()) {
            Some(HostString {
                data: StrData::Bytes(stored),
                ..
            }) => stored.as_ref() == bytes,
            Some(_) => false,
            None => panic!("equality check on released handle {handle:?}"),
        }
    }
}
