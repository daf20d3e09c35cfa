//! Device registry
//!
//! One registry lives for one capture session. Devices are keyed by
//! `(protocol, identifier)`; each protocol namespace has its own lock so
//! check-then-create cannot race with a concurrent capture path that
//! shares the registry.

pub mod device;
pub mod fingerprint;

pub use device::{Device, DeviceSummary};
pub use fingerprint::{Fingerprinter, Matcher, Signature, Trait};

use crate::errors::{parse_protocol, Result, SnoutError};
use log::debug;
use snout_common::Protocol;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Free-form device attributes; later writes win per key.
pub type Attributes = HashMap<String, serde_json::Value>;

#[derive(Default)]
struct Namespace {
    by_id: HashMap<String, Arc<Device>>,
    devices: Vec<Arc<Device>>,
}

pub struct DeviceRegistry {
    namespaces: HashMap<Protocol, Mutex<Namespace>>,
    fingerprints: Arc<Fingerprinter>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::with_fingerprints(Fingerprinter::default())
    }

    pub fn with_fingerprints(fingerprints: Fingerprinter) -> Self {
        Self {
            namespaces: Protocol::ALL
                .iter()
                .map(|p| (*p, Mutex::new(Namespace::default())))
                .collect(),
            fingerprints: Arc::new(fingerprints),
        }
    }

    fn namespace(&self, protocol: Protocol) -> MutexGuard<'_, Namespace> {
        // every protocol is inserted at construction
        self.namespaces[&protocol]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the device known under `id`, creating it on first sight.
    /// On a hit `attributes` are merged into the existing device.
    pub fn get_unique(&self, protocol: Protocol, id: &str, attributes: Attributes) -> Arc<Device> {
        let mut ns = self.namespace(protocol);
        if let Some(device) = ns.by_id.get(id) {
            device.update(attributes);
            return Arc::clone(device);
        }
        self.insert(&mut ns, protocol, id, attributes)
    }

    /// Same as [`get_unique`](Self::get_unique) for a protocol given as text.
    pub fn get_unique_named(
        &self,
        protocol: &str,
        id: &str,
        attributes: Attributes,
    ) -> Result<Arc<Device>> {
        let protocol = parse_protocol(protocol)?;
        Ok(self.get_unique(protocol, id, attributes))
    }

    /// Creates a device, failing if `id` is already taken.
    pub fn register(
        &self,
        protocol: Protocol,
        id: &str,
        attributes: Attributes,
    ) -> Result<Arc<Device>> {
        let mut ns = self.namespace(protocol);
        if let Some(existing) = ns.by_id.get(id) {
            return Err(SnoutError::DuplicateDevice {
                protocol,
                id: id.to_string(),
                existing: existing.id(),
            });
        }
        Ok(self.insert(&mut ns, protocol, id, attributes))
    }

    fn insert(
        &self,
        ns: &mut Namespace,
        protocol: Protocol,
        id: &str,
        attributes: Attributes,
    ) -> Arc<Device> {
        let device = Arc::new(Device::new(
            protocol,
            id.to_string(),
            attributes,
            Arc::clone(&self.fingerprints),
        ));
        ns.by_id.insert(id.to_string(), Arc::clone(&device));
        ns.devices.push(Arc::clone(&device));
        debug!("new {} device {}", protocol, id);
        device
    }

    pub fn known(&self, protocol: Protocol, id: &str) -> Option<Arc<Device>> {
        self.namespace(protocol).by_id.get(id).cloned()
    }

    /// Makes `new_id` the current identifier of `device`, keeping the old
    /// ones resolvable. Used to follow devices that rotate their address.
    pub fn reassign_identifier(&self, device: &Arc<Device>, new_id: &str) -> Result<()> {
        let protocol = device.protocol();
        let mut ns = self.namespace(protocol);
        let owner = ns.by_id.get(new_id).cloned();
        match owner {
            Some(owner) if !Arc::ptr_eq(&owner, device) => Err(SnoutError::DuplicateDevice {
                protocol,
                id: new_id.to_string(),
                existing: owner.id(),
            }),
            Some(_) if device.id() == new_id => Ok(()),
            _ => {
                ns.by_id.insert(new_id.to_string(), Arc::clone(device));
                device.push_id(new_id.to_string());
                Ok(())
            }
        }
    }

    /// Point-in-time snapshot in creation order.
    pub fn devices(&self, protocol: Protocol) -> Vec<Arc<Device>> {
        self.namespace(protocol).devices.clone()
    }

    /// Devices that sent at least one message, most recently seen first.
    pub fn recent_devices(&self, protocol: Protocol) -> Vec<Arc<Device>> {
        let mut devices: Vec<_> = self
            .devices(protocol)
            .into_iter()
            .filter(|d| d.occurrences() > 0)
            .collect();
        devices.sort_by(|a, b| b.last_seen().total_cmp(&a.last_seen()));
        devices
    }

    pub fn len(&self, protocol: Protocol) -> usize {
        self.namespace(protocol).devices.len()
    }

    pub fn is_empty(&self) -> bool {
        Protocol::ALL.iter().all(|p| self.len(*p) == 0)
    }

    pub fn fingerprints(&self) -> &Fingerprinter {
        &self.fingerprints
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
