//! In-memory [`DeviceCatalog`] seeded at startup.

use std::collections::HashMap;

use halux_domain::device::Device;

use crate::ports::DeviceCatalog;

/// Device catalog built once from configuration and read-only afterwards.
///
/// Later records win when the seed holds the same id twice.
#[derive(Debug, Default)]
pub struct InMemoryDeviceCatalog {
    devices: HashMap<String, Device>,
}

impl InMemoryDeviceCatalog {
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<Device> for InMemoryDeviceCatalog {
    fn from_iter<I: IntoIterator<Item = Device>>(iter: I) -> Self {
        let devices = iter
            .into_iter()
            .map(|device| (device.id.clone(), device))
            .collect();
        Self { devices }
    }
}

impl DeviceCatalog for InMemoryDeviceCatalog {
    fn find(&self, device_id: &str) -> Option<Device> {
        self.devices.get(device_id).cloned()
    }
}
