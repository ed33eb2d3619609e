//! Device catalog port: read-only device lookup for handlers.

use halux_domain::device::Device;

/// Looks devices up by the id carried in topic addresses.
///
/// The core never writes to the catalog; storage belongs to whichever
/// collaborator implements this trait.
pub trait DeviceCatalog: Send + Sync {
    /// Return the device registered under `device_id`, if any.
    fn find(&self, device_id: &str) -> Option<Device>;
}

impl<T: DeviceCatalog + ?Sized> DeviceCatalog for std::sync::Arc<T> {
    fn find(&self, device_id: &str) -> Option<Device> {
        (**self).find(device_id)
    }
}
