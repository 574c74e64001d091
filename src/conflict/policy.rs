//! Primary device classification.

/// Decides whether a device is primary.
///
/// A primary device is trusted over others when punches from several
/// devices collide. Any `Fn(u64) -> bool` closure is a policy.
///
/// # Example
///
/// ```
/// use punch_integrity::conflict::{DeviceIdThreshold, PrimaryDevicePolicy};
///
/// let threshold = DeviceIdThreshold { below: 1000 };
/// assert!(threshold.is_primary(500));
/// assert!(!threshold.is_primary(1500));
///
/// let allow_list = |device_id: u64| [7, 9].contains(&device_id);
/// assert!(allow_list.is_primary(9));
/// ```
pub trait PrimaryDevicePolicy: Send + Sync {
    /// Returns true if `device_id` is a primary device.
    fn is_primary(&self, device_id: u64) -> bool;
}

/// Devices whose ID is below a fixed threshold are primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceIdThreshold {
    /// Exclusive upper bound on primary device IDs.
    pub below: u64,
}

impl Default for DeviceIdThreshold {
    fn default() -> Self {
        Self { below: 1000 }
    }
}

impl PrimaryDevicePolicy for DeviceIdThreshold {
    fn is_primary(&self, device_id: u64) -> bool {
        device_id < self.below
    }
}

impl<F> PrimaryDevicePolicy for F
where
    F: Fn(u64) -> bool + Send + Sync,
{
    fn is_primary(&self, device_id: u64) -> bool {
        self(device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = DeviceIdThreshold::default();
        assert!(policy.is_primary(999));
        assert!(!policy.is_primary(1000));
    }

    #[test]
    fn test_closure_policy() {
        let policy = |device_id: u64| device_id % 2 == 0;
        assert!(policy.is_primary(4));
        assert!(!policy.is_primary(5));
    }
}
