/// Device where tensor memory is allocated.
///
/// Memory on [`Device::Cpu`] is host-only and cannot be handed to device kernels. Memory on
/// [`Device::Gpu`] is device-accessible: operators accept it and the kernels enqueued on a
/// stream address it through tensor wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Device {
    /// Host-only memory.
    #[default]
    Cpu,
    /// Device-accessible memory.
    Gpu {
        /// The device ID
        device_id: usize,
    },
}

impl Device {
    /// Creates a GPU device with the specified device ID.
    pub fn gpu(device_id: usize) -> Self {
        Device::Gpu { device_id }
    }

    /// Returns the device type as a string.
    pub fn device_type(&self) -> &str {
        match self {
            Device::Cpu => "cpu",
            Device::Gpu { .. } => "gpu",
        }
    }

    /// Returns the device ID if applicable.
    pub fn device_id(&self) -> Option<usize> {
        match self {
            Device::Cpu => None,
            Device::Gpu { device_id } => Some(*device_id),
        }
    }

    /// Returns true if the device is CPU.
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }

    /// Returns true if memory on this device can be accessed by device kernels.
    pub fn is_device_accessible(&self) -> bool {
        !self.is_cpu()
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu { device_id } => write!(f, "gpu:{device_id}"),
        }
    }
}
