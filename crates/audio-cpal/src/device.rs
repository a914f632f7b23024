use cpal::traits::{DeviceTrait, HostTrait};
use taperec_audio_core::BackendError;

/// Get the default input device of the default host
pub fn default_input_device() -> Result<cpal::Device, BackendError> {
    let host = cpal::default_host();
    host.default_input_device()
        .ok_or(BackendError::NoDeviceFound)
}

/// Name of the default input device, for logging and diagnostics
pub fn default_input_device_name() -> Result<String, BackendError> {
    default_input_device()?
        .name()
        .map_err(|e| BackendError::Device(e.to_string()))
}
