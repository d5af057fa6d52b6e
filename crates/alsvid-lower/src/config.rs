//! Simulator configuration record.
//!
//! Three knobs (method, device, precision) rendered to the string
//! tokens the runtime's `state-configure` entry expects. The record is
//! serde-derived so drivers can load it straight from a JSON config file.

use serde::{Deserialize, Serialize};

use crate::error::LowerResult;

/// Simulation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Dense statevector simulation.
    #[default]
    Statevector,
    /// Density-matrix simulation.
    DensityMatrix,
    /// Matrix-product-state simulation.
    MatrixProductState,
}

impl Method {
    /// The token the runtime expects.
    pub fn token(self) -> &'static str {
        match self {
            Method::Statevector => "statevector",
            Method::DensityMatrix => "density_matrix",
            Method::MatrixProductState => "matrix_product_state",
        }
    }
}

/// Execution device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    /// Host CPU.
    #[default]
    Cpu,
    /// GPU offload.
    Gpu,
}

impl Device {
    /// The token the runtime expects.
    pub fn token(self) -> &'static str {
        match self {
            Device::Cpu => "CPU",
            Device::Gpu => "GPU",
        }
    }
}

/// Floating-point precision of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// 32-bit floats.
    Single,
    /// 64-bit floats.
    #[default]
    Double,
}

impl Precision {
    /// The token the runtime expects.
    pub fn token(self) -> &'static str {
        match self {
            Precision::Single => "single",
            Precision::Double => "double",
        }
    }
}

/// The simulator configuration consumed by the lowering's system-init
/// rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulation method.
    pub method: Method,
    /// Execution device.
    pub device: Device,
    /// Floating-point precision.
    pub precision: Precision,
}

impl SimulatorConfig {
    /// Create a configuration from explicit knobs.
    pub fn new(method: Method, device: Device, precision: Precision) -> Self {
        Self {
            method,
            device,
            precision,
        }
    }

    /// Parse a configuration from its JSON rendering.
    pub fn from_json(json: &str) -> LowerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tokens() {
        let cfg = SimulatorConfig::default();
        assert_eq!(cfg.method.token(), "statevector");
        assert_eq!(cfg.device.token(), "CPU");
        assert_eq!(cfg.precision.token(), "double");
    }

    #[test]
    fn test_from_json() {
        let cfg = SimulatorConfig::from_json(
            r#"{"method":"density_matrix","device":"gpu","precision":"single"}"#,
        )
        .unwrap();
        assert_eq!(cfg.method, Method::DensityMatrix);
        assert_eq!(cfg.device, Device::Gpu);
        assert_eq!(cfg.precision, Precision::Single);
    }

    #[test]
    fn test_from_json_rejects_unknown_method() {
        assert!(SimulatorConfig::from_json(r#"{"method":"noise","device":"cpu"}"#).is_err());
    }
}
