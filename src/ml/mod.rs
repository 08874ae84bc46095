// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, training and decoding code lives here.
//
//   model.rs      — encoder-decoder transformer and the
//                   Seq2SeqModel capability trait
//                   • shared token embedding
//                   • learned source/target positions
//                   • encoder self-attention blocks
//                   • decoder causal self-attention +
//                     cross-attention blocks
//                   • vocabulary projection, masked CE loss
//
//   decoding.rs   — greedy and beam-search generation
//
//   schedule.rs   — linear warmup / linear decay LR
//
//   validator.rs  — mean validation loss
//
//   trainer.rs    — AdamW loop with periodic validation and
//                   best/final checkpointing
//
//   generator.rs  — context → QaPair, with malformed outputs
//                   reported as typed errors
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need
//            Raffel et al. (2020) T5

use serde::{Deserialize, Serialize};

pub mod model;

pub mod decoding;

pub mod schedule;

pub mod validator;

pub mod trainer;

pub mod generator;

/// GPU (or software adapter) backend
pub type WgpuBackend = burn::backend::Wgpu;
/// Pure CPU backend
pub type CpuBackend = burn::backend::NdArray;

pub type WgpuTrainBackend = burn::backend::Autodiff<WgpuBackend>;
pub type CpuTrainBackend  = burn::backend::Autodiff<CpuBackend>;

/// Which Burn backend a command runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// wgpu when a hardware adapter is present, otherwise ndarray
    #[default]
    Auto,
    /// Default wgpu adapter
    Wgpu,
    /// ndarray on the CPU
    Cpu,
}

/// Backend a command actually runs on once `Auto` is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendChoice {
    Wgpu,
    Cpu,
}

impl DeviceKind {
    /// Looks for a GPU adapter when the kind is `Auto`.
    pub fn select(self) -> BackendChoice {
        self.select_with(has_gpu_adapter)
    }

    /// `adapter_present` only runs for `Auto`.
    pub fn select_with(self, adapter_present: impl FnOnce() -> bool) -> BackendChoice {
        match self {
            DeviceKind::Wgpu => BackendChoice::Wgpu,
            DeviceKind::Cpu  => BackendChoice::Cpu,
            DeviceKind::Auto => {
                if adapter_present() {
                    BackendChoice::Wgpu
                } else {
                    tracing::warn!("No GPU adapter found, falling back to the ndarray CPU backend");
                    BackendChoice::Cpu
                }
            }
        }
    }
}

/// True when wgpu can see a non-CPU adapter. Burn panics on the first
/// tensor allocation if there is none, so this runs before any backend
/// is built.
pub fn has_gpu_adapter() -> bool {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    instance
        .enumerate_adapters(wgpu::Backends::all())
        .iter()
        .map(|adapter| adapter.get_info())
        .inspect(|info| tracing::debug!("Found adapter {} ({:?}, {:?})", info.name, info.device_type, info.backend))
        .any(|info| info.device_type != wgpu::DeviceType::Cpu)
}

pub fn wgpu_device() -> burn::backend::wgpu::WgpuDevice {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    device
}

pub fn cpu_device() -> burn::backend::ndarray::NdArrayDevice {
    tracing::info!("Using ndarray CPU device");
    burn::backend::ndarray::NdArrayDevice::Cpu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_falls_back_to_cpu_without_adapter() {
        assert_eq!(DeviceKind::Auto.select_with(|| false), BackendChoice::Cpu);
        assert_eq!(DeviceKind::Auto.select_with(|| true), BackendChoice::Wgpu);
    }

    #[test]
    fn test_explicit_kinds_skip_adapter_lookup() {
        let lookup = || -> bool { panic!("adapter lookup must not run for an explicit device") };
        assert_eq!(DeviceKind::Wgpu.select_with(lookup), BackendChoice::Wgpu);
        assert_eq!(DeviceKind::Cpu.select_with(lookup), BackendChoice::Cpu);
    }

    #[test]
    fn test_auto_is_the_default_and_parses() {
        assert_eq!(DeviceKind::default(), DeviceKind::Auto);
        let kind: DeviceKind = serde_json::from_str(r#""auto""#).unwrap();
        assert_eq!(kind, DeviceKind::Auto);
    }
}
