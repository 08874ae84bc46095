// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// One context in, one question/answer pair out.
//
// Two kinds of failure are kept apart:
//   - outer Result: the checkpoint could not be loaded
//   - inner Result: the model's output was not a valid pair
//     (GenerationError), which the CLI reports as a warning

use anyhow::Result;
use burn::prelude::*;

use crate::domain::{error::GenerationError, qa_pair::QaPair};
use crate::infra::checkpoint::{CheckpointKind, CheckpointManager};
use crate::ml::{
    cpu_device, decoding::DecodingSettings, generator::QaGenerator, wgpu_device, BackendChoice,
    CpuBackend, DeviceKind, WgpuBackend,
};

pub type Generation = std::result::Result<QaPair, GenerationError>;

pub struct GenerateUseCase {
    pub checkpoint_dir: String,
    pub kind:           CheckpointKind,
    pub settings:       DecodingSettings,
    pub device:         DeviceKind,
}

impl GenerateUseCase {
    pub fn execute(&self, context: &str) -> Result<Generation> {
        match self.device.select() {
            BackendChoice::Wgpu => self.execute_on::<WgpuBackend>(context, wgpu_device()),
            BackendChoice::Cpu  => self.execute_on::<CpuBackend>(context, cpu_device()),
        }
    }

    fn execute_on<B: Backend>(&self, context: &str, device: B::Device) -> Result<Generation> {
        let checkpoints = CheckpointManager::new(&self.checkpoint_dir)?;
        let generator   = QaGenerator::<B, _>::from_checkpoint(&checkpoints, self.kind, self.settings, device)?;

        let outcome = generator.generate(context);
        match &outcome {
            Ok(pair) => tracing::debug!("Generated pair: {:?}", pair),
            Err(e)   => tracing::warn!("Generation failed: {}", e),
        }

        // Anything other than a malformed output is a real failure
        match outcome {
            Err(e) if !e.is_malformed() => Err(e.into()),
            other => Ok(other),
        }
    }
}
