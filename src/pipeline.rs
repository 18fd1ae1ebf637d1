//! Per-frame perception step.
//!
//! `FocusPipeline` runs one frame through the whole core:
//! 1. Decode the detection tensor into a `DetectionBatch`
//! 2. Measure DCT sharpness on the frame's luminance
//! 3. Start a new autofocus episode when a trigger-class object newly appears
//! 4. Step the autofocus controller and forward its lens command
//! 5. Report the capture gate (`has_trigger && is_fixed`)
//!
//! The pipeline owns no camera, model or transport. The caller passes the
//! frame, the tensor produced for it, and the lens actuator on every call.

use anyhow::Result;

use crate::detect::{DecoderConfig, DetectionBatch, DetectionDecoder};
use crate::focus::{
    AutofocusConfig, AutofocusController, FocusMetric, FocusPhase, LensCommand, BLOCK_SIZE,
};
use crate::frame::{Frame, LumaPlane};
use crate::ingest::LensActuator;

/// Outcome of one processed frame.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub sequence: u64,
    pub batch: DetectionBatch,
    pub sharpness: f32,
    /// Command sent to the actuator. `None` when this frame started a new
    /// episode; its sample was taken before the lens returned to the start.
    pub command: Option<LensCommand>,
    pub phase: FocusPhase,
    pub is_stable: bool,
    pub is_fixed: bool,
    /// A trigger-class object appeared and a new episode began.
    pub refocused: bool,
    /// Hand this frame to the encoder and transport.
    pub capture: bool,
}

pub struct FocusPipeline {
    decoder: DetectionDecoder,
    metric: FocusMetric,
    controller: AutofocusController,
    luma: LumaPlane,
    last_trigger: Option<bool>,
}

impl FocusPipeline {
    pub fn new(decoder: DecoderConfig, autofocus: AutofocusConfig) -> Result<Self> {
        Ok(Self {
            decoder: DetectionDecoder::new(decoder)?,
            metric: FocusMetric::new(),
            controller: AutofocusController::new(autofocus)?,
            luma: LumaPlane::default(),
            last_trigger: None,
        })
    }

    pub fn decoder(&self) -> &DetectionDecoder {
        &self.decoder
    }

    pub fn controller(&self) -> &AutofocusController {
        &self.controller
    }

    /// Move the lens to the episode start and signal the sweep. Call once
    /// before the first frame.
    pub fn start(&mut self, actuator: &mut dyn LensActuator) -> Result<()> {
        actuator.trigger_autofocus()?;
        actuator.set_lens_position(self.controller.config().initial_position)?;
        log::info!(
            "pipeline: session started, model {}x{}, lens at {:.3}",
            self.decoder.config().model_width,
            self.decoder.config().model_height,
            self.controller.lens_position()
        );
        Ok(())
    }

    /// Process one frame and the detection tensor inferred from it.
    ///
    /// Fails without touching autofocus state when the tensor or frame is
    /// malformed or the actuator rejects a command; the caller decides
    /// whether to skip the frame.
    pub fn process(
        &mut self,
        frame: &Frame,
        tensor: &[f32],
        actuator: &mut dyn LensActuator,
    ) -> Result<FrameReport> {
        let batch = self.decoder.decode(tensor, frame.width, frame.height)?;
        frame.write_luma(&mut self.luma)?;
        let sharpness = self.metric.measure(&mut self.luma)?;
        log::debug!(
            "frame {}: {} rows, {} scanned, {} candidates, {} kept, sharpness {:.4}",
            frame.sequence,
            batch.stats.rows,
            batch.stats.class_scans,
            batch.stats.candidates,
            batch.stats.survivors,
            sharpness
        );

        let appeared = self.last_trigger == Some(false) && batch.has_trigger;
        let command = if appeared {
            log::info!(
                "pipeline: trigger object appeared at frame {}, refocusing",
                frame.sequence
            );
            self.refocus(actuator)?;
            None
        } else {
            let mut next = self.controller.clone();
            let command = next.update(sharpness);
            if let Some(position) = command.target() {
                actuator.set_lens_position(position)?;
            }
            self.controller = next;
            Some(command)
        };
        self.last_trigger = Some(batch.has_trigger);

        let is_fixed = self.controller.is_fixed();
        Ok(FrameReport {
            sequence: frame.sequence,
            capture: batch.has_trigger && is_fixed,
            batch,
            sharpness,
            command,
            phase: self.controller.phase(),
            is_stable: self.controller.is_stable(),
            is_fixed,
            refocused: appeared,
        })
    }

    /// Start a new autofocus episode: reset the controller, signal the sweep
    /// and return the lens to the initial position.
    ///
    /// Called on the trigger appearance edge and on operator request. State
    /// is only replaced once the actuator has accepted both commands.
    pub fn refocus(&mut self, actuator: &mut dyn LensActuator) -> Result<()> {
        let mut next = self.controller.clone();
        next.begin_episode();
        actuator.trigger_autofocus()?;
        actuator.set_lens_position(next.lens_position())?;
        self.controller = next;
        Ok(())
    }

    /// Per-block sharpness grid of the last processed frame.
    pub fn block_map(&self) -> Result<LumaPlane> {
        self.luma.block_map(BLOCK_SIZE)
    }
}
