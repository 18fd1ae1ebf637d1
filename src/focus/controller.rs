use anyhow::{anyhow, Result};

/// Significant bits kept in the sign-change history.
pub const HISTORY_MASK: u8 = 0x7;

/// History pattern that marks a peak: three consecutive drops in sharpness.
pub const STABLE_PATTERN: u8 = 0b111;

/// Lens sweep parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutofocusConfig {
    /// Lens position at the start of every episode.
    pub initial_position: f32,
    /// Lens travel per searching frame.
    pub step: f32,
}

impl Default for AutofocusConfig {
    fn default() -> Self {
        Self {
            initial_position: 0.0,
            step: 0.1,
        }
    }
}

/// Mutable search state of one autofocus episode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutofocusState {
    pub lens_position: f32,
    /// Last three "sharpness dropped" bits, newest in bit 0.
    pub history: u8,
    pub past_sharpness: f32,
    pub max_sharpness_seen: f32,
    pub lens_position_at_max: f32,
    pub is_stable: bool,
    pub is_fixed: bool,
}

impl AutofocusState {
    pub fn new(initial_position: f32) -> Self {
        Self {
            lens_position: initial_position,
            history: 0,
            past_sharpness: 0.0,
            max_sharpness_seen: 0.0,
            lens_position_at_max: initial_position,
            is_stable: false,
            is_fixed: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusPhase {
    /// Sweeping the lens, hunting for the sharpness peak.
    Searching,
    /// Peak found and lens parked; nothing moves until the next episode.
    StableLocked,
}

/// Lens command produced by one controller update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LensCommand {
    /// Keep sweeping: move to this position.
    Advance(f32),
    /// Peak found: final move to the best-seen position.
    Park(f32),
    /// Episode already finished.
    Hold,
}

impl LensCommand {
    /// Position the actuator should move to, if any.
    pub fn target(self) -> Option<f32> {
        match self {
            LensCommand::Advance(position) | LensCommand::Park(position) => Some(position),
            LensCommand::Hold => None,
        }
    }
}

/// Hill-climb autofocus over a scalar sharpness signal.
///
/// The lens sweeps in one direction by a fixed step while the controller
/// watches the sign of successive sharpness differences. Three drops in a row
/// mean the peak has been passed; the lens is then parked at the position
/// where the highest sharpness was observed and the episode ends.
///
/// The search assumes sharpness rises and then falls along the sweep. Scenes
/// with several sharpness peaks (objects at different depths) lock onto the
/// first peak reached.
#[derive(Clone, Debug)]
pub struct AutofocusController {
    config: AutofocusConfig,
    state: AutofocusState,
    episode: u64,
}

impl AutofocusController {
    pub fn new(config: AutofocusConfig) -> Result<Self> {
        if !config.step.is_finite() || config.step <= 0.0 {
            return Err(anyhow!("autofocus step must be a positive finite number"));
        }
        if !config.initial_position.is_finite() {
            return Err(anyhow!("autofocus initial position must be finite"));
        }
        Ok(Self {
            config,
            state: AutofocusState::new(config.initial_position),
            episode: 1,
        })
    }

    pub fn config(&self) -> &AutofocusConfig {
        &self.config
    }

    pub fn state(&self) -> &AutofocusState {
        &self.state
    }

    /// 1-based counter of search episodes in this session.
    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn phase(&self) -> FocusPhase {
        if self.state.is_fixed {
            FocusPhase::StableLocked
        } else {
            FocusPhase::Searching
        }
    }

    pub fn is_stable(&self) -> bool {
        self.state.is_stable
    }

    pub fn is_fixed(&self) -> bool {
        self.state.is_fixed
    }

    pub fn lens_position(&self) -> f32 {
        self.state.lens_position
    }

    /// Discard the current search and start a new episode from scratch.
    pub fn begin_episode(&mut self) {
        self.state = AutofocusState::new(self.config.initial_position);
        self.episode += 1;
        log::info!(
            "autofocus: episode {} started at lens position {:.3}",
            self.episode,
            self.state.lens_position
        );
    }

    /// Feed one sharpness sample taken at the current lens position.
    pub fn update(&mut self, sharpness: f32) -> LensCommand {
        if self.state.is_fixed {
            return LensCommand::Hold;
        }

        let state = &mut self.state;
        let dropped = sharpness - state.past_sharpness < 0.0;
        state.history = ((state.history << 1) | u8::from(dropped)) & HISTORY_MASK;

        if state.history == STABLE_PATTERN {
            state.is_stable = true;
        }

        if sharpness > state.max_sharpness_seen {
            state.max_sharpness_seen = sharpness;
            state.lens_position_at_max = state.lens_position;
        }

        let command = if state.is_stable {
            state.lens_position = state.lens_position_at_max;
            state.is_fixed = true;
            log::info!(
                "autofocus: locked at lens position {:.3} (sharpness {:.4})",
                state.lens_position_at_max,
                state.max_sharpness_seen
            );
            LensCommand::Park(state.lens_position_at_max)
        } else {
            state.lens_position += self.config.step;
            LensCommand::Advance(state.lens_position)
        };

        state.past_sharpness = sharpness;
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AutofocusController {
        AutofocusController::new(AutofocusConfig::default()).unwrap()
    }

    #[test]
    fn stabilizes_on_third_consecutive_drop_and_parks_at_peak() {
        let mut af = controller();
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0];

        let mut commands = Vec::new();
        for (i, &s) in samples.iter().enumerate() {
            let command = af.update(s);
            if i < 7 {
                assert!(!af.is_stable(), "stable too early at sample {}", i + 1);
                assert!(matches!(command, LensCommand::Advance(_)));
            }
            commands.push(command);
        }

        assert!(af.is_stable());
        assert!(af.is_fixed());
        assert_eq!(af.state().history, STABLE_PATTERN);
        assert_eq!(af.phase(), FocusPhase::StableLocked);
        assert_eq!(af.state().max_sharpness_seen, 5.0);

        let LensCommand::Park(parked) = commands[7] else {
            panic!("expected park, got {:?}", commands[7]);
        };
        assert!((parked - 0.4).abs() < 1e-6, "parked at {parked}");
        assert!((af.lens_position() - 0.4).abs() < 1e-6);

        let LensCommand::Advance(last_search) = commands[6] else {
            panic!("expected advance");
        };
        assert!((last_search - 0.7).abs() < 1e-5);
    }

    #[test]
    fn fixed_controller_holds_and_ignores_samples() {
        let mut af = controller();
        for s in [1.0, 2.0, 1.5, 1.0, 0.5] {
            af.update(s);
        }
        assert!(af.is_fixed());
        let before = *af.state();

        assert_eq!(af.update(100.0), LensCommand::Hold);
        assert_eq!(af.update(0.0), LensCommand::Hold);
        assert_eq!(*af.state(), before);
    }

    #[test]
    fn flat_or_interrupted_drops_do_not_stabilize() {
        let mut af = controller();
        for s in [5.0, 4.0, 3.0, 3.0, 2.0, 1.0, 1.5, 1.0, 0.5] {
            af.update(s);
            assert!(!af.is_stable());
        }
        assert_eq!(af.state().history, 0b011);
        assert_eq!(af.update(0.25), LensCommand::Park(0.0));
    }

    #[test]
    fn history_never_exceeds_three_bits() {
        let mut af = controller();
        let expected = [0b000, 0b001, 0b011, 0b110, 0b101];
        for (s, want) in [1.0, 0.5, 0.25, 2.0, 1.0].into_iter().zip(expected) {
            af.update(s);
            assert_eq!(af.state().history, want);
            assert!(af.state().history <= HISTORY_MASK);
        }
        assert!(!af.is_stable());
    }

    #[test]
    fn new_episode_restores_initial_state() {
        let config = AutofocusConfig {
            initial_position: 0.5,
            step: 0.25,
        };
        let mut af = AutofocusController::new(config).unwrap();
        for s in [1.0, 3.0, 2.0, 1.0, 0.0] {
            af.update(s);
        }
        assert!(af.is_fixed());
        assert_eq!(af.episode(), 1);

        af.begin_episode();

        assert_eq!(*af.state(), AutofocusState::new(0.5));
        assert_eq!(af.episode(), 2);
        assert_eq!(af.phase(), FocusPhase::Searching);
        assert_eq!(af.update(1.0), LensCommand::Advance(0.75));
    }

    #[test]
    fn rejects_non_positive_step() {
        for step in [0.0, -0.1, f32::NAN] {
            let config = AutofocusConfig {
                initial_position: 0.0,
                step,
            };
            assert!(AutofocusController::new(config).is_err());
        }
    }
}
