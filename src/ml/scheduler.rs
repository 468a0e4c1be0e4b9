// ============================================================
// Layer 5 — Learning-Rate Schedule
// ============================================================
// Gradual warmup wrapper around a secondary decay schedule:
//
//   warmup region  (epoch <= warmup_epoch):
//       lr ramps linearly from base_lr / multiplier at epoch 0
//       up to base_lr at warmup_epoch
//   post-warmup    (epoch >  warmup_epoch):
//       the wrapped schedule takes over, evaluated at
//       epoch - warmup_epoch
//
// Burn optimizers take the learning rate per step, so the
// scheduler holds no optimizer reference — its full state
// (nested schedule included) serializes with serde and is
// written next to the model checkpoint each epoch.
//
// Reference: Goyal et al. (2017) Accurate, Large Minibatch SGD

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::infra::config::ConfigError;

// ─── DecaySchedule ────────────────────────────────────────────────────────────
/// The secondary schedule delegated to after warmup. Both
/// variants are pure functions of the (offset) epoch, so their
/// "state" is just their parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecaySchedule {
    /// Multiply the rate by `gamma` at every milestone epoch.
    MultiStep { milestones: Vec<usize>, gamma: f64 },

    /// Cosine annealing from the base rate down to `eta_min`
    /// over `t_max` epochs.
    Cosine { t_max: usize, eta_min: f64 },
}

impl DecaySchedule {
    /// Rate at `epoch` (already offset past the warmup region).
    fn lr_at(&self, base_lr: f64, epoch: usize) -> f64 {
        match self {
            DecaySchedule::MultiStep { milestones, gamma } => {
                let passed = milestones.iter().filter(|&&m| epoch >= m).count();
                base_lr * gamma.powi(passed as i32)
            }
            DecaySchedule::Cosine { t_max, eta_min } => {
                let t = (epoch.min(*t_max)) as f64 / *t_max as f64;
                eta_min + (base_lr - eta_min) * (1.0 + (PI * t).cos()) / 2.0
            }
        }
    }
}

// ─── GradualWarmupScheduler ───────────────────────────────────────────────────
/// Epoch-stepped learning-rate state machine. `lr()` reads the
/// current rate; `step()` advances one epoch and returns the new
/// rate. Stepped exactly once per training epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradualWarmupScheduler {
    base_lr:      f64,
    multiplier:   f64,
    warmup_epoch: usize,
    last_epoch:   usize,
    after:        DecaySchedule,
}

impl GradualWarmupScheduler {
    /// Construction fails when `multiplier <= 1` — the warmup
    /// would not ramp upward.
    pub fn new(
        base_lr:      f64,
        multiplier:   f64,
        warmup_epoch: usize,
        after:        DecaySchedule,
    ) -> Result<Self, ConfigError> {
        if multiplier <= 1.0 {
            return Err(ConfigError::Validation(
                "scheduler multiplier must be greater than 1".into(),
            ));
        }
        Ok(Self { base_lr, multiplier, warmup_epoch, last_epoch: 0, after })
    }

    /// Rate at an arbitrary epoch, without touching the counter.
    pub fn lr_at(&self, epoch: usize) -> f64 {
        if epoch > self.warmup_epoch {
            self.after.lr_at(self.base_lr, epoch - self.warmup_epoch)
        } else if self.warmup_epoch == 0 {
            // Degenerate warmup: no ramp, straight to base rate.
            self.base_lr
        } else {
            self.base_lr / self.multiplier
                * ((self.multiplier - 1.0) * epoch as f64 / self.warmup_epoch as f64 + 1.0)
        }
    }

    /// Rate for the current epoch.
    pub fn lr(&self) -> f64 {
        self.lr_at(self.last_epoch)
    }

    /// Advance one epoch and return the new rate.
    pub fn step(&mut self) -> f64 {
        self.last_epoch += 1;
        self.lr()
    }

    /// Epoch the scheduler currently sits at.
    pub fn last_epoch(&self) -> usize {
        self.last_epoch
    }

    /// Jump to a specific epoch (used when resuming training).
    pub fn set_epoch(&mut self, epoch: usize) {
        self.last_epoch = epoch;
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn multistep() -> DecaySchedule {
        DecaySchedule::MultiStep { milestones: vec![10, 20], gamma: 0.1 }
    }

    #[test]
    fn test_multiplier_at_most_one_is_rejected() {
        assert!(GradualWarmupScheduler::new(0.1, 1.0, 5, multistep()).is_err());
        assert!(GradualWarmupScheduler::new(0.1, 0.5, 5, multistep()).is_err());
        assert!(GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).is_ok());
    }

    #[test]
    fn test_warmup_endpoints() {
        // multiplier=2, warmup_epoch=5, base_lr=0.1
        //   epoch 0 → 0.05, epoch 5 → 0.1
        let sched = GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).unwrap();
        assert!((sched.lr_at(0) - 0.05).abs() < 1e-12);
        assert!((sched.lr_at(5) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_warmup_is_linear() {
        let sched = GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).unwrap();
        for epoch in 0..=5 {
            let expected = 0.05 + 0.05 * epoch as f64 / 5.0;
            assert!((sched.lr_at(epoch) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_post_warmup_delegates_with_offset() {
        let sched = GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).unwrap();
        // epoch 6 → multistep at offset 1 → no milestone passed
        assert!((sched.lr_at(6) - 0.1).abs() < 1e-12);
        // epoch 15 → offset 10 → first milestone passed
        assert!((sched.lr_at(15) - 0.01).abs() < 1e-12);
        // epoch 25 → offset 20 → both milestones passed
        assert!((sched.lr_at(25) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_delegation() {
        let after = DecaySchedule::Cosine { t_max: 10, eta_min: 0.0 };
        let sched = GradualWarmupScheduler::new(0.1, 2.0, 5, after).unwrap();
        // offset 0 → full rate, offset t_max → eta_min
        assert!((sched.lr_at(5) - 0.1).abs() < 1e-12);
        assert!(sched.lr_at(15).abs() < 1e-12);
        // offset t_max/2 → halfway point of the cosine
        assert!((sched.lr_at(10) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_step_advances_counter() {
        let mut sched = GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).unwrap();
        assert!((sched.lr() - 0.05).abs() < 1e-12);
        let lr = sched.step();
        assert_eq!(sched.last_epoch(), 1);
        assert!((lr - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_state_round_trip_reproduces_schedule() {
        let mut sched = GradualWarmupScheduler::new(0.1, 2.0, 5, multistep()).unwrap();
        for _ in 0..3 {
            sched.step();
        }

        let json = serde_json::to_string(&sched).unwrap();
        let restored: GradualWarmupScheduler = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, sched);

        // Identical schedule for all subsequent epochs.
        let mut a = sched;
        let mut b = restored;
        for _ in 0..40 {
            assert_eq!(a.step().to_bits(), b.step().to_bits());
        }
    }
}
