// ============================================================
// Layer 5 — Learning Rate Schedule
// ============================================================
// Linear warmup followed by linear decay to zero:
//
//   lr
//   ^      /\
//   |     /  \
//   |    /    \
//   |   /      \
//   +--+--------+----> step
//      0  warmup  total
//
//   step < warmup : base_lr * step / warmup
//   otherwise     : base_lr * (total - step) / (total - warmup)
//
// `step()` returns the rate for the current step and then
// advances, so the first optimiser update uses step 0.

#[derive(Debug, Clone)]
pub struct LinearWarmupSchedule {
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
    current:      usize,
}

impl LinearWarmupSchedule {
    pub fn new(base_lr: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { base_lr, warmup_steps, total_steps, current: 0 }
    }

    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let decay     = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.base_lr * (remaining / decay).max(0.0)
    }

    pub fn step(&mut self) -> f64 {
        let lr = self.lr_at(self.current);
        self.current += 1;
        lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_warmup_then_decay() {
        let s = LinearWarmupSchedule::new(1.0, 4, 12);
        assert!(close(s.lr_at(0), 0.0));
        assert!(close(s.lr_at(2), 0.5));
        assert!(close(s.lr_at(4), 1.0));
        assert!(close(s.lr_at(8), 0.5));
        assert!(close(s.lr_at(12), 0.0));
        assert!(close(s.lr_at(20), 0.0));
    }

    #[test]
    fn test_no_warmup_starts_at_base() {
        let s = LinearWarmupSchedule::new(5e-5, 0, 10);
        assert!(close(s.lr_at(0), 5e-5));
        assert!(s.lr_at(9) > 0.0);
        assert!(s.lr_at(9) < s.lr_at(1));
    }

    #[test]
    fn test_step_advances() {
        let mut s = LinearWarmupSchedule::new(1.0, 2, 4);
        let rates: Vec<f64> = (0..4).map(|_| s.step()).collect();
        assert!(close(s.lr_at(4), 0.0));
        assert!(close(rates[0], 0.0));
        assert!(close(rates[1], 0.5));
        assert!(close(rates[2], 1.0));
        assert!(close(rates[3], 0.5));
    }
}
