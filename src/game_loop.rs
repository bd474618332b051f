#[derive(Clone, Debug)]
pub struct FixedStepLoop {
    step_ms: u64,
    max_steps_per_frame: u32,
    accumulator_ms: u64,
    last_frame_ms: Option<u64>,
    paused: bool,
}

impl FixedStepLoop {
    pub fn new(step_ms: u64, max_steps_per_frame: u32) -> Self {
        Self {
            step_ms: step_ms.max(1),
            max_steps_per_frame: max_steps_per_frame.max(1),
            accumulator_ms: 0,
            last_frame_ms: None,
            paused: false,
        }
    }

    pub fn step_ms(&self) -> u64 {
        self.step_ms
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        self.accumulator_ms = 0;
        self.last_frame_ms = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn advance(&mut self, now_ms: u64) -> u32 {
        let Some(last) = self.last_frame_ms.replace(now_ms) else {
            return 0;
        };
        if self.paused {
            return 0;
        }
        self.accumulator_ms = self
            .accumulator_ms
            .saturating_add(now_ms.saturating_sub(last));

        let owed = self.accumulator_ms / self.step_ms;
        self.accumulator_ms %= self.step_ms;
        if owed > u64::from(self.max_steps_per_frame) {
            return self.max_steps_per_frame;
        }
        owed as u32
    }

    pub fn run(&mut self, now_ms: u64, mut step: impl FnMut(u64)) -> u32 {
        let steps = self.advance(now_ms);
        for _ in 0..steps {
            step(self.step_ms);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_only_primes_the_clock() {
        let mut frame_loop = FixedStepLoop::new(20, 5);
        assert_eq!(frame_loop.advance(1_000), 0);
        assert_eq!(frame_loop.advance(1_020), 1);
    }

    #[test]
    fn remainder_carries_over() {
        let mut frame_loop = FixedStepLoop::new(20, 5);
        frame_loop.advance(0);
        assert_eq!(frame_loop.advance(30), 1);
        assert_eq!(frame_loop.advance(40), 1);
        assert_eq!(frame_loop.advance(55), 0);
        assert_eq!(frame_loop.advance(60), 1);
    }

    #[test]
    fn backlog_is_capped() {
        let mut frame_loop = FixedStepLoop::new(20, 5);
        frame_loop.advance(0);
        assert_eq!(frame_loop.advance(10_000), 5);
        assert_eq!(frame_loop.advance(10_020), 1);
    }

    #[test]
    fn paused_loop_runs_nothing_and_resumes_cleanly() {
        let mut frame_loop = FixedStepLoop::new(20, 5);
        frame_loop.advance(0);
        frame_loop.set_paused(true);
        assert_eq!(frame_loop.advance(500), 0);
        frame_loop.set_paused(false);
        assert_eq!(frame_loop.advance(5_000), 0);
        let mut ran = Vec::new();
        assert_eq!(frame_loop.run(5_040, |dt| ran.push(dt)), 2);
        assert_eq!(ran, vec![20, 20]);
    }
}
