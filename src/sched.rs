use crate::sim::SimState;

type Task = Box<dyn FnOnce(&mut SimState)>;

struct Scheduled {
    due: f64,
    seq: u64,
    run: Task,
}

/// Virtual-clock deferred mutations. App features that "finish after N
/// seconds" schedule a closure here instead of arming a wall-clock timer;
/// the runtime advances the queue once per fixed step, so tests drive time
/// by calling `advance` and never sleep.
pub struct TaskQueue {
    now: f64,
    next_seq: u64,
    pending: Vec<Scheduled>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { now: 0.0, next_seq: 0, pending: Vec::new() }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn schedule_in(&mut self, delay_secs: f64, run: impl FnOnce(&mut SimState) + 'static) {
        let due = self.now + delay_secs.max(0.0);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled { due, seq, run: Box::new(run) });
    }

    /// Moves the clock forward and runs every task that has come due, in
    /// due order (scheduling order for ties). Returns how many ran.
    pub fn advance(&mut self, dt: f64, sim: &mut SimState) -> usize {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt;
        }
        let mut ran = 0;
        loop {
            let next = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= self.now)
                .min_by(|(_, a), (_, b)| {
                    a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq))
                })
                .map(|(i, _)| i);
            let Some(idx) = next else {
                break;
            };
            let task = self.pending.remove(idx);
            (task.run)(sim);
            ran += 1;
        }
        ran
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
