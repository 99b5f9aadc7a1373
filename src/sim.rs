use log::info;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::trace::TraceMachine;

pub type SimRng = ChaCha8Rng;

pub const STATE_VERSION: u32 = 1;

/// A time-limited lease (stolen login, rented VPN exit). Using it past its
/// expiry accrues heat every in-game minute.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub label: String,
    pub expires_day: u32,
    pub expires_min: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessSample {
    pub window: u32,
    pub app_id: String,
    pub title: String,
    pub cpu: f32,
    pub memory: f32,
}

/// The one shared record every subsystem reads and writes. Plain data with
/// public fields; the `apply_*` helpers exist for the clamping rules, not as
/// an access-control layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimState {
    pub version: u32,
    pub day: u32,
    pub minutes: f64,
    pub credits: f64,
    pub heat: f32,
    pub stress: f32,
    pub game_over: bool,
    pub clipboard: Option<String>,
    pub remote_rig_active: bool,
    pub miner_connected: bool,
    pub credential: Option<Credential>,
    pub case_open: bool,
    #[serde(skip)]
    pub processes: Vec<ProcessSample>,
}

impl SimState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            day: 1,
            minutes: 0.0,
            credits: 500.0,
            heat: 0.0,
            stress: 0.0,
            game_over: false,
            clipboard: None,
            remote_rig_active: false,
            miner_connected: false,
            credential: None,
            case_open: false,
            processes: Vec::new(),
        }
    }

    /// Adds heat, clamping to [0,100]. Heat pushed past 100 saturates and
    /// flips `game_over`; landing exactly on 100 does not.
    pub fn apply_heat(&mut self, delta: f32) {
        self.heat += delta;
        if self.heat > 100.0 {
            self.heat = 100.0;
            self.game_over = true;
        } else if self.heat < 0.0 {
            self.heat = 0.0;
        }
    }

    pub fn apply_stress(&mut self, delta: f32) {
        self.stress = (self.stress + delta).clamp(0.0, 100.0);
    }

    pub fn credential_expired(&self) -> bool {
        let Some(cred) = &self.credential else {
            return false;
        };
        self.day > cred.expires_day
            || (self.day == cred.expires_day && self.minutes > cred.expires_min)
    }

    pub fn heat_difficulty(&self) -> u32 {
        (self.heat / 30.0).floor() as u32 + 1
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TraceBand {
    pub min_heat: f32,
    pub chance_per_sec: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    /// In-game minutes in one night.
    pub night_minutes: f64,
    /// Real seconds one night takes to play out.
    pub real_night_secs: f64,
    /// Wall-clock hour the night starts at, for the taskbar clock.
    pub night_start_hour: u32,
    pub stress_per_heat_sec: f32,
    pub stress_decay_per_sec: f32,
    pub rig_payout_min: f64,
    pub rig_payout_max: f64,
    pub rig_heat_per_hour: f32,
    pub miner_credits_per_min: f64,
    pub miner_heat_per_min: f32,
    pub expired_credential_heat_per_min: f32,
    /// Checked top-down; the first band whose `min_heat` is at or below the
    /// current heat wins. Heat below every band never starts a trace.
    pub trace_bands: [TraceBand; 4],
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            night_minutes: 600.0,
            real_night_secs: 900.0,
            night_start_hour: 22,
            stress_per_heat_sec: 0.005,
            stress_decay_per_sec: 1.5,
            rig_payout_min: 40.0,
            rig_payout_max: 120.0,
            rig_heat_per_hour: 4.0,
            miner_credits_per_min: 1.25,
            miner_heat_per_min: 0.08,
            expired_credential_heat_per_min: 3.0,
            trace_bands: [
                TraceBand { min_heat: 80.0, chance_per_sec: 0.045 },
                TraceBand { min_heat: 60.0, chance_per_sec: 0.02 },
                TraceBand { min_heat: 40.0, chance_per_sec: 0.008 },
                TraceBand { min_heat: 20.0, chance_per_sec: 0.002 },
            ],
        }
    }
}

impl SimConfig {
    pub fn minutes_per_second(&self) -> f64 {
        self.night_minutes / self.real_night_secs.max(0.001)
    }

    pub fn trace_chance_per_sec(&self, heat: f32) -> f32 {
        for band in &self.trace_bands {
            if heat >= band.min_heat {
                return band.chance_per_sec;
            }
        }
        0.0
    }
}

/// World-generation callbacks the clock fires at night boundaries. The host
/// game hangs case resolution and daily content regeneration off these.
pub trait WorldHooks {
    fn case_timed_out(&mut self, _sim: &mut SimState) {}

    fn new_day(&mut self, _day: u32, _sim: &mut SimState) {}
}

pub struct NoWorld;

impl WorldHooks for NoWorld {}

/// Converts real elapsed seconds into in-game time and applies every passive
/// economic and risk effect. All mutation is clamped; nothing here panics or
/// returns errors.
pub struct Clock {
    config: SimConfig,
    hour_mark: u64,
}

impl Clock {
    pub fn new(config: SimConfig, sim: &SimState) -> Self {
        let hour_mark = whole_hours(&config, sim);
        Self { config, hour_mark }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn advance(
        &mut self,
        dt: f32,
        sim: &mut SimState,
        trace: &mut TraceMachine,
        rng: &mut SimRng,
        world: &mut dyn WorldHooks,
    ) {
        if sim.game_over || !(dt > 0.0) || !dt.is_finite() {
            return;
        }
        let dt_min = dt as f64 * self.config.minutes_per_second();
        sim.minutes += dt_min;

        if sim.heat > 0.0 {
            sim.apply_stress(sim.heat * self.config.stress_per_heat_sec * dt);
        } else if sim.stress > 0.0 {
            sim.apply_stress(-self.config.stress_decay_per_sec * dt);
        }

        let hours_now = whole_hours(&self.config, sim);
        while self.hour_mark < hours_now {
            self.hour_mark += 1;
            if sim.remote_rig_active {
                sim.credits += pick_range(rng, self.config.rig_payout_min, self.config.rig_payout_max);
                sim.apply_heat(self.config.rig_heat_per_hour);
            }
        }

        if sim.miner_connected {
            sim.credits += self.config.miner_credits_per_min * dt_min;
            sim.apply_heat(self.config.miner_heat_per_min * dt_min as f32);
        }

        if !trace.is_active() && !sim.game_over {
            let chance = self.config.trace_chance_per_sec(sim.heat) * dt;
            if chance > 0.0 && rng.gen::<f32>() < chance {
                trace.trigger(sim.heat_difficulty());
            }
        }

        if sim.credential_expired() {
            sim.apply_heat(self.config.expired_credential_heat_per_min * dt_min as f32);
        }

        if self.config.night_minutes > 0.0 {
            while sim.minutes >= self.config.night_minutes {
                sim.minutes -= self.config.night_minutes;
                sim.day += 1;
                if sim.case_open {
                    sim.case_open = false;
                    world.case_timed_out(sim);
                }
                world.new_day(sim.day, sim);
                info!("night over, day {} begins", sim.day);
            }
        }
    }
}

fn whole_hours(config: &SimConfig, sim: &SimState) -> u64 {
    let total = sim.day as f64 * config.night_minutes + sim.minutes;
    (total / 60.0).floor().max(0.0) as u64
}

fn pick_range(rng: &mut SimRng, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;

    struct CountingWorld {
        days: u32,
        timeouts: u32,
    }

    impl WorldHooks for CountingWorld {
        fn case_timed_out(&mut self, _sim: &mut SimState) {
            self.timeouts += 1;
        }

        fn new_day(&mut self, _day: u32, _sim: &mut SimState) {
            self.days += 1;
        }
    }

    fn fixture(config: SimConfig) -> (Clock, SimState, TraceMachine, SimRng) {
        let sim = SimState::new();
        let clock = Clock::new(config, &sim);
        (clock, sim, TraceMachine::new(), SimRng::seed_from_u64(7))
    }

    // 1 real second == 1 in-game minute, and no hourly boundary surprises
    fn minute_ratio_config() -> SimConfig {
        SimConfig { night_minutes: 600.0, real_night_secs: 600.0, ..SimConfig::default() }
    }

    #[test]
    fn stress_rises_with_heat_and_decays_without() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(SimConfig::default());
        sim.heat = 10.0;
        clock.advance(2.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        let expected = 10.0 * clock.config().stress_per_heat_sec * 2.0;
        assert!((sim.stress - expected).abs() < 1e-4);

        sim.heat = 0.0;
        sim.stress = 50.0;
        clock.advance(4.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        let expected = 50.0 - clock.config().stress_decay_per_sec * 4.0;
        assert!((sim.stress - expected).abs() < 1e-4);
    }

    #[test]
    fn remote_rig_pays_on_whole_hour_boundaries() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.remote_rig_active = true;
        let before = sim.credits;

        // 59 minutes: no boundary crossed yet
        clock.advance(59.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert_eq!(sim.credits, before);
        assert_eq!(sim.heat, 0.0);

        // crossing two boundaries pays twice
        clock.advance(2.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        clock.advance(60.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert!(sim.credits >= before + 2.0 * clock.config().rig_payout_min);
        assert!((sim.heat - 2.0 * clock.config().rig_heat_per_hour).abs() < 1e-4);
    }

    #[test]
    fn miner_accrues_per_ingame_minute() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.miner_connected = true;
        let before = sim.credits;
        clock.advance(10.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        let expected = clock.config().miner_credits_per_min * 10.0;
        assert!((sim.credits - before - expected).abs() < 1e-9);
        let expected_heat = clock.config().miner_heat_per_min * 10.0;
        assert!((sim.heat - expected_heat).abs() < 1e-4);
    }

    #[test]
    fn expired_credential_burns_three_heat_per_minute() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.credential = Some(Credential {
            label: "vpn lease".to_string(),
            expires_day: 0,
            expires_min: 0.0,
        });
        clock.advance(1.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert_eq!(sim.heat, 3.0);
        assert_eq!(sim.credits, 500.0);
        assert!(!sim.game_over);
    }

    #[test]
    fn unexpired_credential_is_free() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.credential = Some(Credential {
            label: "vpn lease".to_string(),
            expires_day: 99,
            expires_min: 0.0,
        });
        clock.advance(5.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert_eq!(sim.heat, 0.0);
    }

    #[test]
    fn night_rollover_wraps_minutes_and_regenerates_once() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.minutes = 599.0;
        sim.case_open = true;
        let mut world = CountingWorld { days: 0, timeouts: 0 };

        clock.advance(2.0, &mut sim, &mut trace, &mut rng, &mut world);
        assert_eq!(sim.day, 2);
        assert_eq!(sim.minutes, (599.0 + 2.0) - 600.0);
        assert_eq!(world.days, 1);
        assert_eq!(world.timeouts, 1);
        assert!(!sim.case_open);
    }

    #[test]
    fn heat_past_hundred_saturates_and_ends_the_game() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(minute_ratio_config());
        sim.heat = 99.0;
        sim.credential = Some(Credential {
            label: "vpn lease".to_string(),
            expires_day: 0,
            expires_min: 0.0,
        });
        clock.advance(1.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert_eq!(sim.heat, 100.0);
        assert!(sim.game_over);

        // game over is monotonic: the clock no longer advances anything
        let day = sim.day;
        let minutes = sim.minutes;
        clock.advance(1000.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert_eq!(sim.day, day);
        assert_eq!(sim.minutes, minutes);
    }

    #[test]
    fn high_heat_triggers_trace_with_derived_difficulty() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(SimConfig::default());
        sim.heat = 90.0;
        // chance 0.045/s over 100s is a certain roll
        clock.advance(100.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
        assert!(trace.is_active());
        // floor(90/30)+1 = 4 -> speed 3 + 4*2
        assert_eq!(trace.speed(), 11.0);
    }

    #[test]
    fn low_heat_never_triggers_a_trace() {
        let (mut clock, mut sim, mut trace, mut rng) = fixture(SimConfig::default());
        sim.heat = 10.0;
        for _ in 0..200 {
            clock.advance(1.0, &mut sim, &mut trace, &mut rng, &mut NoWorld);
            sim.heat = 10.0;
        }
        assert!(!trace.is_active());
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut sim = SimState::new();
        sim.day = 3;
        sim.minutes = 123.5;
        sim.credits = 77.25;
        sim.heat = 42.0;
        sim.clipboard = Some("lifted text".to_string());
        sim.credential = Some(Credential {
            label: "exit node".to_string(),
            expires_day: 4,
            expires_min: 30.0,
        });
        sim.processes.push(ProcessSample {
            window: 1,
            app_id: "notes".to_string(),
            title: "Notes".to_string(),
            cpu: 1.0,
            memory: 10.0,
        });

        let json = serde_json::to_string(&sim).unwrap();
        let back: SimState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, STATE_VERSION);
        assert_eq!(back.day, 3);
        assert_eq!(back.minutes, 123.5);
        assert_eq!(back.clipboard.as_deref(), Some("lifted text"));
        assert_eq!(back.credential, sim.credential);
        // runtime-only data stays out of snapshots
        assert!(back.processes.is_empty());
    }

    proptest! {
        #[test]
        fn heat_and_stress_stay_clamped(
            start_heat in 0.0f32..100.0,
            start_stress in 0.0f32..100.0,
            steps in proptest::collection::vec(0.01f32..30.0, 1..40),
            rig in proptest::bool::ANY,
            miner in proptest::bool::ANY,
        ) {
            let (mut clock, mut sim, mut trace, mut rng) = fixture(SimConfig::default());
            sim.heat = start_heat;
            sim.stress = start_stress;
            sim.remote_rig_active = rig;
            sim.miner_connected = miner;
            for dt in steps {
                clock.advance(dt, &mut sim, &mut trace, &mut rng, &mut NoWorld);
                prop_assert!((0.0..=100.0).contains(&sim.heat));
                prop_assert!((0.0..=100.0).contains(&sim.stress));
            }
        }

    }

    #[test]
    fn difficulty_steps_at_thirty_point_bands() {
        let mut sim = SimState::new();
        for (heat, expected) in [
            (0.0, 1),
            (29.9, 1),
            (30.0, 2),
            (59.9, 2),
            (60.0, 3),
            (89.9, 3),
            (90.0, 4),
            (100.0, 4),
        ] {
            sim.heat = heat;
            assert_eq!(sim.heat_difficulty(), expected, "heat {heat}");
        }
    }
}
