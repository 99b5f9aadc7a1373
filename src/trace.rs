use core::fmt::Write;

use heapless::String as HString;
use log::{info, warn};
use rand::Rng;

use crate::canvas::Canvas;
use crate::sim::{SimRng, SimState};
use crate::windows::Rect;

const START_PROGRESS: f32 = 15.0;
const BASE_SPEED: f32 = 3.0;
const SPEED_PER_DIFFICULTY: f32 = 2.0;
const HIT_REDUCTION: f32 = 15.0;
const NODE_CAP: usize = 3;
const SPAWN_SECS_SLOW: f32 = 1.5;
const SPAWN_SECS_FAST: f32 = 0.7;

const NODE_W: i32 = 150;
const NODE_H: i32 = 44;
const SPAWN_PAD: i32 = 40;
const SPAWN_PAD_TOP: i32 = 150;

const OVERLAY_COLOR: u32 = 0x06090C;
const OVERLAY_ALPHA: u8 = 190;
const WARN_FG: u32 = 0xFF5A48;
const BAR_BG: u32 = 0x22100E;
const BAR_FILL: u32 = 0xD93A2B;
const BAR_FG: u32 = 0xFFD9D2;
const NODE_BG: u32 = 0x8C1F1F;
const NODE_EDGE: u32 = 0xE07B6B;
const NODE_FG: u32 = 0xFFE8E0;
const FLASH_HZ: f32 = 2.0;

const WARN_LABEL: &str = "!! TRACE DETECTED !!";
const NODE_LABEL: &str = "REROUTE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceNode {
    pub id: u32,
    pub rect: Rect,
}

/// The intrusion takeover. While active it owns the screen: every click goes
/// here first and nothing below it sees input until the trace resolves.
pub struct TraceMachine {
    active: bool,
    progress: f32,
    speed: f32,
    nodes: Vec<TraceNode>,
    spawn_timer: f32,
    elapsed: f32,
    next_node: u32,
}

impl TraceMachine {
    pub fn new() -> Self {
        Self {
            active: false,
            progress: 0.0,
            speed: 0.0,
            nodes: Vec::new(),
            spawn_timer: 0.0,
            elapsed: 0.0,
            next_node: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn nodes(&self) -> &[TraceNode] {
        &self.nodes
    }

    /// Starts a trace unless one is already running. Progress begins at 15,
    /// never 0: a trace is an immediate threat.
    pub fn trigger(&mut self, difficulty: u32) {
        if self.active {
            return;
        }
        self.active = true;
        self.progress = START_PROGRESS;
        self.speed = BASE_SPEED + difficulty as f32 * SPEED_PER_DIFFICULTY;
        self.nodes.clear();
        self.spawn_timer = 0.0;
        self.elapsed = 0.0;
        warn!("trace started, difficulty {difficulty}");
    }

    pub fn update(&mut self, dt: f32, area: Rect, sim: &mut SimState, rng: &mut SimRng) {
        if !self.active || !(dt >= 0.0) {
            return;
        }
        self.elapsed += dt;
        self.progress += self.speed * dt;
        if self.progress >= 100.0 {
            self.progress = 100.0;
            self.fail(sim);
            return;
        }
        self.spawn_timer -= dt;
        if self.spawn_timer <= 0.0 && self.nodes.len() < NODE_CAP {
            self.spawn_node(area, rng);
            self.spawn_timer = self.spawn_interval();
        }
    }

    /// While active every click is consumed, hit or miss. A hit removes the
    /// node and pulls progress back; reaching 0 resolves the trace.
    pub fn handle_click(&mut self, x: i32, y: i32) -> bool {
        if !self.active {
            return false;
        }
        if let Some(idx) = self.nodes.iter().position(|n| n.rect.contains(x, y)) {
            self.nodes.remove(idx);
            self.progress = (self.progress - HIT_REDUCTION).max(0.0);
            if self.progress <= 0.0 {
                self.succeed();
            }
        }
        true
    }

    pub fn render(&self, canvas: &mut dyn Canvas, area: Rect) {
        if !self.active {
            return;
        }
        canvas.fill_rect_alpha(area, OVERLAY_COLOR, OVERLAY_ALPHA);

        if (self.elapsed * FLASH_HZ) as i32 % 2 == 0 {
            let x = area.x + (area.w - canvas.text_width(WARN_LABEL)) / 2;
            canvas.draw_text(x, area.y + 48, WARN_LABEL, WARN_FG);
        }

        let track = Rect::new(area.x + area.w / 5, area.y + 88, area.w * 3 / 5, 18);
        canvas.fill_rect(track, BAR_BG);
        let fill_w = (track.w as f32 * self.progress / 100.0) as i32;
        canvas.fill_rect(Rect::new(track.x, track.y, fill_w.clamp(0, track.w), track.h), BAR_FILL);
        let mut pct = HString::<16>::new();
        let _ = write!(&mut pct, "{:>3.0}%", self.progress);
        canvas.draw_text(track.right() + 8, track.y + 2, pct.as_str(), BAR_FG);

        for node in &self.nodes {
            canvas.fill_rect(node.rect.expanded(2), NODE_EDGE);
            canvas.fill_rect(node.rect, NODE_BG);
            let tx = node.rect.x + (node.rect.w - canvas.text_width(NODE_LABEL)) / 2;
            let ty = node.rect.y + (node.rect.h - canvas.line_height()) / 2;
            canvas.draw_text(tx, ty, NODE_LABEL, NODE_FG);
        }
    }

    fn spawn_interval(&self) -> f32 {
        let t = (self.progress / 100.0).clamp(0.0, 1.0);
        SPAWN_SECS_SLOW + (SPAWN_SECS_FAST - SPAWN_SECS_SLOW) * t
    }

    fn spawn_node(&mut self, area: Rect, rng: &mut SimRng) {
        let x_lo = area.x + SPAWN_PAD;
        let x_hi = (area.right() - SPAWN_PAD - NODE_W).max(x_lo);
        let y_lo = area.y + SPAWN_PAD_TOP;
        let y_hi = (area.bottom() - SPAWN_PAD - NODE_H).max(y_lo);
        let x = if x_hi > x_lo { rng.gen_range(x_lo..=x_hi) } else { x_lo };
        let y = if y_hi > y_lo { rng.gen_range(y_lo..=y_hi) } else { y_lo };
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.push(TraceNode { id, rect: Rect::new(x, y, NODE_W, NODE_H) });
    }

    fn succeed(&mut self) {
        self.active = false;
        self.nodes.clear();
        info!("trace rerouted");
    }

    fn fail(&mut self, sim: &mut SimState) {
        self.active = false;
        self.nodes.clear();
        sim.heat = 100.0;
        sim.game_over = true;
        warn!("trace completed, connection burned");
    }
}

impl Default for TraceMachine {
    fn default() -> Self {
        Self::new()
    }
}
