//! Single-threaded front end. Real elapsed time feeds a fixed-step
//! accumulator; every whole step advances tasks, clock, trace, and app
//! updates in that order, then the frame is rendered once. Input is routed
//! with the trace overlay first, then taskbar, then windows, then desktop
//! icons.

use core::fmt::Write;

use heapless::String as HString;
use log::debug;
use rand::SeedableRng;

use crate::canvas::Canvas;
use crate::desktop::{CursorHint, WindowId, WindowManager};
use crate::desktop_apps::builtin_apps;
use crate::sched::TaskQueue;
use crate::shell::{Shell, ShellAction, TaskbarEdge};
use crate::sim::{Clock, NoWorld, SimConfig, SimRng, SimState, WorldHooks};
use crate::trace::TraceMachine;
use crate::windows::{AppContext, AppDescriptor, AppRegistry, KeyEvent, LaunchData, Rect};

pub const FIXED_STEP: f32 = 1.0 / 60.0;
const MAX_FRAME_BACKLOG: f32 = FIXED_STEP * 5.0;

const GAME_OVER_BG: u32 = 0x05070A;
const GAME_OVER_ALPHA: u8 = 215;
const GAME_OVER_FG: u32 = 0xFF5A48;
const GAME_OVER_DIM: u32 = 0xAAB3C2;

pub struct Runtime {
    pub sim: SimState,
    clock: Clock,
    trace: TraceMachine,
    wm: WindowManager,
    shell: Shell,
    tasks: TaskQueue,
    registry: AppRegistry,
    rng: SimRng,
    world: Box<dyn WorldHooks>,
    screen: Rect,
    accumulator: f32,
}

impl Runtime {
    pub fn new(screen_w: i32, screen_h: i32, config: SimConfig, seed: u64) -> Self {
        let screen = Rect::new(0, 0, screen_w.max(1), screen_h.max(1));
        let mut registry = AppRegistry::new();
        let mut shell = Shell::new();
        for desc in builtin_apps() {
            registry.register(*desc);
            if desc.desktop_icon {
                shell.add_icon(desc.id, desc.label);
            }
        }
        let sim = SimState::new();
        let clock = Clock::new(config, &sim);
        let wm = WindowManager::new(shell.work_area(screen));
        Self {
            sim,
            clock,
            trace: TraceMachine::new(),
            wm,
            shell,
            tasks: TaskQueue::new(),
            registry,
            rng: SimRng::seed_from_u64(seed),
            world: Box::new(NoWorld),
            screen,
            accumulator: 0.0,
        }
    }

    pub fn register_app(&mut self, desc: AppDescriptor) {
        if desc.desktop_icon {
            self.shell.add_icon(desc.id, desc.label);
        }
        self.registry.register(desc);
    }

    pub fn set_world(&mut self, world: Box<dyn WorldHooks>) {
        self.world = world;
    }

    pub fn launch(&mut self, id: &str, data: Option<&LaunchData>) -> Option<WindowId> {
        let Some((desc, app)) = self.registry.instantiate(id, data) else {
            debug!("launch request for unknown app {id}");
            return None;
        };
        Some(self.wm.create_window(desc.id, desc.default_title, app, desc.preferred_size))
    }

    /// Accumulates real time, runs whole fixed steps, renders once. A stall
    /// longer than the backlog cap is simulated as the cap, not replayed.
    pub fn frame(&mut self, real_dt: f32, canvas: &mut dyn Canvas) {
        if real_dt.is_finite() && real_dt > 0.0 {
            self.accumulator = (self.accumulator + real_dt).min(MAX_FRAME_BACKLOG);
        }
        while self.accumulator >= FIXED_STEP {
            self.accumulator -= FIXED_STEP;
            self.step(FIXED_STEP);
        }
        self.render(canvas);
    }

    fn step(&mut self, dt: f32) {
        if self.sim.game_over {
            return;
        }
        self.tasks.advance(dt as f64, &mut self.sim);
        self.clock.advance(dt, &mut self.sim, &mut self.trace, &mut self.rng, self.world.as_mut());
        self.trace.update(dt, self.screen, &mut self.sim, &mut self.rng);
        {
            let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
            self.wm.update(dt, &mut ctx);
        }
        self.pump_requests();
        self.wm.sample_processes(&mut self.sim.processes);
    }

    fn render(&mut self, canvas: &mut dyn Canvas) {
        self.shell.render(canvas, self.screen, &self.sim, &self.wm, self.clock.config());
        {
            let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
            self.wm.render(canvas, &mut ctx);
        }
        self.trace.render(canvas, self.screen);
        if self.sim.game_over {
            draw_game_over(canvas, self.screen, &self.sim);
        }
    }

    pub fn pointer_down(&mut self, x: i32, y: i32) {
        if self.trace.handle_click(x, y) {
            return;
        }
        if self.shell.taskbar_contains(self.screen, x, y) {
            match self.shell.taskbar_action(x, y) {
                Some(ShellAction::ToggleWindow(id)) => self.toggle_taskbar_window(id),
                Some(ShellAction::Launch(id)) => {
                    self.launch(id, None);
                }
                None => {}
            }
            return;
        }
        let consumed = {
            let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
            self.wm.pointer_down(x, y, &mut ctx)
        };
        if consumed {
            self.pump_requests();
            return;
        }
        let area = self.wm.work_area();
        if let Some(ShellAction::Launch(id)) = self.shell.icon_action(area, x, y) {
            self.launch(id, None);
        }
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) -> CursorHint {
        if self.trace.is_active() {
            return CursorHint::Default;
        }
        self.wm.pointer_move(x, y)
    }

    pub fn pointer_up(&mut self) {
        self.wm.pointer_up();
    }

    pub fn wheel(&mut self, x: i32, y: i32, delta_y: i32) {
        if self.trace.is_active() {
            return;
        }
        let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
        self.wm.wheel(x, y, delta_y, &mut ctx);
    }

    pub fn key(&mut self, evt: &KeyEvent) {
        if self.trace.is_active() {
            return;
        }
        if matches!(evt, KeyEvent::AltTab) {
            self.wm.focus_next();
            return;
        }
        {
            let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
            self.wm.key(evt, &mut ctx);
        }
        self.pump_requests();
    }

    pub fn right_click(&mut self, x: i32, y: i32) -> bool {
        if self.trace.is_active() {
            return true;
        }
        let mut ctx = AppContext { sim: &mut self.sim, tasks: &mut self.tasks };
        self.wm.right_click(x, y, &mut ctx)
    }

    pub fn resize_screen(&mut self, w: i32, h: i32) {
        self.screen = Rect::new(self.screen.x, self.screen.y, w.max(1), h.max(1));
        self.wm.set_work_area(self.shell.work_area(self.screen));
    }

    pub fn set_taskbar(&mut self, edge: TaskbarEdge) {
        self.shell.set_edge(edge);
        self.wm.set_work_area(self.shell.work_area(self.screen));
    }

    pub fn window_manager(&self) -> &WindowManager {
        &self.wm
    }

    pub fn window_manager_mut(&mut self) -> &mut WindowManager {
        &mut self.wm
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn trace(&self) -> &TraceMachine {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut TraceMachine {
        &mut self.trace
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskQueue {
        &mut self.tasks
    }

    pub fn config(&self) -> &SimConfig {
        self.clock.config()
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    fn toggle_taskbar_window(&mut self, id: WindowId) {
        if self.wm.active_window() == Some(id) && !self.wm.is_minimized(id) {
            self.wm.minimize_window(id);
        } else {
            self.wm.focus_window(id);
        }
    }

    fn pump_requests(&mut self) {
        for req in self.wm.drain_requests() {
            self.launch(&req.id, req.data.as_ref());
        }
    }
}

fn draw_game_over(canvas: &mut dyn Canvas, screen: Rect, sim: &SimState) {
    canvas.fill_rect_alpha(screen, GAME_OVER_BG, GAME_OVER_ALPHA);
    let title = "CONNECTION TERMINATED";
    let x = screen.x + (screen.w - canvas.text_width(title)) / 2;
    let y = screen.y + screen.h / 2 - canvas.line_height();
    canvas.draw_text(x, y, title, GAME_OVER_FG);
    let mut line = HString::<48>::new();
    let _ = write!(&mut line, "the trace closed in on day {}", sim.day);
    let lx = screen.x + (screen.w - canvas.text_width(line.as_str())) / 2;
    canvas.draw_text(lx, y + canvas.line_height() + 8, line.as_str(), GAME_OVER_DIM);
}
