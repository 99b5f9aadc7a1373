//! Desktop furniture: wallpaper fill, launcher icons, and the taskbar with
//! its window buttons and in-game clock. The taskbar can dock to any screen
//! edge; the window manager works inside whatever area is left.

use core::fmt::Write;

use heapless::String as HString;

use crate::canvas::{Canvas, GLYPH_W};
use crate::desktop::{WindowId, WindowManager};
use crate::sim::{SimConfig, SimState};
use crate::windows::Rect;
use crate::OS_NAME;

const TASKBAR_THICKNESS: i32 = 36;
const TASKBAR_BUTTON_W: i32 = 150;
const TASKBAR_BUTTON_H: i32 = 28;
const START_W: i32 = 72;
const CLOCK_RESERVE_H: i32 = 130;
const CLOCK_RESERVE_V: i32 = 24;
const ICON_CELL_W: i32 = 72;
const ICON_CELL_H: i32 = 64;
const ICON_MARGIN: i32 = 12;
const ICON_GLYPH: i32 = 40;

const DESKTOP_BG: u32 = 0x0B1016;
const TASKBAR_BG: u32 = 0x1A2029;
const TASKBAR_FG: u32 = 0xE4E9F2;
const TASKBAR_FG_DIM: u32 = 0x8A93A3;
const START_BG: u32 = 0x27303E;
const BUTTON_BG: u32 = 0x222A36;
const BUTTON_ACTIVE_BG: u32 = 0x32548F;
const ICON_BG: u32 = 0x1E2733;
const ICON_FG: u32 = 0xC9D2E0;
const CLOCK_FG: u32 = 0x9FE8A8;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TaskbarEdge {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShellAction {
    Launch(&'static str),
    ToggleWindow(WindowId),
}

struct DesktopIcon {
    app_id: &'static str,
    label: &'static str,
}

struct TaskbarButton {
    window: WindowId,
    rect: Rect,
}

pub struct Shell {
    edge: TaskbarEdge,
    thickness: i32,
    icons: Vec<DesktopIcon>,
    // rebuilt on every render, consulted by taskbar_action
    buttons: Vec<TaskbarButton>,
}

impl Shell {
    pub fn new() -> Self {
        Self {
            edge: TaskbarEdge::Bottom,
            thickness: TASKBAR_THICKNESS,
            icons: Vec::new(),
            buttons: Vec::new(),
        }
    }

    pub fn edge(&self) -> TaskbarEdge {
        self.edge
    }

    pub fn set_edge(&mut self, edge: TaskbarEdge) {
        self.edge = edge;
    }

    pub fn add_icon(&mut self, app_id: &'static str, label: &'static str) {
        self.icons.push(DesktopIcon { app_id, label });
    }

    pub fn taskbar_rect(&self, screen: Rect) -> Rect {
        match self.edge {
            TaskbarEdge::Top => {
                Rect::new(screen.x, screen.y, screen.w, self.thickness.min(screen.h))
            }
            TaskbarEdge::Bottom => {
                let t = self.thickness.min(screen.h);
                Rect::new(screen.x, screen.bottom() - t, screen.w, t)
            }
            TaskbarEdge::Left => {
                Rect::new(screen.x, screen.y, self.thickness.min(screen.w), screen.h)
            }
            TaskbarEdge::Right => {
                let t = self.thickness.min(screen.w);
                Rect::new(screen.right() - t, screen.y, t, screen.h)
            }
        }
    }

    /// Whatever the taskbar leaves behind, never smaller than one pixel a
    /// side.
    pub fn work_area(&self, screen: Rect) -> Rect {
        let bar = self.taskbar_rect(screen);
        let area = match self.edge {
            TaskbarEdge::Top => {
                Rect::new(screen.x, screen.y + bar.h, screen.w, screen.h - bar.h)
            }
            TaskbarEdge::Bottom => Rect::new(screen.x, screen.y, screen.w, screen.h - bar.h),
            TaskbarEdge::Left => {
                Rect::new(screen.x + bar.w, screen.y, screen.w - bar.w, screen.h)
            }
            TaskbarEdge::Right => Rect::new(screen.x, screen.y, screen.w - bar.w, screen.h),
        };
        Rect::new(area.x, area.y, area.w.max(1), area.h.max(1))
    }

    pub fn taskbar_contains(&self, screen: Rect, x: i32, y: i32) -> bool {
        self.taskbar_rect(screen).contains(x, y)
    }

    /// Resolves a click on the taskbar against the buttons laid out by the
    /// last render.
    pub fn taskbar_action(&self, x: i32, y: i32) -> Option<ShellAction> {
        self.buttons
            .iter()
            .find(|b| b.rect.contains(x, y))
            .map(|b| ShellAction::ToggleWindow(b.window))
    }

    pub fn icon_action(&self, work_area: Rect, x: i32, y: i32) -> Option<ShellAction> {
        self.icons
            .iter()
            .enumerate()
            .find(|(i, _)| icon_cell(work_area, *i).contains(x, y))
            .map(|(_, icon)| ShellAction::Launch(icon.app_id))
    }

    pub fn render(
        &mut self,
        canvas: &mut dyn Canvas,
        screen: Rect,
        sim: &SimState,
        wm: &WindowManager,
        config: &SimConfig,
    ) {
        canvas.fill_rect(screen, DESKTOP_BG);
        let area = self.work_area(screen);
        for (i, icon) in self.icons.iter().enumerate() {
            let cell = icon_cell(area, i);
            let glyph = Rect::new(cell.x + (cell.w - ICON_GLYPH) / 2, cell.y, ICON_GLYPH, ICON_GLYPH);
            canvas.fill_rect(glyph, ICON_BG);
            let tx = cell.x + (cell.w - canvas.text_width(icon.label)) / 2;
            canvas.draw_text(tx, glyph.bottom() + 2, icon.label, ICON_FG);
        }

        let bar = self.taskbar_rect(screen);
        canvas.fill_rect(bar, TASKBAR_BG);
        let vertical = matches!(self.edge, TaskbarEdge::Left | TaskbarEdge::Right);

        let start = if vertical {
            Rect::new(bar.x + 2, bar.y + 2, (bar.w - 4).max(1), 24)
        } else {
            Rect::new(bar.x + 2, bar.y + 2, START_W, (bar.h - 4).max(1))
        };
        canvas.fill_rect(start, START_BG);
        canvas.draw_text(
            start.x + 4,
            start.y + (start.h - canvas.line_height()) / 2,
            OS_NAME,
            TASKBAR_FG,
        );

        self.buttons.clear();
        let mut wins = wm.summaries();
        wins.sort_by_key(|w| w.id);
        let mut cursor = if vertical { start.bottom() + 6 } else { start.right() + 6 };
        for win in &wins {
            let rect = if vertical {
                Rect::new(bar.x + 2, cursor, (bar.w - 4).max(1), TASKBAR_BUTTON_H)
            } else {
                Rect::new(cursor, bar.y + 4, TASKBAR_BUTTON_W, (bar.h - 8).max(1))
            };
            let fits = if vertical {
                rect.bottom() <= bar.bottom() - CLOCK_RESERVE_V
            } else {
                rect.right() <= bar.right() - CLOCK_RESERVE_H
            };
            if !fits {
                break;
            }
            cursor = if vertical { rect.bottom() + 4 } else { rect.right() + 4 };

            let active = wm.active_window() == Some(win.id) && !win.minimized;
            canvas.fill_rect(rect, if active { BUTTON_ACTIVE_BG } else { BUTTON_BG });
            let label = button_label(win.title, rect.w - 8);
            let fg = if win.minimized { TASKBAR_FG_DIM } else { TASKBAR_FG };
            canvas.draw_text(
                rect.x + 4,
                rect.y + (rect.h - canvas.line_height()) / 2,
                label.as_str(),
                fg,
            );
            self.buttons.push(TaskbarButton { window: win.id, rect });
        }

        let clock = clock_label(sim, config);
        if vertical {
            canvas.draw_text(
                bar.x + 2,
                bar.bottom() - canvas.line_height() - 4,
                clock.as_str(),
                CLOCK_FG,
            );
        } else {
            let tx = bar.right() - canvas.text_width(clock.as_str()) - 8;
            canvas.draw_text(tx, bar.y + (bar.h - canvas.line_height()) / 2, clock.as_str(), CLOCK_FG);
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

fn icon_cell(area: Rect, index: usize) -> Rect {
    let rows = ((area.h - 2 * ICON_MARGIN) / ICON_CELL_H).max(1);
    let col = index as i32 / rows;
    let row = index as i32 % rows;
    Rect::new(
        area.x + ICON_MARGIN + col * ICON_CELL_W,
        area.y + ICON_MARGIN + row * ICON_CELL_H,
        ICON_CELL_W,
        ICON_CELL_H,
    )
}

/// Day counter plus wall-clock time. A day starts at the configured night
/// hour, so minute zero renders as that hour.
fn clock_label(sim: &SimState, config: &SimConfig) -> HString<32> {
    let total = (config.night_start_hour as i64 * 60 + sim.minutes as i64).rem_euclid(24 * 60);
    let mut out = HString::new();
    let _ = write!(&mut out, "Day {}  {:02}:{:02}", sim.day, total / 60, total % 60);
    out
}

fn button_label(title: &str, max_w: i32) -> HString<32> {
    let mut out = HString::new();
    let max_chars = (max_w / GLYPH_W).max(0) as usize;
    for ch in title.chars().take(max_chars) {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}
