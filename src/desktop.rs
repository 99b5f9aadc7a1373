//! Window management: z-order, focus, drag and resize, and the pointer
//! routing that decides which window (and which part of it) consumes an
//! event. The window list is the z-order; the last entry is topmost.

use heapless::String as HString;
use log::debug;

use crate::canvas::{Canvas, GLYPH_W};
use crate::sim::ProcessSample;
use crate::windows::{
    scroll_for_thumb, scrollbar_info, AppContext, Application, KeyEvent, LaunchRequest, Rect,
};

pub type WindowId = u32;

const TITLE_BAR_H: i32 = 28;
const BORDER_THICKNESS: i32 = 2;
const SHADOW_OFFSET: i32 = 4;
const MIN_WINDOW_W: i32 = 180;
const MIN_WINDOW_H: i32 = 120;
const RESIZE_MARGIN: i32 = 6;
const TITLE_BUTTON_W: i32 = 26;
const TITLE_BUTTON_H: i32 = 18;
const TITLE_BUTTON_GAP: i32 = 4;
const CASCADE_STEP: i32 = 26;
const CASCADE_SLOTS: i32 = 8;

const TITLE_ACTIVE_BG: u32 = 0x2F5FA8;
const TITLE_INACTIVE_BG: u32 = 0x3A4150;
const TITLE_FG_ACTIVE: u32 = 0xF4F7FF;
const TITLE_FG_INACTIVE: u32 = 0xB9C0CE;
const BORDER_COLOR: u32 = 0x10131B;
const CONTENT_BG: u32 = 0x161B24;
const BUTTON_BG: u32 = 0x262E3D;
const BUTTON_FG: u32 = 0xD7DEEA;
const SHADOW_COLOR: u32 = 0x000000;
const SHADOW_ALPHA: u8 = 70;
const SCROLL_TRACK_BG: u32 = 0x1C2230;
const SCROLL_THUMB_BG: u32 = 0x4A5568;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CursorHint {
    Default,
    Move,
    ResizeNs,
    ResizeEw,
    ResizeNesw,
    ResizeNwse,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ResizeEdge {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl ResizeEdge {
    fn resizes_north(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    fn resizes_south(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    fn resizes_east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    fn resizes_west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    fn hint(self) -> CursorHint {
        match self {
            Self::N | Self::S => CursorHint::ResizeNs,
            Self::E | Self::W => CursorHint::ResizeEw,
            Self::Ne | Self::Sw => CursorHint::ResizeNesw,
            Self::Nw | Self::Se => CursorHint::ResizeNwse,
        }
    }
}

enum WindowHit {
    Resize(ResizeEdge),
    Close,
    Maximize,
    Minimize,
    TitleDrag,
    Scrollbar,
    Content,
    Frame,
}

#[derive(Copy, Clone)]
enum DragMode {
    Move,
    Resize(ResizeEdge),
    Scroll { grab: i32 },
}

#[derive(Copy, Clone)]
struct DragState {
    window: WindowId,
    start_x: i32,
    start_y: i32,
    start_rect: Rect,
    mode: DragMode,
}

struct Window {
    id: WindowId,
    app_id: String,
    title: HString<64>,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    maximized: bool,
    minimized: bool,
    pre_max: Option<Rect>,
    app: Box<dyn Application>,
}

impl Window {
    fn frame_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    fn title_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, TITLE_BAR_H)
    }

    fn content_rect(&self) -> Rect {
        Rect::new(
            self.x + BORDER_THICKNESS,
            self.y + TITLE_BAR_H,
            (self.w - 2 * BORDER_THICKNESS).max(1),
            (self.h - TITLE_BAR_H - BORDER_THICKNESS).max(1),
        )
    }

    fn set_rect(&mut self, rect: Rect) {
        self.x = rect.x;
        self.y = rect.y;
        self.w = rect.w;
        self.h = rect.h;
    }
}

#[derive(Copy, Clone)]
pub struct WindowSummary<'a> {
    pub id: WindowId,
    pub app_id: &'a str,
    pub title: &'a str,
    pub rect: Rect,
    pub minimized: bool,
    pub maximized: bool,
}

pub struct WindowManager {
    windows: Vec<Window>,
    active: Option<WindowId>,
    drag: Option<DragState>,
    work_area: Rect,
    next_id: WindowId,
}

impl WindowManager {
    pub fn new(work_area: Rect) -> Self {
        Self {
            windows: Vec::new(),
            active: None,
            drag: None,
            work_area: floor_area(work_area),
            next_id: 1,
        }
    }

    /// One window per app id: a second open refocuses the existing window
    /// and the replacement instance is dropped.
    pub fn create_window(
        &mut self,
        app_id: &str,
        title: &str,
        app: Box<dyn Application>,
        preferred: (i32, i32),
    ) -> WindowId {
        if let Some(id) = self.find_by_app_id(app_id) {
            self.focus_window(id);
            return id;
        }
        let area = self.work_area;
        let w = preferred.0.max(MIN_WINDOW_W).min(area.w).max(1);
        let h = preferred.1.max(MIN_WINDOW_H).min(area.h).max(1);
        let offset = (self.windows.len() as i32 % CASCADE_SLOTS) * CASCADE_STEP;
        let rect = clamp_to_area(
            Rect::new(
                area.x + (area.w - w) / 2 + offset,
                area.y + (area.h - h) / 2 + offset,
                w,
                h,
            ),
            area,
        );
        let id = self.next_id;
        self.next_id += 1;
        self.windows.push(Window {
            id,
            app_id: app_id.to_string(),
            title: bounded_title(title),
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            maximized: false,
            minimized: false,
            pre_max: None,
            app,
        });
        self.active = Some(id);
        debug!("opened {app_id} as window {id}");
        id
    }

    /// Raises the window to the top of the z-order and clears its minimized
    /// flag.
    pub fn focus_window(&mut self, id: WindowId) {
        let Some(pos) = self.windows.iter().position(|w| w.id == id) else {
            return;
        };
        let mut win = self.windows.remove(pos);
        win.minimized = false;
        self.windows.push(win);
        self.active = Some(id);
    }

    pub fn minimize_window(&mut self, id: WindowId) {
        let Some(win) = self.get_mut(id) else {
            return;
        };
        win.minimized = true;
        if let Some(drag) = self.drag {
            if drag.window == id {
                self.drag = None;
            }
        }
        if self.active == Some(id) {
            self.active = self.topmost_visible();
        }
    }

    pub fn toggle_maximize(&mut self, id: WindowId) {
        let area = self.work_area;
        let Some(win) = self.get_mut(id) else {
            return;
        };
        if win.maximized {
            win.maximized = false;
            let restore = win.pre_max.take().unwrap_or_else(|| default_restore_rect(area));
            win.set_rect(clamp_to_area(restore, area));
        } else {
            win.pre_max = Some(win.frame_rect());
            win.maximized = true;
            win.set_rect(area);
        }
    }

    pub fn close_window(&mut self, id: WindowId) {
        let Some(pos) = self.windows.iter().position(|w| w.id == id) else {
            return;
        };
        let win = self.windows.remove(pos);
        debug!("closed {} (window {id})", win.app_id);
        if let Some(drag) = self.drag {
            if drag.window == id {
                self.drag = None;
            }
        }
        if self.active == Some(id) {
            self.active = self.topmost_visible();
        }
    }

    /// Cycles the bottom-most visible window to the top. No-op with fewer
    /// than two visible windows.
    pub fn focus_next(&mut self) {
        let visible = self.windows.iter().filter(|w| !w.minimized).count();
        if visible < 2 {
            return;
        }
        let Some(id) = self.windows.iter().find(|w| !w.minimized).map(|w| w.id) else {
            return;
        };
        self.focus_window(id);
    }

    /// Maximized windows snap to the new area, everything else is clamped
    /// back inside it.
    pub fn set_work_area(&mut self, area: Rect) {
        let area = floor_area(area);
        self.work_area = area;
        for win in &mut self.windows {
            if win.maximized {
                win.set_rect(area);
            } else {
                win.set_rect(clamp_to_area(win.frame_rect(), area));
            }
        }
    }

    pub fn pointer_down(&mut self, x: i32, y: i32, ctx: &mut AppContext) -> bool {
        let Some((id, hit)) = self.hit_at(x, y) else {
            self.active = None;
            return false;
        };
        self.focus_window(id);
        match hit {
            WindowHit::Resize(edge) => {
                if let Some(start_rect) = self.rect_of(id) {
                    self.drag = Some(DragState {
                        window: id,
                        start_x: x,
                        start_y: y,
                        start_rect,
                        mode: DragMode::Resize(edge),
                    });
                }
            }
            WindowHit::Close => self.close_window(id),
            WindowHit::Maximize => self.toggle_maximize(id),
            WindowHit::Minimize => self.minimize_window(id),
            WindowHit::TitleDrag => {
                let start = self.get(id).filter(|w| !w.maximized).map(|w| w.frame_rect());
                if let Some(start_rect) = start {
                    self.drag = Some(DragState {
                        window: id,
                        start_x: x,
                        start_y: y,
                        start_rect,
                        mode: DragMode::Move,
                    });
                }
            }
            WindowHit::Scrollbar => self.begin_scroll_drag(id, x, y),
            WindowHit::Content => {
                if let Some(win) = self.get_mut(id) {
                    let content = win.content_rect();
                    let local_x = x - content.x;
                    let local_y = y - content.y + win.app.scroll_y();
                    win.app.handle_click(local_x, local_y, content, ctx);
                }
            }
            WindowHit::Frame => {}
        }
        true
    }

    pub fn pointer_move(&mut self, x: i32, y: i32) -> CursorHint {
        if let Some(drag) = self.drag {
            let area = self.work_area;
            match drag.mode {
                DragMode::Move => {
                    let moved = Rect::new(
                        drag.start_rect.x + (x - drag.start_x),
                        drag.start_rect.y + (y - drag.start_y),
                        drag.start_rect.w,
                        drag.start_rect.h,
                    );
                    let rect = clamp_to_area(moved, area);
                    if let Some(win) = self.get_mut(drag.window) {
                        win.set_rect(rect);
                    }
                    return CursorHint::Move;
                }
                DragMode::Resize(edge) => {
                    let rect =
                        apply_resize(drag.start_rect, edge, x - drag.start_x, y - drag.start_y, area);
                    if let Some(win) = self.get_mut(drag.window) {
                        win.set_rect(rect);
                    }
                    return edge.hint();
                }
                DragMode::Scroll { grab } => {
                    if let Some(win) = self.get_mut(drag.window) {
                        let content = win.content_rect();
                        let height = win.app.content_height();
                        win.app.set_scroll_y(scroll_for_thumb(content, height, y - grab));
                    }
                    return CursorHint::Default;
                }
            }
        }
        match self.hit_at(x, y) {
            Some((_, WindowHit::Resize(edge))) => edge.hint(),
            _ => CursorHint::Default,
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    pub fn wheel(&mut self, x: i32, y: i32, delta_y: i32, ctx: &mut AppContext) {
        let Some((id, hit)) = self.hit_at(x, y) else {
            return;
        };
        if !matches!(hit, WindowHit::Content | WindowHit::Scrollbar) {
            return;
        }
        if let Some(win) = self.get_mut(id) {
            let content = win.content_rect();
            win.app.handle_wheel(delta_y, content, ctx);
        }
    }

    /// Keys go to the active window only. Ctrl+C and Ctrl+V are resolved
    /// here against the shared clipboard slot and never reach the app's
    /// `handle_key`.
    pub fn key(&mut self, evt: &KeyEvent, ctx: &mut AppContext) {
        let Some(id) = self.active else {
            return;
        };
        let Some(win) = self.get_mut(id) else {
            return;
        };
        match evt {
            KeyEvent::CtrlC => {
                if let Some(text) = win.app.on_copy(ctx) {
                    ctx.sim.clipboard = Some(text);
                }
            }
            KeyEvent::CtrlV => {
                if let Some(text) = ctx.sim.clipboard.clone() {
                    win.app.on_paste(&text, ctx);
                }
            }
            other => win.app.handle_key(other, ctx),
        }
    }

    /// Content gets first refusal; anywhere else on the window consumes the
    /// click silently. Focus is left untouched either way.
    pub fn right_click(&mut self, x: i32, y: i32, ctx: &mut AppContext) -> bool {
        let Some((id, hit)) = self.hit_at(x, y) else {
            return false;
        };
        if let WindowHit::Content = hit {
            if let Some(win) = self.get_mut(id) {
                let content = win.content_rect();
                let local_x = x - content.x;
                let local_y = y - content.y + win.app.scroll_y();
                let _ = win.app.handle_right_click(x, y, local_x, local_y, ctx);
            }
        }
        true
    }

    /// Every app ticks, minimized ones included.
    pub fn update(&mut self, dt: f32, ctx: &mut AppContext) {
        for win in &mut self.windows {
            win.app.update(dt, ctx);
        }
    }

    pub fn drain_requests(&mut self) -> Vec<LaunchRequest> {
        let mut out = Vec::new();
        for win in &mut self.windows {
            while let Some(req) = win.app.take_request() {
                out.push(req);
            }
        }
        out
    }

    /// Bottom to top: chrome, content fill, clipped app render shifted by
    /// the scroll offset, then the scrollbar when the content overflows.
    pub fn render(&mut self, canvas: &mut dyn Canvas, ctx: &mut AppContext) {
        let active = self.active;
        for win in &mut self.windows {
            if win.minimized {
                continue;
            }
            let frame = win.frame_rect();
            let content = win.content_rect();
            draw_frame(canvas, frame, win.title.as_str(), active == Some(win.id));
            canvas.fill_rect(content, CONTENT_BG);
            let scroll = win.app.scroll_y();
            canvas.push_clip(content);
            canvas.translate(0, -scroll);
            win.app.render(canvas, content, ctx);
            canvas.translate(0, scroll);
            canvas.pop_clip();
            if let Some(bar) = scrollbar_info(content, win.app.content_height(), scroll) {
                canvas.fill_rect(bar.track, SCROLL_TRACK_BG);
                canvas.fill_rect(bar.thumb, SCROLL_THUMB_BG);
            }
        }
    }

    pub fn sample_processes(&self, out: &mut Vec<ProcessSample>) {
        out.clear();
        for win in &self.windows {
            out.push(ProcessSample {
                window: win.id,
                app_id: win.app_id.clone(),
                title: win.title.as_str().to_string(),
                cpu: win.app.cpu_usage(),
                memory: win.app.memory_usage(),
            });
        }
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn active_window(&self) -> Option<WindowId> {
        self.active
    }

    pub fn find_by_app_id(&self, app_id: &str) -> Option<WindowId> {
        self.windows.iter().find(|w| w.app_id == app_id).map(|w| w.id)
    }

    pub fn rect_of(&self, id: WindowId) -> Option<Rect> {
        self.get(id).map(|w| w.frame_rect())
    }

    pub fn is_minimized(&self, id: WindowId) -> bool {
        self.get(id).map(|w| w.minimized).unwrap_or(false)
    }

    pub fn is_maximized(&self, id: WindowId) -> bool {
        self.get(id).map(|w| w.maximized).unwrap_or(false)
    }

    /// Window ids bottom to top.
    pub fn order(&self) -> Vec<WindowId> {
        self.windows.iter().map(|w| w.id).collect()
    }

    pub fn summaries(&self) -> Vec<WindowSummary<'_>> {
        self.windows
            .iter()
            .map(|w| WindowSummary {
                id: w.id,
                app_id: w.app_id.as_str(),
                title: w.title.as_str(),
                rect: w.frame_rect(),
                minimized: w.minimized,
                maximized: w.maximized,
            })
            .collect()
    }

    pub fn work_area(&self) -> Rect {
        self.work_area
    }

    fn topmost_visible(&self) -> Option<WindowId> {
        self.windows.iter().rev().find(|w| !w.minimized).map(|w| w.id)
    }

    fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    /// Topmost first. The first window whose frame (grown by the resize
    /// margin) contains the point consumes it, and within a window the
    /// priority is resize edges, title-bar buttons right to left, title
    /// drag, scrollbar, content, frame.
    fn hit_at(&self, x: i32, y: i32) -> Option<(WindowId, WindowHit)> {
        for win in self.windows.iter().rev() {
            if win.minimized {
                continue;
            }
            let frame = win.frame_rect();
            if !win.maximized {
                if let Some(edge) = resize_edge_at(frame, x, y) {
                    return Some((win.id, WindowHit::Resize(edge)));
                }
            }
            if !frame.contains(x, y) {
                continue;
            }
            if win.title_rect().contains(x, y) {
                let [close, maximize, minimize] = title_button_rects(frame);
                if close.contains(x, y) {
                    return Some((win.id, WindowHit::Close));
                }
                if maximize.contains(x, y) {
                    return Some((win.id, WindowHit::Maximize));
                }
                if minimize.contains(x, y) {
                    return Some((win.id, WindowHit::Minimize));
                }
                return Some((win.id, WindowHit::TitleDrag));
            }
            let content = win.content_rect();
            if content.contains(x, y) {
                if let Some(bar) =
                    scrollbar_info(content, win.app.content_height(), win.app.scroll_y())
                {
                    if bar.track.contains(x, y) {
                        return Some((win.id, WindowHit::Scrollbar));
                    }
                }
                return Some((win.id, WindowHit::Content));
            }
            return Some((win.id, WindowHit::Frame));
        }
        None
    }

    fn begin_scroll_drag(&mut self, id: WindowId, x: i32, y: i32) {
        let Some(win) = self.get_mut(id) else {
            return;
        };
        let frame = win.frame_rect();
        let content = win.content_rect();
        let height = win.app.content_height();
        let Some(bar) = scrollbar_info(content, height, win.app.scroll_y()) else {
            return;
        };
        let grab = if bar.thumb.contains(x, y) {
            y - bar.thumb.y
        } else {
            // jump the thumb under the pointer, then drag from its middle
            let half = bar.thumb.h / 2;
            win.app.set_scroll_y(scroll_for_thumb(content, height, y - half));
            half
        };
        self.drag = Some(DragState {
            window: id,
            start_x: x,
            start_y: y,
            start_rect: frame,
            mode: DragMode::Scroll { grab },
        });
    }
}

fn floor_area(area: Rect) -> Rect {
    Rect::new(area.x, area.y, area.w.max(1), area.h.max(1))
}

/// Shrinks the rect to fit the area, then slides it inside. Applying it
/// twice gives the same answer as once.
fn clamp_to_area(rect: Rect, area: Rect) -> Rect {
    let w = rect.w.min(area.w).max(1);
    let h = rect.h.min(area.h).max(1);
    let x = rect.x.clamp(area.x, area.x + area.w - w);
    let y = rect.y.clamp(area.y, area.y + area.h - h);
    Rect::new(x, y, w, h)
}

fn resize_edge_at(frame: Rect, x: i32, y: i32) -> Option<ResizeEdge> {
    if !frame.expanded(RESIZE_MARGIN).contains(x, y) {
        return None;
    }
    let near_top = y < frame.y + RESIZE_MARGIN;
    let near_bottom = y >= frame.bottom() - RESIZE_MARGIN;
    let near_left = x < frame.x + RESIZE_MARGIN;
    let near_right = x >= frame.right() - RESIZE_MARGIN;
    match (near_top, near_bottom, near_left, near_right) {
        (true, _, true, _) => Some(ResizeEdge::Nw),
        (true, _, _, true) => Some(ResizeEdge::Ne),
        (_, true, true, _) => Some(ResizeEdge::Sw),
        (_, true, _, true) => Some(ResizeEdge::Se),
        (true, _, _, _) => Some(ResizeEdge::N),
        (_, true, _, _) => Some(ResizeEdge::S),
        (_, _, true, _) => Some(ResizeEdge::W),
        (_, _, _, true) => Some(ResizeEdge::E),
        _ => None,
    }
}

/// Grows or shrinks from `start` with the dragged edge following the
/// pointer and the opposite edge pinned. North and west drags move the
/// origin so the far edge stays put.
fn apply_resize(start: Rect, edge: ResizeEdge, dx: i32, dy: i32, area: Rect) -> Rect {
    let min_w = MIN_WINDOW_W.min(area.w).max(1);
    let min_h = MIN_WINDOW_H.min(area.h).max(1);
    let mut rect = start;
    if edge.resizes_east() {
        let max_w = (area.right() - start.x).max(min_w);
        rect.w = (start.w + dx).max(min_w).min(max_w);
    }
    if edge.resizes_west() {
        let right = start.right();
        let max_x = (right - min_w).max(area.x);
        rect.x = (start.x + dx).max(area.x).min(max_x);
        rect.w = right - rect.x;
    }
    if edge.resizes_south() {
        let max_h = (area.bottom() - start.y).max(min_h);
        rect.h = (start.h + dy).max(min_h).min(max_h);
    }
    if edge.resizes_north() {
        let bottom = start.bottom();
        let max_y = (bottom - min_h).max(area.y);
        rect.y = (start.y + dy).max(area.y).min(max_y);
        rect.h = bottom - rect.y;
    }
    rect
}

/// Close, maximize, minimize, laid out right to left in the title bar.
fn title_button_rects(frame: Rect) -> [Rect; 3] {
    let y = frame.y + (TITLE_BAR_H - TITLE_BUTTON_H) / 2;
    let mut x = frame.right() - BORDER_THICKNESS - TITLE_BUTTON_GAP - TITLE_BUTTON_W;
    let close = Rect::new(x, y, TITLE_BUTTON_W, TITLE_BUTTON_H);
    x -= TITLE_BUTTON_W + TITLE_BUTTON_GAP;
    let maximize = Rect::new(x, y, TITLE_BUTTON_W, TITLE_BUTTON_H);
    x -= TITLE_BUTTON_W + TITLE_BUTTON_GAP;
    let minimize = Rect::new(x, y, TITLE_BUTTON_W, TITLE_BUTTON_H);
    [close, maximize, minimize]
}

fn default_restore_rect(area: Rect) -> Rect {
    let w = (area.w * 3 / 4).max(1);
    let h = (area.h * 3 / 4).max(1);
    Rect::new(area.x + (area.w - w) / 2, area.y + (area.h - h) / 2, w, h)
}

fn draw_frame(canvas: &mut dyn Canvas, frame: Rect, title: &str, active: bool) {
    canvas.fill_rect_alpha(
        Rect::new(frame.x + SHADOW_OFFSET, frame.y + SHADOW_OFFSET, frame.w, frame.h),
        SHADOW_COLOR,
        SHADOW_ALPHA,
    );
    canvas.fill_rect(frame, BORDER_COLOR);
    let bar = Rect::new(
        frame.x + BORDER_THICKNESS,
        frame.y + BORDER_THICKNESS,
        (frame.w - 2 * BORDER_THICKNESS).max(0),
        TITLE_BAR_H - BORDER_THICKNESS,
    );
    canvas.fill_rect(bar, if active { TITLE_ACTIVE_BG } else { TITLE_INACTIVE_BG });

    let [close, maximize, minimize] = title_button_rects(frame);
    let text_x = frame.x + BORDER_THICKNESS + 6;
    let label = truncate_title(title, minimize.x - TITLE_BUTTON_GAP - text_x);
    let text_y = frame.y + (TITLE_BAR_H - canvas.line_height()) / 2;
    let fg = if active { TITLE_FG_ACTIVE } else { TITLE_FG_INACTIVE };
    canvas.draw_text(text_x, text_y, label.as_str(), fg);

    for (rect, glyph) in [(minimize, "_"), (maximize, "[]"), (close, "x")] {
        canvas.fill_rect(rect, BUTTON_BG);
        let gx = rect.x + (rect.w - canvas.text_width(glyph)) / 2;
        let gy = rect.y + (rect.h - canvas.line_height()) / 2;
        canvas.draw_text(gx, gy, glyph, BUTTON_FG);
    }
}

fn truncate_title(title: &str, max_w: i32) -> HString<64> {
    let mut out = HString::new();
    let max_chars = (max_w / GLYPH_W).max(0) as usize;
    for ch in title.chars().take(max_chars) {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

fn bounded_title(title: &str) -> HString<64> {
    let mut out = HString::new();
    for ch in title.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RecordingCanvas;
    use crate::sched::TaskQueue;
    use crate::sim::SimState;
    use crate::windows::test_support::StubApp;
    use proptest::prelude::*;

    const AREA: Rect = Rect::new(0, 0, 1024, 740);

    const ALL_EDGES: [ResizeEdge; 8] = [
        ResizeEdge::N,
        ResizeEdge::S,
        ResizeEdge::E,
        ResizeEdge::W,
        ResizeEdge::Ne,
        ResizeEdge::Nw,
        ResizeEdge::Se,
        ResizeEdge::Sw,
    ];

    fn manager() -> WindowManager {
        WindowManager::new(AREA)
    }

    fn open(wm: &mut WindowManager, app_id: &str) -> WindowId {
        wm.create_window(app_id, app_id, StubApp::boxed(), (400, 300))
    }

    #[test]
    fn clicks_route_to_the_topmost_window_and_refocus() {
        let mut wm = manager();
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app_a = StubApp::default();
        let clicks_a = app_a.clicks.clone();
        let a = wm.create_window("alpha", "Alpha", Box::new(app_a), (400, 300));

        let app_b = StubApp::default();
        let clicks_b = app_b.clicks.clone();
        let b = wm.create_window("beta", "Beta", Box::new(app_b), (400, 300));

        // inside both frames, so the topmost (beta) consumes
        assert!(wm.pointer_down(400, 300, &mut ctx));
        assert_eq!(wm.active_window(), Some(b));
        assert_eq!(clicks_b.borrow().len(), 1);
        assert!(clicks_a.borrow().is_empty());

        // only alpha's content is under this point, so it takes focus
        assert!(wm.pointer_down(320, 300, &mut ctx));
        assert_eq!(wm.active_window(), Some(a));
        assert_eq!(wm.order(), vec![b, a]);
        let (lx, ly) = clicks_a.borrow()[0];
        assert_eq!((lx, ly), (6, 52));
    }

    #[test]
    fn pointer_down_outside_everything_clears_active() {
        let mut wm = manager();
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let a = open(&mut wm, "alpha");
        assert_eq!(wm.active_window(), Some(a));
        assert!(!wm.pointer_down(1, 1, &mut ctx));
        assert_eq!(wm.active_window(), None);
    }

    #[test]
    fn second_launch_of_an_app_refocuses_instead_of_duplicating() {
        let mut wm = manager();
        let a1 = open(&mut wm, "alpha");
        let b = open(&mut wm, "beta");
        let a2 = wm.create_window("alpha", "Alpha again", StubApp::boxed(), (500, 320));
        assert_eq!(a1, a2);
        assert_eq!(wm.window_count(), 2);
        assert_eq!(wm.order(), vec![b, a1]);
        assert_eq!(wm.active_window(), Some(a1));
    }

    #[test]
    fn minimize_and_close_rederive_the_active_window() {
        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let b = open(&mut wm, "beta");

        wm.minimize_window(b);
        assert!(wm.is_minimized(b));
        assert_eq!(wm.active_window(), Some(a));

        wm.focus_window(b);
        assert!(!wm.is_minimized(b));
        assert_eq!(wm.active_window(), Some(b));

        wm.close_window(b);
        assert_eq!(wm.window_count(), 1);
        assert_eq!(wm.active_window(), Some(a));

        // closing a background window leaves focus alone
        let c = open(&mut wm, "gamma");
        wm.close_window(a);
        assert_eq!(wm.active_window(), Some(c));

        wm.minimize_window(c);
        assert_eq!(wm.active_window(), None);
    }

    #[test]
    fn maximize_snaps_to_the_work_area_and_restores() {
        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let before = wm.rect_of(a).unwrap();

        wm.toggle_maximize(a);
        assert!(wm.is_maximized(a));
        assert_eq!(wm.rect_of(a), Some(AREA));

        // a maximized window follows work-area changes
        let smaller = Rect::new(0, 0, 800, 560);
        wm.set_work_area(smaller);
        assert_eq!(wm.rect_of(a), Some(smaller));

        wm.toggle_maximize(a);
        assert!(!wm.is_maximized(a));
        let restored = wm.rect_of(a).unwrap();
        assert_eq!((restored.w, restored.h), (before.w, before.h));
        assert!(restored.x >= smaller.x && restored.right() <= smaller.right());
        assert!(restored.y >= smaller.y && restored.bottom() <= smaller.bottom());
    }

    #[test]
    fn shrinking_the_work_area_pulls_windows_back_inside() {
        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        wm.set_work_area(Rect::new(0, 0, 500, 400));
        let r = wm.rect_of(a).unwrap();
        assert_eq!(r.w, 400);
        assert!(r.x >= 0 && r.y >= 0);
        assert!(r.right() <= 500 && r.bottom() <= 400);

        // degenerate areas are floored to one pixel
        wm.set_work_area(Rect::new(0, 0, 0, -5));
        assert_eq!(wm.work_area(), Rect::new(0, 0, 1, 1));
    }

    #[test]
    fn title_buttons_act_right_to_left() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let [_, maximize, minimize] = title_button_rects(wm.rect_of(a).unwrap());

        wm.pointer_down(minimize.x + 1, minimize.y + 1, &mut ctx);
        assert!(wm.is_minimized(a));
        assert_eq!(wm.active_window(), None);

        wm.focus_window(a);
        let [_, maximize2, _] = title_button_rects(wm.rect_of(a).unwrap());
        assert_eq!(maximize, maximize2);
        wm.pointer_down(maximize.x + 1, maximize.y + 1, &mut ctx);
        assert!(wm.is_maximized(a));
        assert_eq!(wm.rect_of(a), Some(AREA));

        let [close, _, _] = title_button_rects(AREA);
        wm.pointer_down(close.x + 1, close.y + 1, &mut ctx);
        assert_eq!(wm.window_count(), 0);
        assert_eq!(wm.active_window(), None);
    }

    #[test]
    fn title_drag_moves_the_window_until_release() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let frame = wm.rect_of(a).unwrap();
        let (gx, gy) = (frame.x + 40, frame.y + 10);

        wm.pointer_down(gx, gy, &mut ctx);
        assert_eq!(wm.pointer_move(gx + 50, gy + 30), CursorHint::Move);
        let moved = wm.rect_of(a).unwrap();
        assert_eq!((moved.x, moved.y), (frame.x + 50, frame.y + 30));

        // clamped to the work area, not lost off screen
        wm.pointer_move(gx - 5000, gy - 5000);
        let pinned = wm.rect_of(a).unwrap();
        assert_eq!((pinned.x, pinned.y), (AREA.x, AREA.y));

        wm.pointer_up();
        assert_eq!(wm.pointer_move(200, 400), CursorHint::Default);
        assert_eq!(wm.rect_of(a).unwrap().x, AREA.x);
    }

    #[test]
    fn maximized_windows_ignore_title_drags_and_resize_edges() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        wm.toggle_maximize(a);

        wm.pointer_down(100, 10, &mut ctx);
        wm.pointer_move(500, 400);
        assert_eq!(wm.rect_of(a), Some(AREA));
        assert_eq!(wm.pointer_move(AREA.x + 2, AREA.y + 400), CursorHint::Default);
    }

    #[test]
    fn west_resize_pins_the_right_edge_at_minimum_width() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let frame = wm.rect_of(a).unwrap();

        wm.pointer_down(frame.x + 1, frame.y + 150, &mut ctx);
        assert_eq!(wm.pointer_move(frame.x + 501, frame.y + 150), CursorHint::ResizeEw);
        let r = wm.rect_of(a).unwrap();
        assert_eq!(r.right(), frame.right());
        assert_eq!(r.w, MIN_WINDOW_W);
    }

    #[test]
    fn hover_reports_resize_hints_without_dragging() {
        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let frame = wm.rect_of(a).unwrap();

        assert_eq!(wm.pointer_move(frame.x + 1, frame.y + 1), CursorHint::ResizeNwse);
        assert_eq!(wm.pointer_move(frame.right() - 1, frame.y + 1), CursorHint::ResizeNesw);
        assert_eq!(
            wm.pointer_move(frame.x + frame.w / 2, frame.bottom() - 1),
            CursorHint::ResizeNs
        );
        assert_eq!(
            wm.pointer_move(frame.x + frame.w / 2, frame.y + 100),
            CursorHint::Default
        );
        // hovering never reorders
        assert_eq!(wm.order(), vec![a]);
    }

    #[test]
    fn clipboard_keys_are_intercepted_before_the_app() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app = StubApp { copy_text: Some("payload".to_string()), ..Default::default() };
        let keys = app.keys.clone();
        let pasted = app.pasted.clone();

        let mut wm = manager();
        wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));

        wm.key(&KeyEvent::CtrlC, &mut ctx);
        assert_eq!(ctx.sim.clipboard.as_deref(), Some("payload"));
        wm.key(&KeyEvent::CtrlV, &mut ctx);
        assert_eq!(pasted.borrow().as_slice(), ["payload".to_string()]);
        assert!(keys.borrow().is_empty());

        wm.key(&KeyEvent::Char('q'), &mut ctx);
        assert_eq!(keys.borrow().as_slice(), [KeyEvent::Char('q')]);
    }

    #[test]
    fn right_clicks_prefer_content_and_never_focus() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app = StubApp::default();
        let right_clicks = app.right_clicks.clone();

        let mut wm = manager();
        let a = wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));
        let b = open(&mut wm, "beta");
        let frame = wm.rect_of(a).unwrap();

        // alpha's exposed content, beta stays focused
        assert!(wm.right_click(frame.x + 10, frame.y + 100, &mut ctx));
        assert_eq!(right_clicks.borrow().as_slice(), [(8, 72)]);
        assert_eq!(wm.active_window(), Some(b));

        // title bar consumes without forwarding
        assert!(wm.right_click(frame.x + 10, frame.y + 10, &mut ctx));
        assert_eq!(right_clicks.borrow().len(), 1);

        assert!(!wm.right_click(AREA.right() - 1, AREA.bottom() - 1, &mut ctx));
    }

    #[test]
    fn wheel_reaches_content_but_not_chrome() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app = StubApp::with_content_height(2000);
        let wheel = app.wheel.clone();

        let mut wm = manager();
        let a = wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));
        let frame = wm.rect_of(a).unwrap();

        wm.wheel(frame.x + 50, frame.y + 100, 3, &mut ctx);
        assert_eq!(wheel.borrow().as_slice(), [3]);

        wm.wheel(frame.x + 50, frame.y + 10, 3, &mut ctx);
        assert_eq!(wheel.borrow().len(), 1);

        wm.wheel(1, 1, 3, &mut ctx);
        assert_eq!(wheel.borrow().len(), 1);
    }

    #[test]
    fn scrollbar_clicks_jump_and_drags_stay_clamped() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app = StubApp::with_content_height(2000);
        let scroll = app.scroll.clone();

        let mut wm = manager();
        let a = wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));
        let content = wm.get(a).unwrap().content_rect();
        let bar = scrollbar_info(content, 2000, 0).unwrap();
        let max_scroll = 2000 - content.h;

        // click below the thumb: it jumps toward the pointer
        let tx = bar.track.x + 1;
        wm.pointer_down(tx, bar.thumb.bottom() + 100, &mut ctx);
        assert!(scroll.get() > 0);

        // drag far past both ends
        wm.pointer_move(tx, bar.track.bottom() + 500);
        assert_eq!(scroll.get(), max_scroll);
        wm.pointer_move(tx, bar.track.y - 500);
        assert_eq!(scroll.get(), 0);
        wm.pointer_up();
    }

    #[test]
    fn update_ticks_minimized_apps_too() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let app = StubApp::default();
        let updates = app.updates.clone();

        let mut wm = manager();
        let a = wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));
        wm.minimize_window(a);
        wm.update(0.5, &mut ctx);
        assert_eq!(updates.get(), 1);
    }

    #[test]
    fn drain_requests_empties_every_app_queue() {
        let mut wm = manager();
        let mut app = StubApp::default();
        app.queued.push(LaunchRequest { id: "beta".to_string(), data: None });
        app.queued.push(LaunchRequest { id: "gamma".to_string(), data: None });
        wm.create_window("alpha", "Alpha", Box::new(app), (400, 300));

        let reqs = wm.drain_requests();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].id, "beta");
        assert_eq!(reqs[1].id, "gamma");
        assert!(wm.drain_requests().is_empty());
    }

    #[test]
    fn focus_next_cycles_bottom_to_top() {
        let mut wm = manager();
        let a = open(&mut wm, "alpha");
        let b = open(&mut wm, "beta");
        let c = open(&mut wm, "gamma");

        wm.focus_next();
        assert_eq!(wm.active_window(), Some(a));
        assert_eq!(wm.order(), vec![b, c, a]);

        wm.focus_next();
        assert_eq!(wm.active_window(), Some(b));

        wm.minimize_window(a);
        wm.minimize_window(c);
        let before = wm.order();
        wm.focus_next();
        assert_eq!(wm.order(), before);
    }

    #[test]
    fn render_skips_minimized_windows_and_balances_the_canvas() {
        let mut sim = SimState::new();
        let mut tasks = TaskQueue::new();
        let mut ctx = AppContext { sim: &mut sim, tasks: &mut tasks };

        let mut wm = manager();
        wm.create_window("alpha", "Alpha", StubApp::boxed(), (400, 300));
        let b = wm.create_window(
            "beta",
            "Beta",
            Box::new(StubApp::with_content_height(2000)),
            (400, 300),
        );
        let c = wm.create_window("gamma", "Gamma", StubApp::boxed(), (400, 300));
        wm.minimize_window(c);

        let mut canvas = RecordingCanvas::new();
        wm.render(&mut canvas, &mut ctx);

        assert!(canvas.has_text("Alpha"));
        assert!(canvas.has_text("Beta"));
        assert!(!canvas.has_text("Gamma"));
        assert!(canvas.has_text("x"));
        assert_eq!(canvas.clip_depth, 0);
        assert_eq!(canvas.offset, (0, 0));

        let mut out = Vec::new();
        wm.sample_processes(&mut out);
        assert_eq!(out.len(), 3);
        assert!(out.iter().any(|p| p.window == b && p.app_id == "beta"));
    }

    proptest! {
        #[test]
        fn clamped_rects_stay_inside_and_settle(
            x in -2000i32..2000,
            y in -2000i32..2000,
            w in 1i32..3000,
            h in 1i32..3000,
            ax in -100i32..100,
            ay in -100i32..100,
            aw in 1i32..2000,
            ah in 1i32..2000,
        ) {
            let area = Rect::new(ax, ay, aw, ah);
            let r = clamp_to_area(Rect::new(x, y, w, h), area);
            prop_assert!(r.w >= 1 && r.h >= 1);
            prop_assert!(r.x >= area.x && r.y >= area.y);
            prop_assert!(r.right() <= area.right() && r.bottom() <= area.bottom());
            prop_assert_eq!(clamp_to_area(r, area), r);
        }

        #[test]
        fn resizing_enforces_minimums_and_containment(
            edge_idx in 0usize..8,
            dx in -1500i32..1500,
            dy in -1500i32..1500,
        ) {
            let area = Rect::new(0, 0, 1024, 740);
            let start = Rect::new(300, 200, 400, 300);
            let edge = ALL_EDGES[edge_idx];
            let r = apply_resize(start, edge, dx, dy, area);
            prop_assert!(r.w >= MIN_WINDOW_W && r.h >= MIN_WINDOW_H);
            prop_assert!(r.x >= area.x && r.right() <= area.right());
            prop_assert!(r.y >= area.y && r.bottom() <= area.bottom());
            if edge.resizes_west() {
                prop_assert_eq!(r.right(), start.right());
            }
            if edge.resizes_north() {
                prop_assert_eq!(r.bottom(), start.bottom());
            }
        }
    }
}
