use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::sched::TaskQueue;
use crate::sim::SimState;

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn expanded(&self, margin: i32) -> Rect {
        Rect::new(self.x - margin, self.y - margin, self.w + 2 * margin, self.h + 2 * margin)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum KeyEvent {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    CtrlA,
    CtrlC,
    CtrlV,
    CtrlX,
    AltTab,
}

/// Shared mutable state handed to every application callback: the simulation
/// record plus the deferred-task queue. Apps read and write both freely.
pub struct AppContext<'a> {
    pub sim: &'a mut SimState,
    pub tasks: &'a mut TaskQueue,
}

pub type LaunchData = serde_json::Value;

#[derive(Clone, Debug)]
pub struct LaunchRequest {
    pub id: String,
    pub data: Option<LaunchData>,
}

pub const DEFAULT_CPU_USAGE: f32 = 0.3;
pub const DEFAULT_MEMORY_USAGE: f32 = 8.0;

/// The contract every mountable application satisfies. Only `render` is
/// required; everything else defaults to a no-op so an app implements just
/// the capabilities it has. The host reads nothing from an app beyond
/// `scroll_y`/`content_height` (scrollbar compositing) and the usage figures
/// (process listing).
pub trait Application {
    fn update(&mut self, _dt: f32, _ctx: &mut AppContext) {}

    /// Draw into `content`, in screen coordinates. The host has already
    /// clipped to `content` and translated by `-scroll_y()`, so a scrolling
    /// app draws its full content and lets the clip do the cropping.
    fn render(&mut self, canvas: &mut dyn Canvas, content: Rect, ctx: &mut AppContext);

    /// `x`/`y` are content-local and include the scroll offset; `content` is
    /// the content rectangle in screen coordinates.
    fn handle_click(&mut self, _x: i32, _y: i32, _content: Rect, _ctx: &mut AppContext) {}

    /// Only the focused window's app receives key events. Ctrl+C/Ctrl+V are
    /// intercepted by the host before this is called.
    fn handle_key(&mut self, _evt: &KeyEvent, _ctx: &mut AppContext) {}

    fn handle_wheel(&mut self, _delta_y: i32, _content: Rect, _ctx: &mut AppContext) {}

    /// Return true when the event was consumed (a context menu opened, a
    /// selection changed). False falls back to the window chrome.
    fn handle_right_click(
        &mut self,
        _x: i32,
        _y: i32,
        _local_x: i32,
        _local_y: i32,
        _ctx: &mut AppContext,
    ) -> bool {
        false
    }

    /// Text to place in the shared clipboard slot, or None to leave it.
    fn on_copy(&mut self, _ctx: &mut AppContext) -> Option<String> {
        None
    }

    fn on_paste(&mut self, _text: &str, _ctx: &mut AppContext) {}

    fn cpu_usage(&self) -> f32 {
        DEFAULT_CPU_USAGE
    }

    fn memory_usage(&self) -> f32 {
        DEFAULT_MEMORY_USAGE
    }

    fn scroll_y(&self) -> i32 {
        0
    }

    fn set_scroll_y(&mut self, _scroll: i32) {}

    /// Total content height in pixels. Anything larger than the content
    /// rectangle makes the host draw a scrollbar.
    fn content_height(&self) -> i32 {
        0
    }

    /// Drained by the host after updates and input; lets an app ask for
    /// another app to be opened.
    fn take_request(&mut self) -> Option<LaunchRequest> {
        None
    }
}

#[derive(Copy, Clone)]
pub struct AppDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub default_title: &'static str,
    pub desktop_icon: bool,
    pub preferred_size: (i32, i32),
    pub factory: fn(Option<&LaunchData>) -> Box<dyn Application>,
}

pub struct AppRegistry {
    apps: Vec<AppDescriptor>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self { apps: Vec::new() }
    }

    pub fn register(&mut self, desc: AppDescriptor) {
        self.apps.push(desc);
    }

    pub fn descriptors(&self) -> &[AppDescriptor] {
        &self.apps
    }

    pub fn find(&self, id: &str) -> Option<&AppDescriptor> {
        self.apps.iter().find(|d| d.id == id)
    }

    /// Unknown ids resolve to None; the caller treats that as a silent no-op.
    pub fn instantiate(
        &self,
        id: &str,
        data: Option<&LaunchData>,
    ) -> Option<(AppDescriptor, Box<dyn Application>)> {
        let desc = self.find(id)?;
        Some((*desc, (desc.factory)(data)))
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScrollbarInfo {
    pub track: Rect,
    pub thumb: Rect,
    pub max_scroll: i32,
}

pub fn scrollbar_info(content: Rect, content_height: i32, scroll_y: i32) -> Option<ScrollbarInfo> {
    if content.h <= 0 || content.w <= 0 || content_height <= content.h {
        return None;
    }
    let track = Rect::new(content.right() - SCROLLBAR_W, content.y, SCROLLBAR_W, content.h);
    let max_scroll = content_height - content.h;
    let thumb_h = (track.h * content.h / content_height).max(SCROLLBAR_MIN_THUMB).min(track.h);
    let range = track.h - thumb_h;
    let scroll = scroll_y.clamp(0, max_scroll);
    let thumb_y = if max_scroll > 0 { track.y + scroll * range / max_scroll } else { track.y };
    Some(ScrollbarInfo {
        track,
        thumb: Rect::new(track.x, thumb_y, SCROLLBAR_W, thumb_h),
        max_scroll,
    })
}

/// Maps a dragged thumb top edge back to a scroll offset.
pub fn scroll_for_thumb(content: Rect, content_height: i32, thumb_top: i32) -> i32 {
    let Some(info) = scrollbar_info(content, content_height, 0) else {
        return 0;
    };
    let range = info.track.h - info.thumb.h;
    if range <= 0 {
        return 0;
    }
    let rel = (thumb_top - info.track.y).clamp(0, range);
    rel * info.max_scroll / range
}

pub const SCROLLBAR_W: i32 = 10;
const SCROLLBAR_MIN_THUMB: i32 = 24;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_excludes_far_edges() {
        let r = Rect::new(10, 10, 20, 10);
        assert!(r.contains(10, 10));
        assert!(r.contains(29, 19));
        assert!(!r.contains(30, 10));
        assert!(!r.contains(10, 20));
        assert!(!r.contains(9, 10));
    }

    #[test]
    fn scrollbar_absent_when_content_fits() {
        let content = Rect::new(0, 0, 200, 300);
        assert_eq!(scrollbar_info(content, 300, 0), None);
        assert_eq!(scrollbar_info(content, 120, 0), None);
    }

    #[test]
    fn scrollbar_thumb_tracks_scroll_within_bounds() {
        let content = Rect::new(50, 40, 200, 300);
        let top = scrollbar_info(content, 900, 0).unwrap();
        assert_eq!(top.thumb.y, top.track.y);
        assert_eq!(top.max_scroll, 600);

        let bottom = scrollbar_info(content, 900, 600).unwrap();
        assert_eq!(bottom.thumb.bottom(), bottom.track.bottom());

        let over = scrollbar_info(content, 900, 9999).unwrap();
        assert_eq!(over.thumb, bottom.thumb);
    }

    #[test]
    fn thumb_drag_maps_back_to_scroll_extremes() {
        let content = Rect::new(0, 0, 200, 300);
        let info = scrollbar_info(content, 900, 0).unwrap();
        assert_eq!(scroll_for_thumb(content, 900, info.track.y - 50), 0);
        assert_eq!(scroll_for_thumb(content, 900, info.track.bottom()), info.max_scroll);
    }

    #[test]
    fn registry_ignores_unknown_ids() {
        let registry = AppRegistry::new();
        assert!(registry.instantiate("nonexistent", None).is_none());
    }

    #[test]
    fn registry_builds_registered_apps() {
        fn make(_data: Option<&LaunchData>) -> Box<dyn Application> {
            test_support::StubApp::boxed()
        }
        let mut registry = AppRegistry::new();
        registry.register(AppDescriptor {
            id: "stub",
            label: "Stub",
            default_title: "Stub",
            desktop_icon: false,
            preferred_size: (300, 200),
            factory: make,
        });
        let (desc, _app) = registry.instantiate("stub", None).unwrap();
        assert_eq!(desc.default_title, "Stub");
    }
}
