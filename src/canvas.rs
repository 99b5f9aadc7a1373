use crate::windows::Rect;

pub const GLYPH_W: i32 = 8;
pub const LINE_H: i32 = 16;

/// Drawing surface the host composites into. Coordinates are screen pixels,
/// colors are 0xRRGGBB. Clip rectangles nest; `translate` is cumulative and
/// callers undo their own offsets.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: u32);

    fn fill_rect_alpha(&mut self, rect: Rect, color: u32, alpha: u8);

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: u32);

    fn push_clip(&mut self, rect: Rect);

    fn pop_clip(&mut self);

    fn translate(&mut self, dx: i32, dy: i32);

    fn text_width(&self, text: &str) -> i32 {
        text.chars().count() as i32 * GLYPH_W
    }

    fn line_height(&self) -> i32 {
        LINE_H
    }
}

#[cfg(test)]
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum CanvasOp {
    Fill(Rect, u32),
    FillAlpha(Rect, u32, u8),
    Text(i32, i32, String, u32),
    PushClip(Rect),
    PopClip,
    Translate(i32, i32),
}

#[cfg(test)]
pub(crate) struct RecordingCanvas {
    pub ops: Vec<CanvasOp>,
    pub clip_depth: i32,
    pub offset: (i32, i32),
}

#[cfg(test)]
impl RecordingCanvas {
    pub fn new() -> Self {
        Self { ops: Vec::new(), clip_depth: 0, offset: (0, 0) }
    }

    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CanvasOp::Text(_, _, text, _) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts().iter().any(|t| t.contains(needle))
    }

    pub fn fill_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, CanvasOp::Fill(..) | CanvasOp::FillAlpha(..)))
            .count()
    }
}

#[cfg(test)]
impl Canvas for RecordingCanvas {
    fn fill_rect(&mut self, rect: Rect, color: u32) {
        self.ops.push(CanvasOp::Fill(rect, color));
    }

    fn fill_rect_alpha(&mut self, rect: Rect, color: u32, alpha: u8) {
        self.ops.push(CanvasOp::FillAlpha(rect, color, alpha));
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: u32) {
        self.ops.push(CanvasOp::Text(x, y, text.to_string(), color));
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clip_depth += 1;
        self.ops.push(CanvasOp::PushClip(rect));
    }

    fn pop_clip(&mut self) {
        self.clip_depth -= 1;
        self.ops.push(CanvasOp::PopClip);
    }

    fn translate(&mut self, dx: i32, dy: i32) {
        self.offset.0 += dx;
        self.offset.1 += dy;
        self.ops.push(CanvasOp::Translate(dx, dy));
    }
}
