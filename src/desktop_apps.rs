use crate::canvas::{Canvas, GLYPH_W, LINE_H};
use crate::windows::{AppContext, AppDescriptor, Application, KeyEvent, LaunchData, Rect};

const PAD: i32 = 8;
const NOTES_MAX_LINES: usize = 256;
const NOTES_MAX_COLS: usize = 200;

const INFO_FG: u32 = 0xD5DCE8;
const NOTES_FG: u32 = 0xE8EDF5;
const CURSOR_COLOR: u32 = 0x9FE8A8;
const HEADER_FG: u32 = 0x8FB7F0;
const ROW_FG: u32 = 0xC4CDDB;
const STAT_FG: u32 = 0x9FE8A8;

const SYSINFO_TEXT: &[&str] = &[
    "CenterOS workstation",
    "",
    "Drag a title bar to move a window, its edges to resize.",
    "Alt+Tab cycles windows. Ctrl+C and Ctrl+V share one clipboard.",
    "",
    "The taskbar clock runs on in-game time. Keep heat low;",
    "past a threshold the uplink starts drawing traces.",
];

pub fn builtin_apps() -> &'static [AppDescriptor] {
    BUILTIN_APPS
}

const BUILTIN_APPS: &[AppDescriptor] = &[
    AppDescriptor {
        id: "sysinfo",
        label: "System Info",
        default_title: "System Info",
        desktop_icon: true,
        preferred_size: (420, 320),
        factory: create_sysinfo_app,
    },
    AppDescriptor {
        id: "notes",
        label: "Notes",
        default_title: "Notes",
        desktop_icon: true,
        preferred_size: (460, 340),
        factory: create_notes_app,
    },
    AppDescriptor {
        id: "procmon",
        label: "Processes",
        default_title: "Process Monitor",
        desktop_icon: true,
        preferred_size: (540, 360),
        factory: create_procmon_app,
    },
];

fn create_sysinfo_app(_data: Option<&LaunchData>) -> Box<dyn Application> {
    Box::new(InfoApp { paragraphs: SYSINFO_TEXT, scroll: 0 })
}

fn create_notes_app(data: Option<&LaunchData>) -> Box<dyn Application> {
    Box::new(NotesApp::new(data))
}

fn create_procmon_app(_data: Option<&LaunchData>) -> Box<dyn Application> {
    Box::new(ProcMonApp::new())
}

struct InfoApp {
    paragraphs: &'static [&'static str],
    scroll: i32,
}

impl InfoApp {
    fn text_height(&self) -> i32 {
        self.paragraphs.len() as i32 * LINE_H + 2 * PAD
    }
}

impl Application for InfoApp {
    fn render(&mut self, canvas: &mut dyn Canvas, content: Rect, _ctx: &mut AppContext) {
        for (i, line) in self.paragraphs.iter().enumerate() {
            canvas.draw_text(content.x + PAD, content.y + PAD + i as i32 * LINE_H, line, INFO_FG);
        }
    }

    fn handle_wheel(&mut self, delta_y: i32, content: Rect, _ctx: &mut AppContext) {
        let max = (self.text_height() - content.h).max(0);
        self.scroll = (self.scroll + delta_y * LINE_H).clamp(0, max);
    }

    fn scroll_y(&self) -> i32 {
        self.scroll
    }

    fn set_scroll_y(&mut self, scroll: i32) {
        self.scroll = scroll.max(0);
    }

    fn content_height(&self) -> i32 {
        self.text_height()
    }
}

/// Plain-line editor. A launch payload `{"text": "..."}` seeds the buffer.
struct NotesApp {
    lines: Vec<String>,
    cursor_row: usize,
    cursor_col: usize,
    scroll: i32,
}

impl NotesApp {
    fn new(data: Option<&LaunchData>) -> Self {
        let mut lines: Vec<String> = data
            .and_then(|d| d.get("text"))
            .and_then(|t| t.as_str())
            .map(|t| t.lines().map(str::to_string).collect())
            .unwrap_or_default();
        if lines.is_empty() {
            lines.push(String::new());
        }
        Self { lines, cursor_row: 0, cursor_col: 0, scroll: 0 }
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn insert_char(&mut self, ch: char) {
        if self.line_len(self.cursor_row) >= NOTES_MAX_COLS {
            return;
        }
        let col = self.cursor_col;
        let line = &mut self.lines[self.cursor_row];
        let at = byte_index(line, col);
        line.insert(at, ch);
        self.cursor_col = col + 1;
    }

    fn newline(&mut self) {
        if self.lines.len() >= NOTES_MAX_LINES {
            return;
        }
        let at = byte_index(&self.lines[self.cursor_row], self.cursor_col);
        let rest = self.lines[self.cursor_row].split_off(at);
        self.lines.insert(self.cursor_row + 1, rest);
        self.cursor_row += 1;
        self.cursor_col = 0;
    }

    fn backspace(&mut self) {
        if self.cursor_col > 0 {
            let col = self.cursor_col - 1;
            let line = &mut self.lines[self.cursor_row];
            let at = byte_index(line, col);
            line.remove(at);
            self.cursor_col = col;
        } else if self.cursor_row > 0 {
            let tail = self.lines.remove(self.cursor_row);
            self.cursor_row -= 1;
            self.cursor_col = self.line_len(self.cursor_row);
            self.lines[self.cursor_row].push_str(&tail);
        }
    }

    fn insert_text(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\r' => {}
                '\n' => self.newline(),
                _ => self.insert_char(ch),
            }
        }
    }

    fn to_text(&self) -> String {
        self.lines.join("\n")
    }

    fn text_height(&self) -> i32 {
        self.lines.len() as i32 * LINE_H + 2 * PAD
    }
}

impl Application for NotesApp {
    fn render(&mut self, canvas: &mut dyn Canvas, content: Rect, _ctx: &mut AppContext) {
        for (i, line) in self.lines.iter().enumerate() {
            canvas.draw_text(content.x + PAD, content.y + PAD + i as i32 * LINE_H, line, NOTES_FG);
        }
        let cx = content.x + PAD + self.cursor_col as i32 * GLYPH_W;
        let cy = content.y + PAD + self.cursor_row as i32 * LINE_H;
        canvas.fill_rect(Rect::new(cx, cy, 2, LINE_H), CURSOR_COLOR);
    }

    fn handle_click(&mut self, x: i32, y: i32, _content: Rect, _ctx: &mut AppContext) {
        let row = ((y - PAD).max(0) / LINE_H) as usize;
        let col = ((x - PAD).max(0) / GLYPH_W) as usize;
        self.cursor_row = row.min(self.lines.len() - 1);
        self.cursor_col = col.min(self.line_len(self.cursor_row));
    }

    fn handle_key(&mut self, evt: &KeyEvent, _ctx: &mut AppContext) {
        match evt {
            KeyEvent::Char(ch) => self.insert_char(*ch),
            KeyEvent::Enter => self.newline(),
            KeyEvent::Backspace => self.backspace(),
            KeyEvent::Left => {
                if self.cursor_col > 0 {
                    self.cursor_col -= 1;
                } else if self.cursor_row > 0 {
                    self.cursor_row -= 1;
                    self.cursor_col = self.line_len(self.cursor_row);
                }
            }
            KeyEvent::Right => {
                if self.cursor_col < self.line_len(self.cursor_row) {
                    self.cursor_col += 1;
                } else if self.cursor_row + 1 < self.lines.len() {
                    self.cursor_row += 1;
                    self.cursor_col = 0;
                }
            }
            KeyEvent::Up => {
                self.cursor_row = self.cursor_row.saturating_sub(1);
                self.cursor_col = self.cursor_col.min(self.line_len(self.cursor_row));
            }
            KeyEvent::Down => {
                self.cursor_row = (self.cursor_row + 1).min(self.lines.len() - 1);
                self.cursor_col = self.cursor_col.min(self.line_len(self.cursor_row));
            }
            KeyEvent::Home => self.cursor_col = 0,
            KeyEvent::End => self.cursor_col = self.line_len(self.cursor_row),
            _ => {}
        }
    }

    fn handle_wheel(&mut self, delta_y: i32, content: Rect, _ctx: &mut AppContext) {
        let max = (self.text_height() - content.h).max(0);
        self.scroll = (self.scroll + delta_y * LINE_H).clamp(0, max);
    }

    fn on_copy(&mut self, _ctx: &mut AppContext) -> Option<String> {
        let text = self.to_text();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    fn on_paste(&mut self, text: &str, _ctx: &mut AppContext) {
        self.insert_text(text);
    }

    fn cpu_usage(&self) -> f32 {
        1.2
    }

    fn memory_usage(&self) -> f32 {
        24.0
    }

    fn scroll_y(&self) -> i32 {
        self.scroll
    }

    fn set_scroll_y(&mut self, scroll: i32) {
        self.scroll = scroll.max(0);
    }

    fn content_height(&self) -> i32 {
        self.text_height()
    }
}

/// Live view of the process table sampled by the window manager.
struct ProcMonApp {
    scroll: i32,
    rows: usize,
}

impl ProcMonApp {
    fn new() -> Self {
        Self { scroll: 0, rows: 0 }
    }

    fn table_height(&self) -> i32 {
        (self.rows as i32 + 2) * LINE_H + 2 * PAD
    }
}

impl Application for ProcMonApp {
    fn render(&mut self, canvas: &mut dyn Canvas, content: Rect, ctx: &mut AppContext) {
        let mut y = content.y + PAD;
        let stats = format!(
            "credits {:>8.0}   heat {:>5.1}   stress {:>5.1}",
            ctx.sim.credits, ctx.sim.heat, ctx.sim.stress
        );
        canvas.draw_text(content.x + PAD, y, &stats, STAT_FG);
        y += LINE_H;
        canvas.draw_text(content.x + PAD, y, "WIN   CPU%    MEM  APP", HEADER_FG);
        y += LINE_H;
        for proc in &ctx.sim.processes {
            let row = format!(
                "{:>3}  {:>5.1}  {:>5.1}  {}",
                proc.window, proc.cpu, proc.memory, proc.app_id
            );
            canvas.draw_text(content.x + PAD, y, &row, ROW_FG);
            y += LINE_H;
        }
        self.rows = ctx.sim.processes.len();
    }

    fn handle_wheel(&mut self, delta_y: i32, content: Rect, _ctx: &mut AppContext) {
        let max = (self.table_height() - content.h).max(0);
        self.scroll = (self.scroll + delta_y * LINE_H).clamp(0, max);
    }

    fn cpu_usage(&self) -> f32 {
        0.8
    }

    fn memory_usage(&self) -> f32 {
        12.0
    }

    fn scroll_y(&self) -> i32 {
        self.scroll
    }

    fn set_scroll_y(&mut self, scroll: i32) {
        self.scroll = scroll.max(0);
    }

    fn content_height(&self) -> i32 {
        self.table_height()
    }
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices().nth(col).map(|(i, _)| i).unwrap_or(line.len())
}
