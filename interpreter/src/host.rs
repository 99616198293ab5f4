use std::collections::VecDeque;
use std::io;

/// One sprite drawn onto the host canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The environment generated programs run in: console, dialogs and a canvas.
///
/// Hosts are driven synchronously from a single thread; each call completes
/// before the program continues.
pub trait Host {
    /// Console output, one call per printed line.
    fn print(&mut self, text: &str) -> io::Result<()>;

    fn alert(&mut self, text: &str) -> io::Result<()>;

    /// Yes/no question; `false` when the user cancels.
    fn confirm(&mut self, text: &str) -> io::Result<bool>;

    /// Free-text question; `None` when the user cancels.
    fn prompt(&mut self, text: &str) -> io::Result<Option<String>>;

    /// Developer-facing warning (console.warn).
    fn warn(&mut self, text: &str);

    /// Canvas dimensions, or `None` when the host has no canvas.
    fn canvas_size(&self) -> Option<(f64, f64)>;

    fn draw_sprite(&mut self, draw: SpriteDraw);

    fn clear_canvas(&mut self);
}

/// A host that records everything in memory. Dialog answers are scripted
/// up front; once exhausted, confirm answers `false` and prompt cancels.
#[derive(Debug, Clone)]
pub struct BufferHost {
    pub output: Vec<String>,
    pub alerts: Vec<String>,
    pub warnings: Vec<String>,
    pub draws: Vec<SpriteDraw>,
    pub canvas: Option<(f64, f64)>,
    confirm_answers: VecDeque<bool>,
    prompt_answers: VecDeque<String>,
}

impl Default for BufferHost {
    fn default() -> Self {
        BufferHost {
            output: Vec::new(),
            alerts: Vec::new(),
            warnings: Vec::new(),
            draws: Vec::new(),
            canvas: Some((480.0, 360.0)),
            confirm_answers: VecDeque::new(),
            prompt_answers: VecDeque::new(),
        }
    }
}

impl BufferHost {
    pub fn new() -> Self {
        BufferHost::default()
    }

    pub fn with_canvas(mut self, canvas: Option<(f64, f64)>) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn with_confirm_answers(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.confirm_answers.extend(answers);
        self
    }

    pub fn with_prompt_answers<S: Into<String>>(
        mut self,
        answers: impl IntoIterator<Item = S>,
    ) -> Self {
        self.prompt_answers.extend(answers.into_iter().map(Into::into));
        self
    }

    /// Printed lines joined with newlines.
    pub fn output_text(&self) -> String {
        self.output.join("\n")
    }
}

impl Host for BufferHost {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.push(text.to_string());
        Ok(())
    }

    fn alert(&mut self, text: &str) -> io::Result<()> {
        self.alerts.push(text.to_string());
        Ok(())
    }

    fn confirm(&mut self, _text: &str) -> io::Result<bool> {
        Ok(self.confirm_answers.pop_front().unwrap_or(false))
    }

    fn prompt(&mut self, _text: &str) -> io::Result<Option<String>> {
        Ok(self.prompt_answers.pop_front())
    }

    fn warn(&mut self, text: &str) {
        self.warnings.push(text.to_string());
    }

    fn canvas_size(&self) -> Option<(f64, f64)> {
        self.canvas
    }

    fn draw_sprite(&mut self, draw: SpriteDraw) {
        self.draws.push(draw);
    }

    fn clear_canvas(&mut self) {
        self.draws.clear();
    }
}
