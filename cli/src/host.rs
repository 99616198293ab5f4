use std::io::{self, BufRead, Write};

use interpreter::{Host, SpriteDraw};

/// Runs programs against the terminal: printed lines go to `out`, dialogs
/// and canvas activity to `err`, and (when interactive) answers are read
/// from `input`.
pub struct TerminalHost<R, W, E> {
    input: R,
    out: W,
    err: E,
    pub interactive: bool,
    pub quiet: bool,
    canvas: Option<(f64, f64)>,
    pub draws: Vec<SpriteDraw>,
}

impl TerminalHost<io::StdinLock<'static>, io::Stdout, io::Stderr> {
    pub fn stdio(canvas: Option<(f64, f64)>) -> Self {
        TerminalHost::new(io::stdin().lock(), io::stdout(), io::stderr(), canvas)
    }
}

impl<R: BufRead, W: Write, E: Write> TerminalHost<R, W, E> {
    pub fn new(input: R, out: W, err: E, canvas: Option<(f64, f64)>) -> Self {
        TerminalHost {
            input,
            out,
            err,
            interactive: false,
            quiet: false,
            canvas,
            draws: Vec::new(),
        }
    }

    /// Print the question and read one answer line. `None` on end of input.
    fn ask(&mut self, question: &str) -> io::Result<Option<String>> {
        write!(self.err, "{} ", question)?;
        self.err.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    pub fn into_parts(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<R: BufRead, W: Write, E: Write> Host for TerminalHost<R, W, E> {
    fn print(&mut self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(self.out, "{}", text)
    }

    fn alert(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.err, "[alert] {}", text)
    }

    fn confirm(&mut self, text: &str) -> io::Result<bool> {
        if !self.interactive {
            writeln!(self.err, "[confirm] {} -> no", text)?;
            return Ok(false);
        }
        let answer = self.ask(&format!("[confirm] {} [y/N]", text))?;
        Ok(matches!(
            answer.as_deref().map(str::trim),
            Some("y" | "Y" | "yes" | "Yes")
        ))
    }

    fn prompt(&mut self, text: &str) -> io::Result<Option<String>> {
        if !self.interactive {
            writeln!(self.err, "[prompt] {} -> cancelled", text)?;
            return Ok(None);
        }
        self.ask(&format!("[prompt] {}", text))
    }

    fn warn(&mut self, text: &str) {
        let _ = writeln!(self.err, "[warn] {}", text);
    }

    fn canvas_size(&self) -> Option<(f64, f64)> {
        self.canvas
    }

    fn draw_sprite(&mut self, draw: SpriteDraw) {
        let _ = writeln!(
            self.err,
            "[canvas] {} at ({:.0}, {:.0}) size {}x{}",
            draw.name, draw.x, draw.y, draw.width, draw.height
        );
        self.draws.push(draw);
    }

    fn clear_canvas(&mut self) {
        self.draws.clear();
    }
}
