use std::io::{IsTerminal, Write};

use crate::render::truncate_to_width;

/// Size of the area the cursor draws into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    /// Queried from the controlling terminal on demand.
    Terminal,
    /// A fixed size, for sinks that are not terminals. `rows: None` means
    /// unbounded: nothing ever scrolls out of view.
    ///
    /// With bounded rows, a header that has scrolled out of view is never
    /// repainted again, including its final icon. It keeps the glyph it
    /// showed last.
    Fixed { columns: usize, rows: Option<usize> },
}

const FALLBACK_SIZE: (usize, usize) = (80, 24);

/// Terminal output primitives over any [`std::io::Write`] target.
///
/// The cursor never addresses rows absolutely. It only knows relative
/// movements; callers track how many rows they printed. Printed rows are cut
/// to the viewport width, so every row occupies exactly one terminal line.
///
/// ```rust,ignore
/// let mut cursor = Cursor::stdout();
/// cursor.write_line("first")?;
/// cursor.move_up(1)?;
/// cursor.overwrite_line("replaced")?;
/// cursor.carriage_return()?;
/// cursor.move_down(1)?;
/// cursor.flush()?;
/// ```
pub struct Cursor {
    target: Box<dyn Write + Send>,
    viewport: Viewport,
    interactive: bool,
}

impl Cursor {
    pub fn new(target: impl Write + Send + 'static, viewport: Viewport) -> Self {
        Self {
            target: Box::new(target),
            viewport,
            interactive: true,
        }
    }

    pub fn stdout() -> Self {
        let interactive = std::io::stdout().is_terminal();
        Self {
            target: Box::new(std::io::stdout()),
            viewport: Viewport::Terminal,
            interactive,
        }
    }

    pub fn stderr() -> Self {
        let interactive = std::io::stderr().is_terminal();
        Self {
            target: Box::new(std::io::stderr()),
            viewport: Viewport::Terminal,
            interactive,
        }
    }

    /// Whether the target is a terminal that understands cursor visibility.
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn columns(&self) -> usize {
        match self.viewport {
            Viewport::Terminal => terminal_size().0,
            Viewport::Fixed { columns, .. } => columns,
        }
    }

    /// Visible rows, `None` when unbounded.
    pub fn rows(&self) -> Option<usize> {
        match self.viewport {
            Viewport::Terminal => Some(terminal_size().1),
            Viewport::Fixed { rows, .. } => rows,
        }
    }

    pub fn write_line(&mut self, text: &str) -> std::io::Result<()> {
        let text = truncate_to_width(text, self.columns());
        writeln!(self.target, "{text}")
    }

    /// Clears the current row and writes `text` on it, leaving the cursor on
    /// the same row.
    pub fn overwrite_line(&mut self, text: &str) -> std::io::Result<()> {
        self.carriage_return()?;
        self.clear_line()?;
        let text = truncate_to_width(text, self.columns());
        write!(self.target, "{text}")
    }

    pub fn clear_line(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\x1b[2K")
    }

    pub fn move_up(&mut self, n: usize) -> std::io::Result<()> {
        if n > 0 {
            write!(self.target, "\x1b[{n}A")?;
        }
        Ok(())
    }

    pub fn move_down(&mut self, n: usize) -> std::io::Result<()> {
        if n > 0 {
            write!(self.target, "\x1b[{n}B")?;
        }
        Ok(())
    }

    pub fn newline(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\n")
    }

    pub fn carriage_return(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\r")
    }

    pub fn hide(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\x1b[?25l")
    }

    pub fn show(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\x1b[?25h")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.target.flush()
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("viewport", &self.viewport)
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

fn terminal_size() -> (usize, usize) {
    crossterm::terminal::size()
        .map(|(columns, rows)| (columns as usize, rows as usize))
        .unwrap_or(FALLBACK_SIZE)
}
