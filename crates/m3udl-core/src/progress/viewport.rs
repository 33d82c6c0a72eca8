/// Source of the terminal size, read on every redraw.
pub trait Viewport: Send {
    /// `(columns, rows)`.
    fn size(&self) -> (u16, u16);
}

/// The real terminal, falling back to 80x24 when stdout is not a tty.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalViewport;

impl Viewport for TerminalViewport {
    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((80, 24))
    }
}
