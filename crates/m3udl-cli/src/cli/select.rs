//! Interactive checklist for choosing which playlist entries to download.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{self, MoveTo};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use m3udl_core::format::format_size;
use m3udl_core::playlist::PlaylistEntry;

/// Idle time between horizontal scroll steps of the highlighted name.
const SCROLL_TICK: Duration = Duration::from_millis(300);
/// Gap after a long name before it scrolls back in.
const SCROLL_GAP: usize = 5;
/// Header plus footer lines.
const CHROME_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MenuAction {
    Continue,
    Confirm,
    Cancel,
}

/// Checklist state, independent of the terminal.
#[derive(Debug)]
pub(super) struct Menu<'a> {
    entries: &'a [PlaylistEntry],
    selected: Vec<bool>,
    cursor: usize,
    top: usize,
    hscroll: usize,
    message: Option<String>,
}

impl<'a> Menu<'a> {
    /// Every entry starts selected.
    pub(super) fn new(entries: &'a [PlaylistEntry]) -> Self {
        Self {
            entries,
            selected: vec![true; entries.len()],
            cursor: 0,
            top: 0,
            hscroll: 0,
            message: None,
        }
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) -> MenuAction {
        self.message = None;
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Char(' ') => {
                if let Some(s) = self.selected.get_mut(self.cursor) {
                    *s = !*s;
                }
            }
            KeyCode::Char('a') => self.selected.iter_mut().for_each(|s| *s = true),
            KeyCode::Char('n') => self.selected.iter_mut().for_each(|s| *s = false),
            KeyCode::Enter => {
                if self.selected.iter().any(|s| *s) {
                    return MenuAction::Confirm;
                }
                self.message = Some("Select at least one item, or press q to quit.".to_string());
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return MenuAction::Cancel;
            }
            KeyCode::Char('q') | KeyCode::Esc => return MenuAction::Cancel,
            _ => {}
        }
        MenuAction::Continue
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
        self.hscroll = 0;
    }

    /// Advances the highlighted name's horizontal scroll.
    pub(super) fn tick(&mut self) {
        self.hscroll = self.hscroll.wrapping_add(1);
    }

    pub(super) fn chosen(&self) -> Vec<PlaylistEntry> {
        self.entries
            .iter()
            .zip(&self.selected)
            .filter(|(_, s)| **s)
            .map(|(e, _)| e.clone())
            .collect()
    }

    fn selected_size(&self) -> u64 {
        self.entries
            .iter()
            .zip(&self.selected)
            .filter(|(_, s)| **s)
            .filter_map(|(e, _)| e.size)
            .sum()
    }

    /// Keeps the cursor within the visible window of `height` rows.
    fn scroll_into_view(&mut self, height: usize) {
        let height = height.max(1);
        if self.cursor < self.top {
            self.top = self.cursor;
        } else if self.cursor >= self.top + height {
            self.top = self.cursor + 1 - height;
        }
    }

    /// Screen lines for a `cols` x `rows` terminal.
    pub(super) fn lines(&mut self, cols: u16, rows: u16) -> Vec<String> {
        let cols = usize::from(cols).max(20);
        let list_height = usize::from(rows).saturating_sub(CHROME_LINES).max(1);
        self.scroll_into_view(list_height);

        let count = self.selected.iter().filter(|s| **s).count();
        let mut lines = vec![format!(
            "{}/{} selected, {}  [Space] toggle  [a] all  [n] none  [Enter] download  [q] quit",
            count,
            self.entries.len(),
            format_size(self.selected_size())
        )];

        let end = (self.top + list_height).min(self.entries.len());
        for i in self.top..end {
            let entry = &self.entries[i];
            let mark = if self.selected[i] { "x" } else { " " };
            let pointer = if i == self.cursor { ">" } else { " " };
            let size = entry.size.map(format_size).unwrap_or_else(|| "?".to_string());
            let fixed = format!("{pointer} [{mark}]  ({size})");
            let name_width = cols.saturating_sub(fixed.chars().count() + 1).max(8);
            let offset = if i == self.cursor { self.hscroll } else { 0 };
            let name = window(entry.display_label(), name_width, offset);
            lines.push(format!("{pointer} [{mark}] {name} ({size})"));
        }

        if let Some(msg) = &self.message {
            lines.push(msg.clone());
        }
        lines
    }
}

/// `width` characters of `text`, scrolled circularly by `offset` when it
/// doesn't fit.
fn window(text: &str, width: usize, offset: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= width {
        return format!("{text:<width$}");
    }
    let cycle = chars.len() + SCROLL_GAP;
    let start = offset % cycle;
    (0..width)
        .map(|i| chars.get((start + i) % cycle).copied().unwrap_or(' '))
        .collect()
}

/// Restores the terminal however the menu exits.
struct TermGuard;

impl TermGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        let guard = Self;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)
            .context("failed to enter alternate screen")?;
        Ok(guard)
    }
}

impl Drop for TermGuard {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, cursor::Show);
        let _ = terminal::disable_raw_mode();
    }
}

fn draw(out: &mut impl Write, menu: &mut Menu<'_>) -> Result<()> {
    let (cols, rows) = terminal::size().unwrap_or((80, 24));
    let lines = menu.lines(cols, rows);
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            queue!(out, Print(line.as_str().bold()), Print("\r\n"))?;
        } else if line.starts_with('>') {
            queue!(out, Print(line.as_str().reverse()), Print("\r\n"))?;
        } else {
            queue!(out, Print(line), Print("\r\n"))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Shows the checklist. Returns the chosen entries, or `None` if cancelled.
///
/// Blocking; run from `spawn_blocking` in async code.
pub(super) fn choose(entries: &[PlaylistEntry]) -> Result<Option<Vec<PlaylistEntry>>> {
    let _guard = TermGuard::enter()?;
    let mut out = io::stdout();
    let mut menu = Menu::new(entries);
    draw(&mut out, &mut menu)?;

    loop {
        if !event::poll(SCROLL_TICK)? {
            menu.tick();
            draw(&mut out, &mut menu)?;
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match menu.handle_key(key) {
                MenuAction::Continue => draw(&mut out, &mut menu)?,
                MenuAction::Confirm => return Ok(Some(menu.chosen())),
                MenuAction::Cancel => return Ok(None),
            },
            Event::Resize(_, _) => draw(&mut out, &mut menu)?,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(n: usize) -> Vec<PlaylistEntry> {
        (0..n)
            .map(|i| PlaylistEntry {
                tvg_id: format!("chan{i}"),
                tvg_name: String::new(),
                url: format!("http://x/{i}.mp4"),
                size: Some(1024),
            })
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn all_selected_initially_and_toggle() {
        let list = entries(3);
        let mut menu = Menu::new(&list);
        assert_eq!(menu.chosen().len(), 3);
        menu.handle_key(key(KeyCode::Down));
        menu.handle_key(key(KeyCode::Char(' ')));
        let chosen = menu.chosen();
        assert_eq!(chosen.len(), 2);
        assert!(chosen.iter().all(|e| e.tvg_id != "chan1"));
    }

    #[test]
    fn none_then_enter_is_refused() {
        let list = entries(2);
        let mut menu = Menu::new(&list);
        menu.handle_key(key(KeyCode::Char('n')));
        assert_eq!(menu.handle_key(key(KeyCode::Enter)), MenuAction::Continue);
        let lines = menu.lines(80, 24);
        assert!(lines.last().unwrap().contains("at least one"));
        menu.handle_key(key(KeyCode::Char('a')));
        assert_eq!(menu.handle_key(key(KeyCode::Enter)), MenuAction::Confirm);
    }

    #[test]
    fn quit_keys_cancel() {
        let list = entries(1);
        let mut menu = Menu::new(&list);
        assert_eq!(menu.handle_key(key(KeyCode::Char('q'))), MenuAction::Cancel);
        assert_eq!(menu.handle_key(key(KeyCode::Esc)), MenuAction::Cancel);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(menu.handle_key(ctrl_c), MenuAction::Cancel);
    }

    #[test]
    fn cursor_stays_in_bounds_and_visible() {
        let list = entries(10);
        let mut menu = Menu::new(&list);
        menu.handle_key(key(KeyCode::Up));
        assert_eq!(menu.cursor, 0);
        for _ in 0..20 {
            menu.handle_key(key(KeyCode::Down));
        }
        assert_eq!(menu.cursor, 9);
        // 3 list rows in a 6-row terminal.
        let lines = menu.lines(80, 6);
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("> [x] chan9"));
    }

    #[test]
    fn header_shows_selected_size() {
        let list = entries(2);
        let mut menu = Menu::new(&list);
        assert!(menu.lines(80, 24)[0].starts_with("2/2 selected, 2.00 KB"));
    }

    #[test]
    fn long_names_scroll_circularly() {
        assert_eq!(window("abc", 5, 3), "abc  ");
        assert_eq!(window("abcdefgh", 4, 0), "abcd");
        assert_eq!(window("abcdefgh", 4, 6), "gh  ");
        assert_eq!(window("abcdefgh", 4, 16), "defg");
    }
}
