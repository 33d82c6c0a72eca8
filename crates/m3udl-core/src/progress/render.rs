//! Line layout for the panel. Pure functions of state and terminal size.

use crossterm::style::{style, Color, Stylize};

use super::state::{percent_color, StatusStyle, TransferState};
use crate::task::TaskId;

/// Width of the name column.
pub(super) const NAME_WIDTH: usize = 20;
/// Blank gap appended to a scrolling name before it wraps around.
pub(super) const SCROLL_GAP: usize = 5;
const TRUNCATED_WIDTH: usize = NAME_WIDTH - 3;
const COMPACT_NAME_WIDTH: usize = 10;
/// `"<name> ["`
const PREFIX_WIDTH: usize = NAME_WIDTH + 2;
/// `"] <label:7> <rate:10> <eta:15>"`
const SUFFIX_WIDTH: usize = 2 + 7 + 1 + 10 + 1 + 15;
/// Keeps the last column free so lines never wrap.
const RIGHT_MARGIN: usize = 2;

/// Whether `name` needs horizontal scrolling.
pub(super) fn scrolls(name: &str) -> bool {
    name.chars().count() > NAME_WIDTH
}

/// Next scroll position; wraps at `len + SCROLL_GAP`.
pub(super) fn next_scroll(name: &str, offset: usize) -> usize {
    let cycle = name.chars().count() + SCROLL_GAP;
    (offset + 1) % cycle
}

/// Name column, exactly `NAME_WIDTH` characters wide.
pub(super) fn name_field(state: &TransferState) -> String {
    let chars: Vec<char> = state.display_name.chars().collect();
    if chars.len() <= NAME_WIDTH {
        return format!("{:<width$}", state.display_name, width = NAME_WIDTH);
    }
    if state.status.is_terminal() {
        let head: String = chars[..TRUNCATED_WIDTH].iter().collect();
        return format!("{head}...");
    }
    let padded: Vec<char> = chars
        .iter()
        .copied()
        .chain(std::iter::repeat(' ').take(SCROLL_GAP))
        .collect();
    let start = state.scroll_offset % padded.len();
    padded
        .iter()
        .cycle()
        .skip(start)
        .take(NAME_WIDTH)
        .collect()
}

fn label_and_color(state: &TransferState) -> (String, Color, f64) {
    match state.status.style() {
        StatusStyle::Percent => match state.percent {
            Some(p) => (format!("{p:5.1}%"), percent_color(p), p),
            None => ("--".to_string(), Color::Blue, 0.0),
        },
        StatusStyle::Label {
            label,
            color,
            full_bar,
        } => (label.to_string(), color, if full_bar { 100.0 } else { 0.0 }),
    }
}

/// `width` cells: `:` for filled cells, `.` for a half-filled one, spaces after.
fn bar(percent: f64, width: usize, color: Color) -> String {
    let exact = percent.clamp(0.0, 100.0) / 100.0 * width as f64;
    let full = (exact.floor() as usize).min(width);
    let partial = full < width && exact - full as f64 >= 0.5;
    let mut cells = ":".repeat(full);
    if partial {
        cells.push('.');
    }
    let used = full + usize::from(partial);
    format!("{}{}", style(cells).with(color), " ".repeat(width - used))
}

/// Renders one task line for a terminal `cols` wide.
pub(super) fn task_line(state: &TransferState, cols: u16) -> String {
    let name = name_field(state);
    let (label, color, fill) = label_and_color(state);
    let bar_width = cols as isize - (PREFIX_WIDTH + SUFFIX_WIDTH + RIGHT_MARGIN) as isize;
    if bar_width <= 0 {
        return compact_line(&name, &label, color, state.rate.trim(), cols);
    }
    format!(
        "{} [{}] {} {:>10} {:<15}",
        name,
        bar(fill, bar_width as usize, color),
        style(format!("{label:>7}")).with(color),
        state.rate,
        state.eta
    )
}

/// Name, label and rate only, cut to `cols - 1` visible characters so the
/// line never wraps.
fn compact_line(name: &str, label: &str, color: Color, rate: &str, cols: u16) -> String {
    let mut room = usize::from(cols).saturating_sub(1);
    let short: String = name.chars().take(COMPACT_NAME_WIDTH).collect();
    let name = take_visible(&short, &mut room);
    let label = take_visible(&format!(" {label}"), &mut room);
    let rate = take_visible(&format!(" {rate}"), &mut room);
    if label.is_empty() {
        return name;
    }
    format!("{}{}{}", name, style(label).with(color), rate)
}

/// Up to `room` leading characters of `text`; `room` shrinks by what was taken.
fn take_visible(text: &str, room: &mut usize) -> String {
    let taken: String = text.chars().take(*room).collect();
    *room -= taken.chars().count();
    taken
}

/// Display order: Downloading, then Queued, then finished; id breaks ties.
pub(super) fn ordered<'a, I>(states: I) -> Vec<(TaskId, &'a TransferState)>
where
    I: IntoIterator<Item = (&'a TaskId, &'a TransferState)>,
{
    let mut rows: Vec<(TaskId, &TransferState)> =
        states.into_iter().map(|(id, s)| (*id, s)).collect();
    rows.sort_by_key(|(id, s)| (s.status.sort_rank(), *id));
    rows
}

/// All panel lines for the given terminal size. When the tasks don't fit in
/// `rows - margin` lines, the tail is replaced by a hidden-count line.
pub(super) fn panel_lines(
    rows_in_order: &[(TaskId, &TransferState)],
    cols: u16,
    rows: u16,
    margin: u16,
) -> Vec<String> {
    let usable = usize::from(rows.saturating_sub(margin).max(1));
    let total = rows_in_order.len();
    let shown = if total > usable { usable - 1 } else { total };
    let mut lines: Vec<String> = rows_in_order[..shown]
        .iter()
        .map(|(_, s)| task_line(s, cols))
        .collect();
    if shown < total {
        let mut room = usize::from(cols).saturating_sub(1);
        lines.push(take_visible(&format!("... and {} more", total - shown), &mut room));
    }
    lines
}
