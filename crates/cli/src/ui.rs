//! # Chat Window Rendering
//!
//! Draws the transcript, the input panel and the status bar from the current
//! [`App`] state.

use crate::app::App;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

/// The main rendering function.
pub fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Transcript
            Constraint::Length(3), // Input panel
            Constraint::Length(1), // Status bar
        ])
        .split(frame.size());

    render_transcript(frame, app, main_layout[0]);
    render_input_panel(frame, app, main_layout[1]);
    render_status_bar(frame, app, main_layout[2]);
}

fn render_transcript(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Q&A Data").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines = visible_lines(
        &app.transcript,
        inner.width as usize,
        inner.height as usize,
        app.scroll_back as usize,
    );
    let text = Paragraph::new(lines.join("\n")).style(Style::default().fg(Color::White));
    frame.render_widget(text, inner);
}

fn render_input_panel(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("> ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Paragraph::new(app.input_text.as_str()).style(Style::default().fg(Color::Yellow));
    frame.render_widget(input, inner);

    if !app.is_busy() {
        let cursor_x = inner.x + (app.input_text.chars().count() as u16).min(inner.width);
        frame.set_cursor(cursor_x, inner.y);
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = Paragraph::new(app.status.as_str())
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(status, area);
}

/// Wraps the transcript to `width` and returns the `height` lines ending
/// `scroll_back` lines above the bottom.
pub fn visible_lines(transcript: &[String], width: usize, height: usize, scroll_back: usize) -> Vec<String> {
    let wrapped: Vec<String> = transcript
        .iter()
        .flat_map(|line| wrap_line(line, width))
        .collect();
    let max_scroll = wrapped.len().saturating_sub(height);
    let end = wrapped.len() - scroll_back.min(max_scroll);
    let start = end.saturating_sub(height);
    wrapped[start..end].to_vec()
}

/// Word-wraps one line to `width` characters. Words longer than a line are split.
pub fn wrap_line(line: &str, width: usize) -> Vec<String> {
    if width == 0 || line.chars().count() <= width {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let current_len = current.chars().count();
            let needed = if current.is_empty() { word.len() } else { current_len + 1 + word.len() };
            if needed <= width {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.extend(word.iter());
                break;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                continue;
            }
            // A single word wider than the line.
            let rest = word.split_off(width);
            lines.push(word.iter().collect());
            word = rest;
        }
    }
    lines.push(current);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_line_breaks_on_words() {
        assert_eq!(
            wrap_line("total sales by store", 11),
            vec!["total sales", "by store"]
        );
        assert_eq!(wrap_line("short", 20), vec!["short"]);
        assert_eq!(wrap_line("", 20), vec![""]);
    }

    #[test]
    fn test_wrap_line_splits_long_words() {
        assert_eq!(wrap_line("abcdefgh ij", 3), vec!["abc", "def", "gh", "ij"]);
    }

    #[test]
    fn test_visible_lines_follow_bottom_and_scroll() {
        let transcript: Vec<String> = (1..=10).map(|i| format!("line {i}")).collect();

        assert_eq!(
            visible_lines(&transcript, 40, 3, 0),
            vec!["line 8", "line 9", "line 10"]
        );
        assert_eq!(
            visible_lines(&transcript, 40, 3, 2),
            vec!["line 6", "line 7", "line 8"]
        );
        // Scrolling past the top stops at the first line.
        assert_eq!(
            visible_lines(&transcript, 40, 3, 100),
            vec!["line 1", "line 2", "line 3"]
        );
        assert_eq!(visible_lines(&transcript[..2], 40, 3, 5).len(), 2);
    }
}
