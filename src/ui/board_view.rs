//! Five-lane terminal rendering of the board.

use textwrap::wrap;

use crate::api::models::{Card, Column};

const MIN_LANE_WIDTH: usize = 16;
const LANE_GAP: usize = 2;

/// Render the board into five fixed lanes at the terminal's width.
pub fn print_board(cards: &[Card]) {
    let width = terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w as usize)
        .unwrap_or(100);
    print!("{}", render_board(cards, width));
}

/// Render the board as plain text, `total_width` columns wide.
pub fn render_board(cards: &[Card], total_width: usize) -> String {
    let lane_width =
        ((total_width.saturating_sub(LANE_GAP * 4)) / Column::ALL.len()).max(MIN_LANE_WIDTH);

    let lanes: Vec<Vec<String>> = Column::ALL
        .iter()
        .map(|column| lane_lines(cards, *column, lane_width))
        .collect();

    let height = lanes.iter().map(Vec::len).max().unwrap_or(0);
    let gap = " ".repeat(LANE_GAP);
    let mut out = String::new();
    for row in 0..height {
        let line = lanes
            .iter()
            .map(|lane| {
                let cell = lane.get(row).map(String::as_str).unwrap_or("");
                format!("{:<width$}", cell, width = lane_width)
            })
            .collect::<Vec<_>>()
            .join(&gap);
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn lane_lines(cards: &[Card], column: Column, width: usize) -> Vec<String> {
    let in_lane: Vec<&Card> = cards.iter().filter(|c| c.column == column).collect();

    let mut lines = vec![
        format!("{} ({})", column.title(), in_lane.len()),
        "-".repeat(width.min(24)),
    ];
    for card in in_lane {
        for (i, piece) in wrap(&card.title, width.saturating_sub(2)).iter().enumerate() {
            if i == 0 {
                lines.push(format!("* {}", piece));
            } else {
                lines.push(format!("  {}", piece));
            }
        }
        let mut meta = format!("  {}% {}", card.progress, card.priority.as_str());
        if let Some(deadline) = card.deadline {
            meta.push_str(&format!(" due {}", deadline.format("%b %d")));
        }
        lines.push(meta);
        if let Some(name) = card.assigned_to_name.as_deref() {
            lines.push(format!("  @{}", name));
        }
        lines.push(String::new());
    }
    lines
}
