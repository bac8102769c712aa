use crate::core::analytics::Direction;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Positive,
    Negative,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Positive => style(text).green().bold(),
        StyleType::Negative => style(text).red().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned currency cell.
pub fn money_cell(value: f64) -> Cell {
    Cell::new(format_inr(value)).set_alignment(CellAlignment::Right)
}

/// Signed, colored amount cell: green `+` for credits, red `-` otherwise.
pub fn amount_cell(amount: f64, direction: Direction) -> Cell {
    let (sign, color) = match direction {
        Direction::Credit => ("+", Color::Green),
        Direction::Debit => ("-", Color::Red),
    };
    Cell::new(format!("{sign} {}", format_inr(amount)))
        .fg(color)
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Right)
}

pub fn direction_cell(direction: Direction) -> Cell {
    match direction {
        Direction::Credit => Cell::new("Credit").fg(Color::Green),
        Direction::Debit => Cell::new("Debit").fg(Color::Red),
    }
    .set_alignment(CellAlignment::Center)
}

/// Formats rupees with Indian digit grouping, e.g. `₹12,34,567.89`.
pub fn format_inr(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::new();
    if whole.len() > 3 {
        let (head, tail) = whole.split_at(whole.len() - 3);
        let head_groups: Vec<&str> = head
            .as_bytes()
            .rchunks(2)
            .rev()
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .collect();
        grouped.push_str(&head_groups.join(","));
        grouped.push(',');
        grouped.push_str(tail);
    } else {
        grouped.push_str(whole);
    }

    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}₹{grouped}.{fraction}")
}

/// Creates a spinner for work of unknown length.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// A separator line matching the terminal width.
pub fn separator() -> String {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    "─".repeat(term_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(0.0), "₹0.00");
        assert_eq!(format_inr(999.5), "₹999.50");
        assert_eq!(format_inr(1000.0), "₹1,000.00");
        assert_eq!(format_inr(123456.789), "₹1,23,456.79");
        assert_eq!(format_inr(12345678.0), "₹1,23,45,678.00");
        assert_eq!(format_inr(-2500.0), "-₹2,500.00");
        assert_eq!(format_inr(-0.001), "₹0.00");
    }

    #[test]
    fn test_amount_cell_sign() {
        assert_eq!(amount_cell(10.0, Direction::Credit).content(), "+ ₹10.00");
        assert_eq!(amount_cell(10.0, Direction::Debit).content(), "- ₹10.00");
    }
}
