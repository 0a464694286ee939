use crate::core::price::{DailyPrice, SpotQuote};
use crate::sync::state::{CurrentPriceState, HistoricalState};
use chrono::Local;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Price,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Price => style(text).green().bold(),
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

/// Formats an `Option<T>` into a `Cell`. `None` is displayed as "N/A".
pub fn format_optional_cell<T>(value: Option<T>, format_fn: impl Fn(T) -> String) -> Cell {
    value.map_or(
        Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right),
        |v| Cell::new(format_fn(v)).set_alignment(CellAlignment::Right),
    )
}

pub fn format_price(price: f64, currency: &str) -> String {
    format!("{price:.2} {}", currency.to_uppercase())
}

/// Creates a spinner shown while a refresh is in flight.
pub fn new_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(spinner_style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn render_current_price(state: &CurrentPriceState) -> String {
    let body = match state {
        CurrentPriceState::Pending => style_text("Fetching current price...", StyleType::Subtle),
        CurrentPriceState::Ready(SpotQuote {
            price,
            currency,
            as_of,
        }) => {
            let mut line = style_text(&format_price(*price, currency), StyleType::Price);
            if let Some(as_of) = as_of {
                let updated = as_of.with_timezone(&Local).format("%b %-d, %Y %H:%M:%S");
                line.push_str(&style_text(
                    &format!("  (updated {updated})"),
                    StyleType::Subtle,
                ));
            }
            line
        }
        CurrentPriceState::Failed(message) => style_text(message, StyleType::Error),
    };
    format!(
        "{}\n{}",
        style_text("Current Price (BTC)", StyleType::Title),
        body
    )
}

pub fn render_history(state: &HistoricalState, currency: &str, window_size_days: u32) -> String {
    let title = style_text(
        &format!("Last {window_size_days} Days (Daily)"),
        StyleType::Title,
    );
    let body = match state {
        HistoricalState::Pending => style_text("Fetching history...", StyleType::Subtle),
        HistoricalState::Failed(message) => style_text(message, StyleType::Error),
        HistoricalState::Ready(prices) if prices.is_empty() => {
            style_text("No historical data available.", StyleType::Subtle)
        }
        HistoricalState::Ready(prices) => {
            let mut table = new_styled_table();
            table.set_header(vec![header_cell("Date"), header_cell("Price")]);
            for daily in prices {
                table.add_row(vec![
                    Cell::new(daily.day().to_string()),
                    format_optional_cell(daily.price(currency), |p| format_price(p, currency)),
                ]);
            }
            table.to_string()
        }
    };
    format!("{title}\n{body}")
}

pub fn render_day_detail(daily: &DailyPrice) -> String {
    let mut table = new_styled_table();
    table.set_header(vec![header_cell("Currency"), header_cell("Price")]);
    for (currency, price) in daily.prices() {
        table.add_row(vec![
            Cell::new(currency.to_uppercase()),
            Cell::new(format_price(*price, currency)).set_alignment(CellAlignment::Right),
        ]);
    }
    format!(
        "{}\n{}",
        style_text(
            &format!("Price Details: {}", daily.day()),
            StyleType::Title
        ),
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::DayNumber;

    #[test]
    fn test_render_history_table() {
        let mut daily = DailyPrice::new(DayNumber::new(20_229));
        daily.set_price("eur", 94_000.5);
        let state = HistoricalState::Ready(vec![daily]);

        let output = console::strip_ansi_codes(&render_history(&state, "eur", 14)).to_string();

        assert!(output.contains("Last 14 Days (Daily)"));
        assert!(output.contains("2025-05-21"));
        assert!(output.contains("94000.50 EUR"));
    }

    #[test]
    fn test_render_failed_sections() {
        let current = CurrentPriceState::Failed("Failed to load current price: boom".to_string());
        let history = HistoricalState::Failed("Failed to load history: boom".to_string());

        assert!(render_current_price(&current).contains("Failed to load current price: boom"));
        assert!(render_history(&history, "eur", 14).contains("Failed to load history: boom"));
    }

    #[test]
    fn test_render_day_detail_lists_currencies() {
        let mut daily = DailyPrice::new(DayNumber::new(20_229));
        daily.set_price("usd", 2.0);
        daily.set_price("gbp", 1.0);

        let output = console::strip_ansi_codes(&render_day_detail(&daily)).to_string();
        assert!(output.contains("GBP"));
        assert!(output.contains("2.00 USD"));
    }
}
