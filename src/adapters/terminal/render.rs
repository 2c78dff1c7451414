//! Frame formatting for the ANSI dashboard.
//!
//! Pure functions from `DashboardView` to text. Colour codes are
//! embedded directly; the caller decides where the text goes.

use std::fmt::Write as _;

use crate::domain::aggregate::{Aggregate, Freshness};
use crate::usecases::dashboard::{AssetPanel, DashboardView, QuoteRow};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Clear the screen and home the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const RULE: &str = "==========================================================";
const THIN_RULE: &str = "----------------------------------------------------------";
const WAITING_PAIR: &str = "waiting for both sources...";

/// Format a price as `$65,000.00`.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{frac_part}")
}

/// Age column text with its colour.
pub fn format_freshness(freshness: Freshness) -> String {
    match freshness {
        Freshness::Waiting => format!("{YELLOW}waiting...{RESET}"),
        Freshness::Live => format!("{DIM}<1s{RESET}"),
        Freshness::Recent(age) => format!("{DIM}{:.0}s{RESET}", age.as_secs_f64().round()),
        Freshness::Stale(age) => format!("{RED}{:.0}s{RESET}", age.as_secs_f64().round()),
    }
}

fn format_row(out: &mut String, row: &QuoteRow) {
    let price = row
        .price
        .map_or_else(|| "-".to_string(), format_price);
    let _ = writeln!(
        out,
        "  {:<12}{:<12}{BOLD}{:>16}{RESET}   {}",
        row.key.source.to_string(),
        row.key.pair(),
        price,
        format_freshness(row.freshness),
    );
}

fn format_pair_line(out: &mut String, label: &str, aggregate: &Aggregate) {
    match aggregate.summary() {
        Some(s) => {
            let _ = writeln!(
                out,
                "  {label:<14}{GREEN}{BOLD}{:>16}{RESET}   {DIM}spread {}{RESET}",
                format_price(s.average),
                format_price(s.spread),
            );
        }
        None => {
            let _ = writeln!(out, "  {label:<14}{YELLOW}{WAITING_PAIR}{RESET}");
        }
    }
}

fn format_panel(out: &mut String, panel: &AssetPanel) {
    let asset = panel.asset;

    let _ = writeln!(out, "  {BOLD}{:<12}{:<12}{:>16}   AGE{RESET}", "SOURCE", "PAIR", "PRICE");
    let _ = writeln!(out, "  {DIM}{THIN_RULE}{RESET}");
    for row in &panel.rows {
        format_row(out, row);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {BOLD}{CYAN}{asset} CROSS-SOURCE AVERAGES{RESET}");
    let _ = writeln!(out, "  {DIM}{THIN_RULE}{RESET}");
    format_pair_line(out, &format!("{asset}/USD"), &panel.usd_pair);
    format_pair_line(out, &format!("{asset}/USDT"), &panel.usdt_pair);

    if let Some(s) = panel.multi_source.summary() {
        let _ = writeln!(
            out,
            "  {:<14}{GREEN}{BOLD}{:>16}{RESET}   {DIM}range {} ({} sources){RESET}",
            format!("{asset} ALL"),
            format_price(s.average),
            format_price(s.spread),
            s.sources,
        );
    }

    if let Some(grand) = panel.grand {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {BOLD}{:<14}{GREEN}{:>16}{RESET}   {DIM}({} sources){RESET}",
            "GRAND AVG",
            format_price(grand.average),
            grand.sources,
        );
    }
}

/// Render a full frame, without the clear-screen prefix.
pub fn render(view: &DashboardView) -> String {
    let mut out = String::with_capacity(2048);

    let _ = writeln!(out, "{BOLD}{CYAN}  {RULE}{RESET}");
    let _ = writeln!(
        out,
        "{BOLD}     {}  |  Binance / Coinbase / Chainlink{RESET}",
        view.title
    );
    let _ = writeln!(out, "{BOLD}{CYAN}  {RULE}{RESET}");

    for panel in &view.panels {
        let _ = writeln!(out);
        format_panel(&mut out, panel);
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {DIM}Updated: {}  |  Ctrl+C to exit{RESET}",
        view.updated_at.format("%H:%M:%S")
    );
    out
}
