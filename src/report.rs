use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

use crate::models::{ResultPayload, WatchlistEntry};
use crate::session::{SessionId, SessionObserver, Termination};
use crate::stream::StreamEvent;
use crate::watchlist::{entry_trend, Delta, Direction};

/// Prints a live line per stream event to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_event(&self, _session: SessionId, event: &StreamEvent) {
        match event {
            StreamEvent::Progress(p) => println!("[{}/{}] {}", p.current, p.total, p.message),
            StreamEvent::ItemResult(r) => println!(
                "[{}/{}] {}{}",
                r.index + 1,
                r.total,
                r.item.title,
                if r.item.flagged { "  ⚑ flagged" } else { "" }
            ),
            StreamEvent::Failure(_) | StreamEvent::Complete(_) => {}
        }
    }

    fn on_terminated(&self, _session: SessionId, reason: &Termination) {
        match reason {
            Termination::Completed(summary) => println!(
                "{reason} ({} wallets cached, {} API calls)",
                summary.cached_key_count, summary.external_call_count
            ),
            _ => eprintln!("{reason}"),
        }
    }
}

fn pct(value: Option<Decimal>) -> String {
    value
        .map(|v| format!("{}%", (v * Decimal::ONE_HUNDRED).round_dp(1)))
        .unwrap_or_else(|| "n/a".into())
}

fn delta_cell(delta: Option<Delta>, scale: Decimal, suffix: &str) -> String {
    match delta {
        Some(d) => {
            let arrow = match d.direction {
                Direction::Up => "▲",
                Direction::Down => "▼",
            };
            format!("{arrow} {}{suffix}", (d.value.abs() * scale).round_dp(1))
        }
        None => String::new(),
    }
}

/// Table of the session's results.
pub fn results_table(results: &[ResultPayload]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Market", "Id", "YES", "NO", "YES profitable", "NO profitable", "Flag", "Score",
    ]);

    for r in results {
        table.add_row(vec![
            Cell::new(&r.title),
            Cell::new(&r.item_id),
            Cell::new(r.yes_price.round_dp(3)),
            Cell::new(r.no_price.round_dp(3)),
            Cell::new(pct(r.for_side.profitable_pct)),
            Cell::new(pct(r.against_side.profitable_pct)),
            Cell::new(if r.flagged { r.flagged_side.to_string() } else { String::new() }),
            Cell::new(r.imbalance_score.round_dp(2)),
        ]);
    }
    table
}

/// Table of pinned markets with their trend against the previous refresh.
pub fn watchlist_table(entries: &[WatchlistEntry]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Market", "Id", "YES", "Δ price", "YES profitable", "Δ profitable", "Snapshots", "Refreshed",
    ]);

    for entry in entries {
        let r = &entry.saved_result;
        let trend = entry_trend(entry);
        let refreshed = entry
            .last_refreshed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".into());

        table.add_row(vec![
            Cell::new(&r.title),
            Cell::new(&entry.item_id),
            Cell::new(r.yes_price.round_dp(3)),
            Cell::new(delta_cell(trend.price, Decimal::ONE_HUNDRED, "¢")),
            Cell::new(pct(r.for_side.profitable_pct)),
            Cell::new(delta_cell(trend.profitability, Decimal::ONE_HUNDRED, "pp")),
            Cell::new(entry.history.len()),
            Cell::new(refreshed),
        ]);
    }
    table
}
