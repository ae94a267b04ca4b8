use rust_decimal::Decimal;

use crate::models::{HistorySnapshot, WatchlistEntry};

/// Deltas at or below this magnitude are floating-point noise, not trend.
pub const DELTA_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A displayable signed change. The magnitude is unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    pub value: Decimal,
    pub direction: Direction,
}

impl Delta {
    fn between(current: Decimal, prior: Decimal) -> Option<Self> {
        let value = current - prior;
        if value.abs() <= DELTA_EPSILON {
            return None;
        }
        let direction = if value.is_sign_positive() {
            Direction::Up
        } else {
            Direction::Down
        };
        Some(Self { value, direction })
    }
}

/// Change of the YES side since the most recent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trend {
    pub price: Option<Delta>,
    pub profitability: Option<Delta>,
}

impl Trend {
    pub fn is_flat(&self) -> bool {
        self.price.is_none() && self.profitability.is_none()
    }
}

/// Compare the current YES price and profitable share against `prior`.
/// With no prior snapshot there is nothing to compare and no delta.
pub fn compute_trend(
    current_price: Decimal,
    current_profitable_pct: Option<Decimal>,
    prior: Option<&HistorySnapshot>,
) -> Trend {
    let Some(prior) = prior else {
        return Trend::default();
    };

    let profitability = match (current_profitable_pct, prior.yes_profitable_pct) {
        (Some(now), Some(then)) => Delta::between(now, then),
        _ => None,
    };

    Trend {
        price: Delta::between(current_price, prior.yes_price),
        profitability,
    }
}

/// Trend of an entry's saved result against `history[0]`.
pub fn entry_trend(entry: &WatchlistEntry) -> Trend {
    compute_trend(
        entry.saved_result.yes_price,
        entry.saved_result.for_side.profitable_pct,
        entry.latest_snapshot(),
    )
}
