use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

const EVENT_URL_BASE: &str = "https://polymarket.com/event";

// ---------------------------------------------------------------------------
// FlaggedSide
// ---------------------------------------------------------------------------

/// Which side of a market the server flagged as holder-imbalanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FlaggedSide {
    #[serde(rename = "YES", alias = "yes")]
    ForSide,
    #[serde(rename = "NO", alias = "no")]
    AgainstSide,
    #[default]
    #[serde(rename = "NONE", alias = "none")]
    None,
}

impl fmt::Display for FlaggedSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlaggedSide::ForSide => write!(f, "YES"),
            FlaggedSide::AgainstSide => write!(f, "NO"),
            FlaggedSide::None => write!(f, "-"),
        }
    }
}

fn deserialize_flagged_side<'de, D>(deserializer: D) -> Result<FlaggedSide, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<FlaggedSide>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// SideAnalysis
// ---------------------------------------------------------------------------

/// Aggregated holder profitability for one side of a market.
///
/// `profitable_count` and `losing_count` are subsets of `analyzed_count`;
/// the counts are not required to sum exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SideAnalysis {
    #[serde(default)]
    pub analyzed_count: u32,
    #[serde(default)]
    pub profitable_count: u32,
    #[serde(default)]
    pub losing_count: u32,
    #[serde(default)]
    pub unknown_count: u32,
    /// Share of analyzed holders in profit, in [0,1].
    #[serde(default)]
    pub profitable_pct: Option<Decimal>,
    /// Average market-scoped PNL across analyzed holders.
    #[serde(default)]
    pub avg_market_pnl: Option<Decimal>,
    /// Average account-lifetime PNL across analyzed holders.
    #[serde(default)]
    pub avg_lifetime_pnl: Option<Decimal>,
    #[serde(default)]
    pub total_position_size: Decimal,
    /// In [0,100].
    #[serde(default)]
    pub data_quality_score: Decimal,
}

impl SideAnalysis {
    fn validate(&self, side: &str) -> Result<(), String> {
        if let Some(pct) = self.profitable_pct {
            if !in_unit_range(pct) {
                return Err(format!("{side}.profitable_pct {pct} outside [0,1]"));
            }
        }
        if self.total_position_size < Decimal::ZERO {
            return Err(format!("{side}.total_position_size is negative"));
        }
        if self.data_quality_score < Decimal::ZERO || self.data_quality_score > Decimal::ONE_HUNDRED
        {
            return Err(format!(
                "{side}.data_quality_score {} outside [0,100]",
                self.data_quality_score
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HolderRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HolderRecord {
    #[serde(alias = "wallet_address")]
    pub wallet: String,
    #[serde(default, alias = "username")]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Decimal,
    #[serde(default)]
    pub market_pnl: Option<Decimal>,
    #[serde(default)]
    pub lifetime_pnl: Option<Decimal>,
    /// `None` when the leaderboard lookup was never attempted.
    #[serde(default)]
    pub on_leaderboard: Option<bool>,
}

impl HolderRecord {
    /// Display label: the leaderboard name if known, else a shortened wallet.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => {
                let chars: Vec<char> = self.wallet.chars().collect();
                if chars.len() > 10 {
                    let head: String = chars[..6].iter().collect();
                    let tail: String = chars[chars.len() - 4..].iter().collect();
                    format!("{head}…{tail}")
                } else {
                    self.wallet.clone()
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ResultPayload
// ---------------------------------------------------------------------------

/// The analysis of one market as produced server-side.
///
/// Immutable as observed by the core: it is copied and stored, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    /// Stable identity across refreshes.
    #[serde(alias = "condition_id")]
    pub item_id: String,
    #[serde(alias = "question")]
    pub title: String,
    #[serde(default)]
    pub event_slug: Option<String>,
    #[serde(default)]
    pub market_slug: Option<String>,
    pub yes_price: Decimal,
    pub no_price: Decimal,
    #[serde(rename = "yes_analysis")]
    pub for_side: SideAnalysis,
    #[serde(rename = "no_analysis")]
    pub against_side: SideAnalysis,
    #[serde(default, alias = "is_flagged")]
    pub flagged: bool,
    #[serde(default, deserialize_with = "deserialize_flagged_side")]
    pub flagged_side: FlaggedSide,
    #[serde(default)]
    pub imbalance_score: Decimal,
    #[serde(default, rename = "yes_holders")]
    pub for_holders: Vec<HolderRecord>,
    #[serde(default, rename = "no_holders")]
    pub against_holders: Vec<HolderRecord>,
}

impl ResultPayload {
    /// Reject payloads whose fields fall outside their documented domains.
    pub fn validate(&self) -> Result<(), String> {
        if self.item_id.trim().is_empty() {
            return Err("item_id is empty".into());
        }
        if !in_unit_range(self.yes_price) {
            return Err(format!("yes_price {} outside [0,1]", self.yes_price));
        }
        if !in_unit_range(self.no_price) {
            return Err(format!("no_price {} outside [0,1]", self.no_price));
        }
        self.for_side.validate("yes_analysis")?;
        self.against_side.validate("no_analysis")?;

        let negative_holder = self
            .for_holders
            .iter()
            .chain(self.against_holders.iter())
            .find(|h| h.amount < Decimal::ZERO);
        if let Some(holder) = negative_holder {
            return Err(format!("holder {} has a negative position", holder.wallet));
        }
        Ok(())
    }

    /// URL that re-runs the analysis for this market, if its slugs are known.
    pub fn market_url(&self) -> Option<String> {
        let event = self.event_slug.as_deref().filter(|s| !s.is_empty())?;
        match self.market_slug.as_deref().filter(|s| !s.is_empty()) {
            Some(market) if market != event => Some(format!("{EVENT_URL_BASE}/{event}/{market}")),
            _ => Some(format!("{EVENT_URL_BASE}/{event}")),
        }
    }
}

impl fmt::Display for ResultPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Market: id={} yes={} no={} flagged={} side={}",
            self.item_id.chars().take(10).collect::<String>(),
            self.yes_price,
            self.no_price,
            self.flagged,
            self.flagged_side,
        )
    }
}

fn in_unit_range(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "item_id": "0xabc",
            "title": "Will it rain?",
            "event_slug": "weather",
            "market_slug": "will-it-rain",
            "yes_price": 0.62,
            "no_price": 0.38,
            "yes_analysis": {
                "analyzed_count": 20,
                "profitable_count": 11,
                "losing_count": 7,
                "unknown_count": 2,
                "profitable_pct": 0.55,
                "avg_market_pnl": -120.5,
                "avg_lifetime_pnl": 4300.0,
                "total_position_size": 15000,
                "data_quality_score": 90
            },
            "no_analysis": {
                "analyzed_count": 10,
                "profitable_count": 2,
                "losing_count": 8,
                "unknown_count": 0,
                "profitable_pct": null,
                "total_position_size": 4000,
                "data_quality_score": 40
            },
            "flagged": true,
            "flagged_side": "YES",
            "imbalance_score": 2.4,
            "yes_holders": [
                { "wallet": "0x1234567890abcdef", "amount": 500, "market_pnl": 12.5, "on_leaderboard": true }
            ],
            "no_holders": []
        })
    }

    #[test]
    fn test_deserialize_payload() {
        let payload: ResultPayload = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(payload.item_id, "0xabc");
        assert_eq!(payload.flagged_side, FlaggedSide::ForSide);
        assert_eq!(payload.for_side.profitable_pct, Some(Decimal::new(55, 2)));
        assert_eq!(payload.against_side.profitable_pct, None);
        assert_eq!(payload.for_holders.len(), 1);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_null_flagged_side_is_none() {
        let mut raw = sample_json();
        raw["flagged_side"] = serde_json::Value::Null;
        let payload: ResultPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload.flagged_side, FlaggedSide::None);
    }

    #[test]
    fn test_validate_rejects_out_of_range_price() {
        let mut raw = sample_json();
        raw["yes_price"] = serde_json::json!(1.5);
        let payload: ResultPayload = serde_json::from_value(raw).unwrap();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn test_market_url() {
        let payload: ResultPayload = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(
            payload.market_url().as_deref(),
            Some("https://polymarket.com/event/weather/will-it-rain")
        );

        let mut bare = payload.clone();
        bare.market_slug = None;
        assert_eq!(bare.market_url().as_deref(), Some("https://polymarket.com/event/weather"));

        bare.event_slug = None;
        assert!(bare.market_url().is_none());
    }

    #[test]
    fn test_holder_label() {
        let holder = HolderRecord {
            wallet: "0x1234567890abcdef".into(),
            name: None,
            amount: Decimal::from(10),
            market_pnl: None,
            lifetime_pnl: None,
            on_leaderboard: None,
        };
        assert_eq!(holder.label(), "0x1234…cdef");
    }
}
