use std::fmt;

use crate::errors::QueryError;

const HOST_PREFIX: &str = "polymarket.com/event/";
const EVENT_URL_BASE: &str = "https://polymarket.com/event";

/// The market identifier sent to the analysis service, normalized to a full
/// event URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    pub event_slug: String,
    pub market_slug: Option<String>,
}

impl AnalysisQuery {
    /// Accepts `https://polymarket.com/event/<event>[/<market>]` with or
    /// without scheme and `www.`, or the bare `<event>[/<market>]` path of a
    /// shareable link. Anything after the slugs (query, fragment) is ignored.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(QueryError::Empty);
        }

        let rest = input
            .strip_prefix("https://")
            .or_else(|| input.strip_prefix("http://"))
            .unwrap_or(input);
        let rest = rest.strip_prefix("www.").unwrap_or(rest);

        let path = if rest
            .get(..HOST_PREFIX.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HOST_PREFIX))
        {
            &rest[HOST_PREFIX.len()..]
        } else if looks_like_host(rest) || rest.len() != input.len() {
            return Err(QueryError::NotPolymarket);
        } else {
            rest.strip_prefix("event/").unwrap_or(rest)
        };

        let (event_slug, tail) = take_slug(path);
        if event_slug.is_empty() {
            return Err(QueryError::NotPolymarket);
        }

        let market_slug = tail
            .strip_prefix('/')
            .map(|t| take_slug(t).0)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            event_slug: event_slug.to_string(),
            market_slug,
        })
    }

    pub fn url(&self) -> String {
        match &self.market_slug {
            Some(market) => format!("{EVENT_URL_BASE}/{}/{market}", self.event_slug),
            None => format!("{EVENT_URL_BASE}/{}", self.event_slug),
        }
    }
}

impl fmt::Display for AnalysisQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn take_slug(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !is_slug_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// A first path segment containing a dot is a hostname, not a slug.
fn looks_like_host(s: &str) -> bool {
    s.split('/').next().is_some_and(|first| first.contains('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_url() {
        let q = AnalysisQuery::parse("https://polymarket.com/event/fed-decision/fed-cuts-50bps").unwrap();
        assert_eq!(q.event_slug, "fed-decision");
        assert_eq!(q.market_slug.as_deref(), Some("fed-cuts-50bps"));
        assert_eq!(q.url(), "https://polymarket.com/event/fed-decision/fed-cuts-50bps");
    }

    #[test]
    fn test_without_scheme_and_with_query_string() {
        let q = AnalysisQuery::parse("  www.polymarket.com/event/nba-finals?tid=123 ").unwrap();
        assert_eq!(q.event_slug, "nba-finals");
        assert!(q.market_slug.is_none());
    }

    #[test]
    fn test_shareable_path() {
        let q = AnalysisQuery::parse("election-2028/who-wins").unwrap();
        assert_eq!(q.url(), "https://polymarket.com/event/election-2028/who-wins");

        let q = AnalysisQuery::parse("event/election-2028").unwrap();
        assert_eq!(q.url(), "https://polymarket.com/event/election-2028");
    }

    #[test]
    fn test_rejects_other_hosts_and_empty() {
        assert_eq!(AnalysisQuery::parse("   "), Err(QueryError::Empty));
        assert_eq!(
            AnalysisQuery::parse("https://example.com/event/x"),
            Err(QueryError::NotPolymarket)
        );
        assert_eq!(
            AnalysisQuery::parse("kalshi.com/markets/x"),
            Err(QueryError::NotPolymarket)
        );
        assert_eq!(
            AnalysisQuery::parse("https://polymarket.com/markets"),
            Err(QueryError::NotPolymarket)
        );
    }
}
