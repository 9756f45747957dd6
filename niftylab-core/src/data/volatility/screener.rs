//! Scraping the current volatility index value from a company page.
//!
//! The page is fetched once and shared by both extraction strategies: the
//! first looks for any `<span>` whose text carries a rupee-prefixed number,
//! the second reads the `company-ratios` block line by line. Both yield a
//! single point dated `today`.

use super::{VolatilityError, VolatilityStrategy};
use crate::domain::VolatilityPoint;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const RUPEE: char = '\u{20b9}';

/// A lazily downloaded HTML page.
pub struct ScreenerPage {
    url: String,
    client: Option<reqwest::blocking::Client>,
    body: OnceLock<Result<String, String>>,
}

impl ScreenerPage {
    pub fn new(url: impl Into<String>) -> Result<Self, VolatilityError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
            )
            .default_headers(headers)
            .build()
            .map_err(|e| VolatilityError::Http(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client: Some(client),
            body: OnceLock::new(),
        })
    }

    /// A page whose HTML is already known; no request is ever made.
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        let body = OnceLock::new();
        let _ = body.set(Ok(html.into()));
        Self {
            url: url.into(),
            client: None,
            body,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn body(&self) -> Result<&str, VolatilityError> {
        self.body
            .get_or_init(|| self.download())
            .as_deref()
            .map_err(|e| VolatilityError::Http(e.clone()))
    }

    fn download(&self) -> Result<String, String> {
        let Some(client) = &self.client else {
            return Err("no HTTP client configured".into());
        };
        tracing::debug!(url = %self.url, "fetching volatility page");
        let resp = client.get(&self.url).send().map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(VolatilityError::HttpStatus {
                status: status.as_u16(),
            }
            .to_string());
        }
        resp.text().map_err(|e| e.to_string())
    }
}

/// Primary strategy: first `<span>` with a rupee-prefixed number.
pub struct SpanExtraction {
    page: Arc<ScreenerPage>,
    today: NaiveDate,
}

impl SpanExtraction {
    pub fn new(page: Arc<ScreenerPage>, today: NaiveDate) -> Self {
        Self { page, today }
    }
}

impl VolatilityStrategy for SpanExtraction {
    fn name(&self) -> &str {
        "screener_span"
    }

    fn extract(&self) -> Result<Vec<VolatilityPoint>, VolatilityError> {
        let html = self.page.body()?;
        let value = extract_from_spans(html)
            .ok_or_else(|| VolatilityError::NotFound(format!("no rupee span on {}", self.page.url())))?;
        Ok(vec![VolatilityPoint {
            date: self.today,
            index_value: value,
        }])
    }
}

/// Secondary strategy: first parseable rupee line inside `div.company-ratios`.
pub struct RatiosExtraction {
    page: Arc<ScreenerPage>,
    today: NaiveDate,
}

impl RatiosExtraction {
    pub fn new(page: Arc<ScreenerPage>, today: NaiveDate) -> Self {
        Self { page, today }
    }
}

impl VolatilityStrategy for RatiosExtraction {
    fn name(&self) -> &str {
        "screener_ratios"
    }

    fn extract(&self) -> Result<Vec<VolatilityPoint>, VolatilityError> {
        let html = self.page.body()?;
        let value = extract_from_ratios(html).ok_or_else(|| {
            VolatilityError::NotFound(format!("no rupee line in company-ratios on {}", self.page.url()))
        })?;
        Ok(vec![VolatilityPoint {
            date: self.today,
            index_value: value,
        }])
    }
}

fn span_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<span\b[^>]*>(.*?)</span>").ok())
        .as_ref()
}

fn tag_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok()).as_ref()
}

fn ratios_open_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<div\b[^>]*\bclass\s*=\s*["'][^"']*\bcompany-ratios\b[^"']*["'][^>]*>"#).ok()
    })
    .as_ref()
}

fn div_token_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").ok())
        .as_ref()
}

/// Parse text like `₹ 1,234.5` into a number.
fn parse_rupee(text: &str) -> Option<f64> {
    if !text.contains(RUPEE) {
        return None;
    }
    let cleaned: String = text
        .chars()
        .filter(|c| *c != RUPEE && *c != ',')
        .collect();
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn extract_from_spans(html: &str) -> Option<f64> {
    let tags = tag_re()?;
    span_re()?.captures_iter(html).find_map(|caps| {
        let text = tags.replace_all(&caps[1], "");
        parse_rupee(&text)
    })
}

pub fn extract_from_ratios(html: &str) -> Option<f64> {
    let open = ratios_open_re()?.find(html)?;
    let rest = &html[open.end()..];

    // Walk nested divs to find the block's closing tag.
    let mut depth = 1usize;
    let mut end = rest.len();
    for caps in div_token_re()?.captures_iter(rest) {
        if caps[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                end = caps.get(0).map_or(rest.len(), |m| m.start());
                break;
            }
        }
    }

    let text = tag_re()?.replace_all(&rest[..end], "\n");
    text.lines().find_map(parse_rupee)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 11).unwrap()
    }

    #[test]
    fn span_extraction_skips_unparseable_spans() {
        let html = r#"<div><span>₹ n/a</span><span class="number">₹ <b>13.92</b></span></div>"#;
        assert_eq!(extract_from_spans(html), Some(13.92));
    }

    #[test]
    fn span_extraction_handles_separators() {
        assert_eq!(extract_from_spans("<span>₹1,234.50</span>"), Some(1234.5));
    }

    #[test]
    fn span_extraction_none_without_rupee() {
        assert_eq!(extract_from_spans("<span>13.92</span>"), None);
    }

    #[test]
    fn ratios_extraction_reads_block_lines() {
        let html = r#"
            <span>Market Cap</span>
            <div class="card company-ratios">
              <div class="row"><span class="name">Current Price</span></div>
              <div class="row">₹ 14.07</div>
            </div>
            <div class="other">₹ 99</div>"#;
        assert_eq!(extract_from_ratios(html), Some(14.07));
    }

    #[test]
    fn ratios_extraction_stays_inside_block() {
        let html = r#"<div class="company-ratios"><div>none</div></div><div>₹ 99</div>"#;
        assert_eq!(extract_from_ratios(html), None);
    }

    #[test]
    fn strategies_share_preloaded_page() {
        let page = Arc::new(ScreenerPage::from_html(
            "https://example.invalid/vix",
            r#"<div class="company-ratios">₹ 15.5</div>"#,
        ));
        let span = SpanExtraction::new(Arc::clone(&page), today());
        let ratios = RatiosExtraction::new(page, today());

        assert!(matches!(span.extract(), Err(VolatilityError::NotFound(_))));
        let points = ratios.extract().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, today());
        assert_eq!(points[0].index_value, 15.5);
    }
}
