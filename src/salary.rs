use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::NormalizedSalary;

// Fixed policy: hourly and monthly pay is annualized as full-time, whatever the job type
pub const HOURS_PER_WEEK: f64 = 40.0;
pub const WEEKS_PER_YEAR: f64 = 52.0;
pub const HOURS_PER_YEAR: f64 = HOURS_PER_WEEK * WEEKS_PER_YEAR;
pub const MONTHS_PER_YEAR: f64 = 12.0;

/// Bare amounts at or above this are read as annual pay.
const BARE_ANNUAL_THRESHOLD: f64 = 10_000.0;

const MANUAL_KEYWORDS: [&str; 10] = [
    "negotiable",
    "tbd",
    "tba",
    "n/a",
    "not specified",
    "unspecified",
    "market",
    "dependent",
    "undisclosed",
    "competitive",
];

const HOURLY_PATTERN: &str = r"(?i)/\s*(?:hr|hour)\b|\bper\s+hour\b|\ban\s+hour\b|\bhourly\b|\bhrs?\b";
const MONTHLY_PATTERN: &str = r"(?i)/\s*(?:mo|month)\b|\bper\s+month\b|\ba\s+month\b|\bmonthly\b|\bmo\b";
const ANNUAL_PATTERN: &str =
    r"(?i)/\s*(?:yr|year)\b|\bper\s+(?:year|annum)\b|\ba\s+year\b|\byearly\b|\bannual(?:ly)?\b|\byrs?\b";

// $120k - $150k, 25.50 to 30, $5,000, $25/hr - $30/hr
const AMOUNT_PATTERN: &str = r"(?i)(\$)?\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?(?:\s*(?:/\s*(?:hr|hour|yr|year|mo|month)\b|per\s+(?:hour|year|month|annum)\b|an?\s+(?:hour|year|month)\b))?(?:\s*(?:-|–|—|to)\s*\$?\s*(\d[\d,]*(?:\.\d+)?)\s*(k\b)?)?";

// Unit marker directly after an amount
const UNIT_TAIL_PATTERN: &str = r"(?i)^\s*(?:/\s*(?:hr|hour|yr|year|mo|month)\b|per\s+(?:hour|year|month|annum)\b|an?\s+(?:hour|year|month)\b|hourly\b|monthly\b|yearly\b|annually\b)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SalaryUnit {
    Hourly,
    Monthly,
    Annual,
}

impl SalaryUnit {
    fn annual_factor(&self) -> f64 {
        match self {
            SalaryUnit::Hourly => HOURS_PER_YEAR,
            SalaryUnit::Monthly => MONTHS_PER_YEAR,
            SalaryUnit::Annual => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParsedSalary {
    pub low: f64,
    pub high: Option<f64>,
    pub unit: SalaryUnit,
}

impl ParsedSalary {
    pub fn midpoint(&self) -> f64 {
        match self.high {
            Some(high) => (self.low + high) / 2.0,
            None => self.low,
        }
    }

    /// Whole-dollar annual equivalent of the midpoint.
    pub fn annual_amount(&self) -> f64 {
        (self.midpoint() * self.unit.annual_factor()).round()
    }

    pub fn display(&self) -> String {
        let factor = self.unit.annual_factor();
        let annual = |x: f64| x * factor;
        let hourly = |x: f64| annual(x) / HOURS_PER_YEAR;

        match (self.unit, self.high) {
            (SalaryUnit::Hourly, None) => format!(
                "{}/hr (~{}/yr)",
                format_money(self.low, 2),
                format_money(annual(self.low), 0)
            ),
            (SalaryUnit::Hourly, Some(high)) => format!(
                "{}–{}/hr (~{}–{}/yr)",
                format_money(self.low, 2),
                format_money(high, 2),
                format_money(annual(self.low), 0),
                format_money(annual(high), 0)
            ),
            (SalaryUnit::Annual, None) => format!(
                "{}/yr (~{}/hr)",
                format_money(self.low, 0),
                format_money(hourly(self.low), 2)
            ),
            (SalaryUnit::Annual, Some(high)) => format!(
                "{}–{}/yr (~{}–{}/hr)",
                format_money(self.low, 0),
                format_money(high, 0),
                format_money(hourly(self.low), 2),
                format_money(hourly(high), 2)
            ),
            (SalaryUnit::Monthly, None) => format!(
                "{}/mo (~{}/yr, ~{}/hr)",
                format_money(self.low, 0),
                format_money(annual(self.low), 0),
                format_money(hourly(self.low), 2)
            ),
            (SalaryUnit::Monthly, Some(high)) => format!(
                "{}–{}/mo (~{}–{}/yr, ~{}–{}/hr)",
                format_money(self.low, 0),
                format_money(high, 0),
                format_money(annual(self.low), 0),
                format_money(annual(high), 0),
                format_money(hourly(self.low), 2),
                format_money(hourly(high), 2)
            ),
        }
    }
}

/// Normalize a salary string. Unrecognized text is passed through untouched
/// with no annual amount; this never fails.
pub fn normalize(raw: &str) -> NormalizedSalary {
    match parse(raw) {
        Some(parsed) => {
            let normalized = NormalizedSalary {
                annual_amount: Some(parsed.annual_amount()),
                display: parsed.display(),
            };
            tracing::debug!(raw, display = %normalized.display, "normalized salary");
            normalized
        }
        None => NormalizedSalary {
            annual_amount: None,
            display: raw.to_string(),
        },
    }
}

pub fn parse(raw: &str) -> Option<ParsedSalary> {
    match try_parse(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(raw, error = %e, "salary parse failed");
            None
        }
    }
}

fn try_parse(raw: &str) -> Result<Option<ParsedSalary>> {
    let s = raw.trim();
    if s.is_empty() || MANUAL_KEYWORDS.contains(&s.to_lowercase().as_str()) {
        return Ok(None);
    }

    // Anything in parentheses is a previous conversion, e.g. "$5,000/mo (~$60,000/yr)"
    let primary = s.split('(').next().unwrap_or(s);

    let Some(amounts) = find_amounts(primary)? else {
        return Ok(None);
    };

    // The marker next to the amount wins; the rest of the text is a fallback
    let unit = match detect_unit(&amounts.span)? {
        Some(unit) => Some(unit),
        None => match detect_unit(primary)? {
            Some(unit) => Some(unit),
            None if primary.len() < s.len() => detect_unit(s)?,
            None => None,
        },
    };

    let unit = match unit {
        Some(unit) => unit,
        None if amounts.thousands => SalaryUnit::Annual,
        None if amounts.low >= BARE_ANNUAL_THRESHOLD => SalaryUnit::Annual,
        None => return Ok(None),
    };

    let (low, high) = match amounts.high {
        Some(high) if high < amounts.low => (high, Some(amounts.low)),
        Some(high) if high == amounts.low => (high, None),
        other => (amounts.low, other),
    };

    Ok(Some(ParsedSalary { low, high, unit }))
}

fn detect_unit(text: &str) -> Result<Option<SalaryUnit>> {
    let checks = [
        (HOURLY_PATTERN, SalaryUnit::Hourly),
        (MONTHLY_PATTERN, SalaryUnit::Monthly),
        (ANNUAL_PATTERN, SalaryUnit::Annual),
    ];
    for (pattern, unit) in checks {
        if Regex::new(pattern)?.is_match(text) {
            return Ok(Some(unit));
        }
    }
    Ok(None)
}

struct Amounts {
    low: f64,
    high: Option<f64>,
    thousands: bool,
    /// Matched amount text plus any unit marker right after it.
    span: String,
}

fn find_amounts(text: &str) -> Result<Option<Amounts>> {
    let re = Regex::new(AMOUNT_PATTERN)?;
    let tail = Regex::new(UNIT_TAIL_PATTERN)?;

    let mut fallback = None;
    for cap in re.captures_iter(text) {
        let Some(whole) = cap.get(0) else {
            continue;
        };
        let has_currency = cap.get(1).is_some();
        let Some(low) = cap.get(2).and_then(|m| parse_number(m.as_str())) else {
            continue;
        };
        let high = cap.get(4).and_then(|m| parse_number(m.as_str()));
        let low_k = cap.get(3).is_some();
        let high_k = cap.get(5).is_some();

        let scale = |value: f64, own_k: bool, other_k: bool| {
            // "120-150k" puts the suffix on the last bound only
            if own_k || (other_k && value < 1000.0) {
                value * 1000.0
            } else {
                value
            }
        };
        let amounts = Amounts {
            low: scale(low, low_k, high_k),
            high: high.map(|h| scale(h, high_k, low_k)),
            thousands: low_k || high_k,
            span: match tail.find(&text[whole.end()..]) {
                Some(unit) => format!("{}{}", whole.as_str(), unit.as_str()),
                None => whole.as_str().to_string(),
            },
        };

        if has_currency {
            return Ok(Some(amounts));
        }
        if fallback.is_none() {
            fallback = Some(amounts);
        }
    }

    Ok(fallback)
}

fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// `$` amount with thousands separators, rounded to `decimals` places.
pub fn format_money(amount: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, amount.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    match fraction {
        Some(f) => format!("{}${}.{}", sign, grouped, f),
        None => format!("{}${}", sign, grouped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_single() {
        let n = normalize("$25/hr");
        assert_eq!(n.annual_amount, Some(52000.0));
        assert_eq!(n.display, "$25.00/hr (~$52,000/yr)");
    }

    #[test]
    fn test_monthly_single() {
        let n = normalize("$5000/mo");
        assert_eq!(n.annual_amount, Some(60000.0));
        assert!(n.display.contains("60,000"));
        assert!(n.display.contains("28.85"));
        assert_eq!(n.display, "$5,000/mo (~$60,000/yr, ~$28.85/hr)");
    }

    #[test]
    fn test_annual_range_uses_mean() {
        let n = normalize("$120k-150k/yr");
        assert_eq!(n.annual_amount, Some(135000.0));
        assert_eq!(n.display, "$120,000–$150,000/yr (~$57.69–$72.12/hr)");
    }

    #[test]
    fn test_hourly_range() {
        let n = normalize("$25-30/hr");
        assert_eq!(n.annual_amount, Some(57200.0));
        assert_eq!(n.display, "$25.00–$30.00/hr (~$52,000–$62,400/yr)");
    }

    #[test]
    fn test_range_with_unit_on_each_bound() {
        let n = normalize("$150,000/yr - $190,000/yr");
        assert_eq!(n.annual_amount, Some(170000.0));
        assert_eq!(n.display, "$150,000–$190,000/yr (~$72.12–$91.35/hr)");

        let n = normalize("$25/hr - $30/hr");
        assert_eq!(n.annual_amount, Some(57200.0));
        assert_eq!(n.display, "$25.00–$30.00/hr (~$52,000–$62,400/yr)");

        let parsed = parse("$20 per hour to $24 per hour").unwrap();
        assert_eq!(parsed.low, 20.0);
        assert_eq!(parsed.high, Some(24.0));
        assert_eq!(parsed.unit, SalaryUnit::Hourly);
    }

    #[test]
    fn test_unit_next_to_amount_beats_later_text() {
        let n = normalize("$60,000 per year, 40 hrs per week");
        assert_eq!(n.annual_amount, Some(60000.0));
        assert_eq!(n.display, "$60,000/yr (~$28.85/hr)");

        let parsed = parse("$22 - $26 hourly, 20 hours a week").unwrap();
        assert_eq!(parsed.unit, SalaryUnit::Hourly);
        assert_eq!(parsed.high, Some(26.0));

        // No marker beside the amount: the rest of the text still decides
        assert_eq!(parse("Pay: $3,500 paid monthly").map(|p| p.unit), Some(SalaryUnit::Monthly));
    }

    #[test]
    fn test_unrecognized_passes_through() {
        let n = normalize("competitive");
        assert_eq!(n.annual_amount, None);
        assert_eq!(n.display, "competitive");

        let n = normalize("Depends on experience");
        assert_eq!(n.annual_amount, None);
        assert_eq!(n.display, "Depends on experience");

        let n = normalize("");
        assert_eq!(n.annual_amount, None);
        assert_eq!(n.display, "");
    }

    #[test]
    fn test_small_bare_amount_is_unrecognized() {
        // No unit and too small to be a yearly figure
        let n = normalize("$25");
        assert_eq!(n.annual_amount, None);
        assert_eq!(n.display, "$25");
    }

    #[test]
    fn test_k_suffix_and_bare_large_numbers_are_annual() {
        assert_eq!(normalize("120k").annual_amount, Some(120000.0));
        assert_eq!(normalize("$85,000").annual_amount, Some(85000.0));
        assert_eq!(normalize("$90K - $110K").annual_amount, Some(100000.0));
        assert_eq!(normalize("$120-150k").annual_amount, Some(135000.0));
    }

    #[test]
    fn test_unit_phrases() {
        assert_eq!(parse("$20 to $24 per hour").map(|p| p.unit), Some(SalaryUnit::Hourly));
        assert_eq!(parse("$4,000 a month").map(|p| p.unit), Some(SalaryUnit::Monthly));
        assert_eq!(parse("$80,000 per year").map(|p| p.unit), Some(SalaryUnit::Annual));
        assert_eq!(parse("$95,000 annually").map(|p| p.unit), Some(SalaryUnit::Annual));
    }

    #[test]
    fn test_word_markers_need_boundaries() {
        // "more" must not read as a monthly marker
        let parsed = parse("$80,000 or more").unwrap();
        assert_eq!(parsed.unit, SalaryUnit::Annual);
    }

    #[test]
    fn test_reversed_range_is_ordered() {
        let parsed = parse("$30-$25/hr").unwrap();
        assert_eq!(parsed.low, 25.0);
        assert_eq!(parsed.high, Some(30.0));
    }

    #[test]
    fn test_normalizing_a_display_string_is_stable() {
        let first = normalize("$5000/mo");
        let second = normalize(&first.display);
        assert_eq!(second.annual_amount, first.annual_amount);
        assert_eq!(second.display, first.display);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(52000.0, 0), "$52,000");
        assert_eq!(format_money(1234567.891, 2), "$1,234,567.89");
        assert_eq!(format_money(999.0, 0), "$999");
        assert_eq!(format_money(28.846153, 2), "$28.85");
        assert_eq!(format_money(0.0, 2), "$0.00");
    }

    #[test]
    fn test_full_time_constants() {
        assert_eq!(HOURS_PER_YEAR, 2080.0);
        assert_eq!(MONTHS_PER_YEAR, 12.0);
    }
}
