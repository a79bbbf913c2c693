//! Cell parsers
//!
//! Stateless conversions from raw spreadsheet text into typed values. Every
//! parser degrades to `None` (or an empty string) instead of failing, so one
//! bad cell never takes a whole report down.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use rust_decimal::Decimal;

/// Placeholder rendered for undefined values
pub const PLACEHOLDER: &str = "—";

static PLAIN_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:[.,]\d+)?$").expect("valid regex"));
static CLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").expect("valid regex"));
static HOURS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:horas|hora|hours|hour|hrs|hr|h)\b").expect("valid regex")
});
static MINUTES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:[.,]\d+)?)\s*(?:minutos|minuto|minutes|minute|mins|min|m)\b")
        .expect("valid regex")
});
static FIRST_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("valid regex"));

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})(?:[\sT,].*)?$").expect("valid regex")
});
static YMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[/.\-](\d{1,2})[/.\-](\d{1,2})(?:[\sT].*)?$").expect("valid regex")
});
static DAY_MONTH_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:\s+de\s+|[\s/.\-]+)(\p{L}+)\.?(?:\s+de\s+|[\s/.\-,]+)(\d{4}|\d{2})(?:[\sT,].*)?$")
        .expect("valid regex")
});
static MONTH_NAME_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\p{L}+)\.?\s+(\d{1,2}),?\s+(\d{4})$").expect("valid regex")
});
static SERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(?:\.\d+)?$").expect("valid regex"));

static MONEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("valid regex"));
static THOUSANDS_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[1-9]\d{0,2}\.\d{3}$").expect("valid regex"));

static CLIENT_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?\S)(?:\s*[-#]\s*|\s+)(?:(?:n[º°o]|num)\.?\s*)?\d+$").expect("valid regex")
});

/// Three-letter month prefixes, Portuguese and English
const MONTH_PREFIXES: [(&str, u32); 19] = [
    ("jan", 1),
    ("fev", 2),
    ("feb", 2),
    ("mar", 3),
    ("abr", 4),
    ("apr", 4),
    ("mai", 5),
    ("may", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("aug", 8),
    ("set", 9),
    ("sep", 9),
    ("out", 10),
    ("oct", 10),
    ("nov", 11),
    ("dez", 12),
    ("dec", 12),
];

const CURRENCY_SYMBOLS: [&str; 5] = ["R$", "US$", "$", "€", "£"];

fn decimal_number(s: &str) -> Option<f64> {
    s.replace(',', ".").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a duration cell into minutes
///
/// Accepts a bare number (minutes), `HH:MM` / `HH:MM:SS`, or free text with
/// hour and minute tokens in Portuguese or English ("2 horas e 30 minutos",
/// "1 hour 20 min", "90 min"). Falls back to the first number in the text,
/// read as minutes. Returns `None` only when the text has no number at all.
pub fn parse_duration(raw: &str) -> Option<f64> {
    let s = raw.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }

    if PLAIN_NUMBER_RE.is_match(&s) {
        return decimal_number(&s);
    }

    if let Some(caps) = CLOCK_RE.captures(&s) {
        let hours: f64 = caps[1].parse().ok()?;
        let minutes: f64 = caps[2].parse().ok()?;
        let seconds: f64 = match caps.get(3) {
            Some(sec) => sec.as_str().parse().ok()?,
            None => 0.0,
        };
        return Some(hours * 60.0 + minutes + seconds / 60.0);
    }

    // Hour and minute tokens are matched independently and summed
    let hours = HOURS_RE.captures(&s).and_then(|c| decimal_number(&c[1]));
    let minutes = MINUTES_RE.captures(&s).and_then(|c| decimal_number(&c[1]));
    if hours.is_some() || minutes.is_some() {
        return Some(hours.unwrap_or(0.0) * 60.0 + minutes.unwrap_or(0.0));
    }

    FIRST_NUMBER_RE
        .captures(&s)
        .and_then(|c| decimal_number(&c[1]))
}

/// Render minutes compactly: `2h e 9 min`, `2h`, `45 min`, or `—`
pub fn format_duration(minutes: Option<f64>) -> String {
    let Some(minutes) = minutes.filter(|m| !m.is_nan()) else {
        return PLACEHOLDER.to_string();
    };
    let total = minutes.max(0.0).round() as i64;
    let (h, m) = (total / 60, total % 60);
    if h > 0 && m > 0 {
        format!("{h}h e {m} min")
    } else if h > 0 {
        format!("{h}h")
    } else {
        format!("{m} min")
    }
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).flat_map(char::to_lowercase).collect();
    MONTH_PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, month)| *month)
}

/// Parse a date cell, day before month
///
/// Handles `05/01/2026`, `5-1-26`, `05.01.2026`, ISO `2026-01-05`, an optional
/// trailing time part, month names (`05 jan 2026`, `5 de janeiro de 2026`,
/// `Jan 5, 2026`) and spreadsheet serial day numbers.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = YMD_RE.captures(s) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }

    if let Some(caps) = DMY_RE.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let mut year: i32 = caps[3].parse().ok()?;
        if caps[3].len() == 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = DAY_MONTH_NAME_RE.captures(s) {
        let mut year: i32 = caps[3].parse().ok()?;
        if caps[3].len() == 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month_number(&caps[2])?, caps[1].parse().ok()?);
    }

    if let Some(caps) = MONTH_NAME_DAY_RE.captures(s) {
        return NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            month_number(&caps[1])?,
            caps[2].parse().ok()?,
        );
    }

    if SERIAL_RE.is_match(s) {
        let serial: f64 = s.parse().ok()?;
        if (20_000.0..=80_000.0).contains(&serial) {
            // Spreadsheet epoch is 1899-12-30 (1900 leap year bug)
            let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            return base.checked_add_signed(Duration::days(serial as i64));
        }
    }

    None
}

/// Parse a monetary cell
///
/// Currency symbols and whitespace are dropped. When both `.` and `,` appear,
/// the last one is the decimal separator; a lone `,` is a decimal comma;
/// `1.234` with exactly three trailing digits is read as a thousands group.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let mut s = raw.trim().to_string();
    for symbol in CURRENCY_SYMBOLS {
        s = s.replace(symbol, "");
    }
    let mut s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].to_string();
    }

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    let normalized = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if dot > comma => s.replace(',', ""),
        (_, Some(_)) if s.matches(',').count() > 1 && last_dot.is_none() => s.replace(',', ""),
        (_, Some(_)) => s.replace('.', "").replace(',', "."),
        (Some(_), None) if s.matches('.').count() > 1 => s.replace('.', ""),
        (Some(_), None) if THOUSANDS_ONLY_RE.is_match(&s) => s.replace('.', ""),
        _ => s,
    };

    if !MONEY_RE.is_match(&normalized) {
        return None;
    }
    let amount = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -amount } else { amount })
}

/// Canonical client name: trailing numbering removed, whitespace collapsed
///
/// "Acme 01", "Acme-2", "Acme #3" and "Acme nº 4" all become "Acme". The
/// suffix is stripped until none is left, so the function is idempotent.
pub fn client_base_name(raw: &str) -> String {
    let mut name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    while let Some(caps) = CLIENT_SUFFIX_RE.captures(&name) {
        let stripped = caps[1].trim_end().to_string();
        if stripped == name {
            break;
        }
        name = stripped;
    }
    name
}

/// Hour of day from a start-time cell (`13:00`, `8:30:00`, or a date-time)
pub fn parse_hour(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(caps) = CLOCK_RE.captures(s) {
        let hour: u32 = caps[1].parse().ok()?;
        return (hour <= 23).then_some(hour);
    }

    const FORMATS: [&str; 5] = [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.hour())
}

/// Loose numeric parse for quantity columns; anything else is `None`
pub fn parse_count(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if PLAIN_NUMBER_RE.is_match(s) {
        decimal_number(s)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_clock_formats() {
        assert_eq!(parse_duration("01:30"), Some(90.0));
        assert_eq!(parse_duration("0:45"), Some(45.0));
        assert_eq!(parse_duration("02:00:30"), Some(120.5));
        for h in 0..24 {
            for m in [0, 7, 30, 59] {
                let raw = format!("{h:02}:{m:02}");
                assert_eq!(parse_duration(&raw), Some((60 * h + m) as f64), "{raw}");
            }
        }
    }

    #[test]
    fn test_parse_duration_bare_number() {
        assert_eq!(parse_duration("90"), Some(90.0));
        assert_eq!(parse_duration(" 42.5 "), Some(42.5));
        assert_eq!(parse_duration("1,5"), Some(1.5));
    }

    #[test]
    fn test_parse_duration_text_tokens() {
        assert_eq!(parse_duration("2 horas e 30 minutos"), Some(150.0));
        assert_eq!(parse_duration("1 hora"), Some(60.0));
        assert_eq!(parse_duration("50 minutos"), Some(50.0));
        assert_eq!(parse_duration("1 hour 20 minutes"), Some(80.0));
        assert_eq!(parse_duration("1h 20m"), Some(80.0));
        assert_eq!(parse_duration("90 min"), Some(90.0));
        assert_eq!(parse_duration("1,5 horas"), Some(90.0));
    }

    #[test]
    fn test_parse_duration_fallback_and_none() {
        assert_eq!(parse_duration("cerca de 40"), Some(40.0));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("   "), None);
        assert_eq!(parse_duration("sem registro"), None);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(129.0)), "2h e 9 min");
        assert_eq!(format_duration(Some(120.0)), "2h");
        assert_eq!(format_duration(Some(45.0)), "45 min");
        assert_eq!(format_duration(Some(0.0)), "0 min");
        assert_eq!(format_duration(Some(-30.0)), "0 min");
        assert_eq!(format_duration(Some(89.6)), "1h e 30 min");
        assert_eq!(format_duration(None), "—");
    }

    #[test]
    fn test_format_duration_output_shape() {
        let shape = Regex::new(r"^(\d+h e \d+ min|\d+h|\d+ min|—)$").unwrap();
        for raw in ["0", "1", "59", "60", "61", "150", "1:05", "2 horas", "abc", "-10"] {
            let once = format_duration(parse_duration(raw));
            assert!(shape.is_match(&once), "{raw} -> {once}");
            let twice = format_duration(parse_duration(&once));
            assert!(shape.is_match(&twice), "{once} -> {twice}");
        }
    }

    #[test]
    fn test_parse_date_day_first() {
        let jan5 = NaiveDate::from_ymd_opt(2026, 1, 5);
        assert_eq!(parse_date("05/01/2026"), jan5);
        assert_eq!(parse_date("5/1/2026"), jan5);
        assert_eq!(parse_date("05-01-2026"), jan5);
        assert_eq!(parse_date("05.01.26"), jan5);
        assert_eq!(parse_date("2026-01-05"), jan5);
        assert_eq!(parse_date("05/01/2026 13:00:00"), jan5);
        assert_eq!(parse_date("46027"), jan5);
    }

    #[test]
    fn test_parse_date_month_names() {
        let jan5 = NaiveDate::from_ymd_opt(2026, 1, 5);
        assert_eq!(parse_date("05 jan 2026"), jan5);
        assert_eq!(parse_date("5 de janeiro de 2026"), jan5);
        assert_eq!(parse_date("05-Jan-26"), jan5);
        assert_eq!(parse_date("Jan 5, 2026"), jan5);
        assert_eq!(parse_date("7 de março de 2026"), NaiveDate::from_ymd_opt(2026, 3, 7));
        assert_eq!(parse_date("25 Dez 2025"), NaiveDate::from_ymd_opt(2025, 12, 25));
        assert_eq!(parse_date("31 fev 2026"), None);
        assert_eq!(parse_date("5 de amanhã de 2026"), None);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("31/02/2026"), None);
        assert_eq!(parse_date("13/13/2026"), None);
        assert_eq!(parse_date("amanhã"), None);
        assert_eq!(parse_date("2026"), None);
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("R$ 1.234,56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_money("1234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_money("1,234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_money("350,00"), Some(Decimal::new(35000, 2)));
        assert_eq!(parse_money("1.500"), Some(Decimal::new(1500, 0)));
        assert_eq!(parse_money("R$\u{a0}2.000.000,10"), Some(Decimal::new(200000010, 2)));
        assert_eq!(parse_money("(50,00)"), Some(Decimal::new(-5000, 2)));
        assert_eq!(parse_money("-12.5"), Some(Decimal::new(-125, 1)));
    }

    #[test]
    fn test_parse_money_invalid() {
        assert_eq!(parse_money("abc"), None);
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("R$"), None);
        assert_eq!(parse_money("12,3,4.5.6x"), None);
    }

    #[test]
    fn test_client_base_name() {
        assert_eq!(client_base_name("Acme 01"), "Acme");
        assert_eq!(client_base_name("Acme-2"), "Acme");
        assert_eq!(client_base_name("Acme-02"), "Acme");
        assert_eq!(client_base_name("Acme #3"), "Acme");
        assert_eq!(client_base_name("Acme nº 4"), "Acme");
        assert_eq!(client_base_name("Acme No. 5"), "Acme");
        assert_eq!(client_base_name("  Padaria   Central  7 "), "Padaria Central");
        assert_eq!(client_base_name("Acme"), "Acme");
        assert_eq!(client_base_name("2024"), "2024");
        assert_eq!(client_base_name(""), "");
    }

    #[test]
    fn test_client_base_name_idempotent() {
        for raw in [
            "Acme 01",
            "Acme 01 02",
            "Loja - 3 - 4",
            "Mercado nº 12",
            "  x  ",
            "7",
            "Clínica  São José #10",
            "",
        ] {
            let once = client_base_name(raw);
            assert_eq!(client_base_name(&once), once, "{raw}");
        }
    }

    #[test]
    fn test_parse_hour() {
        assert_eq!(parse_hour("13:00"), Some(13));
        assert_eq!(parse_hour("8:30:00"), Some(8));
        assert_eq!(parse_hour("25:00"), None);
        assert_eq!(parse_hour("05/01/2026 09:15"), Some(9));
        assert_eq!(parse_hour("manhã"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("3"), Some(3.0));
        assert_eq!(parse_count("2,5"), Some(2.5));
        assert_eq!(parse_count("três"), None);
        assert_eq!(parse_count(""), None);
    }
}
