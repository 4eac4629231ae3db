//! Natural-language date parsing for publication dates.
//!
//! Article pages print their publication date in whatever language and layout
//! the publisher likes. [`DateParser`] accepts the common shapes:
//!
//! | Shape | Example |
//! |-------|---------|
//! | RFC 3339 / ISO 8601 | `2025-01-15T10:30:00Z`, `2025-01-15` |
//! | RFC 2822 | `Wed, 15 Jan 2025 10:30:00 +0000` |
//! | Numeric, day first | `15.01.2025`, `15/01/2025 10:30` |
//! | Day, month name, year | `14 Październik 2024`, `15. Januar 2025`, `15 de enero de 2025` |
//! | Month name, day, year | `January 15, 2025`, `Jan 15 2025 at 9:05 pm` |
//! | Partial | `October 2024` (day 1), `14 października` (reference year) |
//! | Relative | `today`, `wczoraj`, `3 hours ago`, `5 dni temu` |
//!
//! Month names are recognized in English, Polish, German, French and Spanish,
//! case-insensitively and with or without diacritics.
//!
//! The whole input has to be a date expression. A sentence that merely
//! contains a date does not parse, which is what lets the extractor scan
//! paragraphs for the first one that *is* a date.
//!
//! Offsets are normalized to UTC and then dropped, so every result is a
//! timezone-naive [`NaiveDateTime`].

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const WEEKDAYS: &[&str] = &[
    // en
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "tues", "thurs", "thur", "mon", "tue", "wed", "thu", "fri", "sat", "sun",
    // pl
    "poniedziałek", "poniedzialek", "wtorek", "środa", "sroda", "czwartek", "piątek",
    "piatek", "sobota", "niedziela", "niedz", "pon", "czw", "sob", "wt", "śr", "sr", "pt", "nd",
    // de
    "montag", "dienstag", "mittwoch", "donnerstag", "freitag", "samstag", "sonntag",
    // fr
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
    // es
    "lunes", "martes", "miércoles", "miercoles", "jueves", "viernes", "sábado", "sabado",
    "domingo",
];

const TIME: &str = r"(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?\s*(?P<meridiem>am|pm|a\.m\.|p\.m\.)?";

static WEEKDAY_PREFIX: Lazy<String> = Lazy::new(|| format!(r"(?:(?:{})\.?,?\s+)?", WEEKDAYS.join("|")));

static TIME_SUFFIX: Lazy<String> = Lazy::new(|| {
    format!(r"(?:(?:\s*[,|\-–]\s*|\s+)(?:(?:at|o|godz\.|um|à|a las)\s+)?{TIME})?")
});

static NUMERIC_DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<day>\d{{1,2}})[./\-](?P<month>\d{{1,2}})[./\-](?P<year>\d{{4}})\.?{}$",
        *TIME_SUFFIX
    ))
    .expect("numeric date pattern compiles")
});

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}(?P<day>\d{{1,2}})(?:\.|er|st|nd|rd|th)?\s+(?:de\s+)?(?P<month>\p{{L}}+)\.?,?\s+(?:de\s+)?(?P<year>\d{{4}})(?:\s*r\.?|\s+roku)?{}$",
        *WEEKDAY_PREFIX, *TIME_SUFFIX
    ))
    .expect("day-month-year pattern compiles")
});

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}(?P<month>\p{{L}}+)\.?\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?,?\s+(?P<year>\d{{4}}){}$",
        *WEEKDAY_PREFIX, *TIME_SUFFIX
    ))
    .expect("month-day-year pattern compiles")
});

static MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<month>\p{L}+)\.?,?\s+(?P<year>\d{4})(?:\s*r\.?|\s+roku)?$")
        .expect("month-year pattern compiles")
});

static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}(?P<day>\d{{1,2}})(?:\.|er|st|nd|rd|th)?\s+(?:de\s+)?(?P<month>\p{{L}}+)\.?{}$",
        *WEEKDAY_PREFIX, *TIME_SUFFIX
    ))
    .expect("day-month pattern compiles")
});

static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}(?P<month>\p{{L}}+)\.?\s+(?P<day>\d{{1,2}})(?:st|nd|rd|th)?{}$",
        *WEEKDAY_PREFIX, *TIME_SUFFIX
    ))
    .expect("month-day pattern compiles")
});

static RELATIVE_AGO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<count>\d+|an?)\s+(?P<unit>\p{L}+)\s+(?:ago|temu)$")
        .expect("relative pattern compiles")
});

const MACHINE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses free-form date text relative to a fixed reference moment.
///
/// The reference fills in the year for `14 October` style dates and anchors
/// relative expressions such as `yesterday`.
#[derive(Debug, Clone, Copy)]
pub struct DateParser {
    reference: NaiveDateTime,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(Utc::now().naive_utc())
    }
}

type Shape = fn(&DateParser, &str) -> Option<NaiveDateTime>;

/// Tried in order; the first shape that accepts the input wins.
const SHAPES: &[(&str, Shape)] = &[
    ("relative", DateParser::relative),
    ("numeric", DateParser::numeric_day_first),
    ("day-month-year", DateParser::day_month_year),
    ("month-day-year", DateParser::month_day_year),
    ("month-year", DateParser::month_year),
    ("day-month", DateParser::day_month),
    ("month-day", DateParser::month_day),
];

impl DateParser {
    pub fn new(reference: NaiveDateTime) -> Self {
        Self { reference }
    }

    /// Parse `input` as a date, or `None` if it is not a date expression.
    pub fn parse(&self, input: &str) -> Option<NaiveDateTime> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Some(dt) = machine_readable(trimmed) {
            return Some(dt);
        }

        let text = normalize(trimmed);
        SHAPES.iter().find_map(|(shape, parse)| {
            let parsed = parse(self, &text);
            if let Some(dt) = parsed {
                tracing::trace!(shape, %dt, input = %trimmed, "Parsed date");
            }
            parsed
        })
    }

    fn relative(&self, text: &str) -> Option<NaiveDateTime> {
        match text {
            "now" | "just now" | "today" | "teraz" | "dzisiaj" | "dziś" | "dzis" => {
                return Some(self.reference);
            }
            "yesterday" | "wczoraj" => return Some(self.reference - Duration::days(1)),
            _ => {}
        }

        let caps = RELATIVE_AGO.captures(text)?;
        let count: i64 = match &caps["count"] {
            "a" | "an" => 1,
            n => n.parse().ok()?,
        };
        let unit = relative_unit(&caps["unit"])?;
        let span = unit.checked_mul(i32::try_from(count).ok()?)?;
        self.reference.checked_sub_signed(span)
    }

    fn numeric_day_first(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = NUMERIC_DMY.captures(text)?;
        let date = NaiveDate::from_ymd_opt(
            caps["year"].parse().ok()?,
            caps["month"].parse().ok()?,
            caps["day"].parse().ok()?,
        )?;
        Some(date.and_time(time_of(&caps)?))
    }

    fn day_month_year(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = DAY_MONTH_YEAR.captures(text)?;
        named_month_date(&caps, caps["year"].parse().ok()?)
    }

    fn month_day_year(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = MONTH_DAY_YEAR.captures(text)?;
        named_month_date(&caps, caps["year"].parse().ok()?)
    }

    fn month_year(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = MONTH_YEAR.captures(text)?;
        let month = month_number(&caps["month"])?;
        let date = NaiveDate::from_ymd_opt(caps["year"].parse().ok()?, month, 1)?;
        Some(date.and_time(NaiveTime::MIN))
    }

    fn day_month(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = DAY_MONTH.captures(text)?;
        named_month_date(&caps, self.reference.year())
    }

    fn month_day(&self, text: &str) -> Option<NaiveDateTime> {
        let caps = MONTH_DAY.captures(text)?;
        named_month_date(&caps, self.reference.year())
    }
}

/// Parse `input` with the current UTC time as the reference moment.
pub fn parse_date(input: &str) -> Option<NaiveDateTime> {
    DateParser::default().parse(input)
}

fn machine_readable(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = MACHINE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt);
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Lowercase and collapse runs of whitespace (including non-breaking spaces).
fn normalize(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn named_month_date(caps: &Captures<'_>, year: i32) -> Option<NaiveDateTime> {
    let month = month_number(&caps["month"])?;
    let day = caps["day"].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(time_of(caps)?))
}

/// Time-of-day from the optional `TIME` groups; midnight when absent.
fn time_of(caps: &Captures<'_>) -> Option<NaiveTime> {
    let Some(hour) = caps.name("hour") else {
        return Some(NaiveTime::MIN);
    };
    let mut hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = caps["minute"].parse().ok()?;
    let second: u32 = match caps.name("second") {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };
    match caps.name("meridiem").map(|m| m.as_str().starts_with('p')) {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn relative_unit(unit: &str) -> Option<Duration> {
    let unit = fold_diacritics(unit);
    let one = match unit.as_str() {
        "second" | "seconds" | "sekund" | "sekundy" | "sekunde" => Duration::seconds(1),
        "minute" | "minutes" | "min" | "mins" | "minut" | "minuty" => Duration::minutes(1),
        "hour" | "hours" | "godzin" | "godziny" | "godzine" => Duration::hours(1),
        "day" | "days" | "dzien" | "dni" => Duration::days(1),
        "week" | "weeks" | "tydzien" | "tygodnie" | "tygodni" => Duration::weeks(1),
        _ => return None,
    };
    Some(one)
}

fn fold_diacritics(word: &str) -> String {
    word.chars()
        .map(|c| match c {
            'ą' | 'ä' | 'à' | 'â' | 'á' => 'a',
            'ć' | 'ç' => 'c',
            'ę' | 'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'î' | 'ï' => 'i',
            'ł' => 'l',
            'ń' | 'ñ' => 'n',
            'ó' | 'ö' | 'ô' => 'o',
            'ś' => 's',
            'ú' | 'ü' | 'û' | 'ù' => 'u',
            'ź' | 'ż' => 'z',
            other => other,
        })
        .collect()
}

/// Month number for an English, Polish, German, French or Spanish month name
/// or common abbreviation. Expects lowercase input.
fn month_number(name: &str) -> Option<u32> {
    let month = match fold_diacritics(name).as_str() {
        "january" | "jan" | "styczen" | "stycznia" | "sty" | "januar" | "janvier" | "janv"
        | "enero" | "ene" => 1,
        "february" | "feb" | "luty" | "lutego" | "lut" | "februar" | "fevrier" | "fevr"
        | "fev" | "febrero" => 2,
        "march" | "mar" | "marzec" | "marca" | "marz" | "maerz" | "mars" | "marzo" => 3,
        "april" | "apr" | "kwiecien" | "kwietnia" | "kwi" | "avril" | "avr" | "abril"
        | "abr" => 4,
        "may" | "maj" | "maja" | "mai" | "mayo" => 5,
        "june" | "jun" | "czerwiec" | "czerwca" | "cze" | "juni" | "juin" | "junio" => 6,
        "july" | "jul" | "lipiec" | "lipca" | "lip" | "juli" | "juillet" | "juil" | "julio" => 7,
        "august" | "aug" | "sierpien" | "sierpnia" | "sie" | "aout" | "agosto" | "ago" => 8,
        "september" | "sep" | "sept" | "wrzesien" | "wrzesnia" | "wrz" | "septembre"
        | "septiembre" | "setiembre" => 9,
        "october" | "oct" | "pazdziernik" | "pazdziernika" | "paz" | "oktober" | "okt"
        | "octobre" | "octubre" => 10,
        "november" | "nov" | "listopad" | "listopada" | "lis" | "novembre" | "noviembre" => 11,
        "december" | "dec" | "grudzien" | "grudnia" | "gru" | "dezember" | "dez" | "decembre"
        | "diciembre" | "dic" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn parse(s: &str) -> Option<NaiveDateTime> {
        DateParser::new(reference()).parse(s)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_uses_current_time() {
        assert_eq!(parse_date("14 Październik 2024").unwrap().date(), ymd(2024, 10, 14));

        let before = Utc::now().naive_utc() - Duration::days(3);
        let parsed = parse_date("3 days ago").unwrap();
        let after = Utc::now().naive_utc() - Duration::days(3);
        assert!(parsed >= before - Duration::seconds(1) && parsed <= after + Duration::seconds(1));

        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn test_polish_nominative_month() {
        let dt = parse("14 Październik 2024").unwrap();
        assert_eq!(dt.date(), ymd(2024, 10, 14));
    }

    #[test]
    fn test_polish_genitive_month_with_suffix() {
        assert_eq!(parse("14 października 2024 r.").unwrap().date(), ymd(2024, 10, 14));
        assert_eq!(parse("3 stycznia 2025 roku").unwrap().date(), ymd(2025, 1, 3));
    }

    #[test]
    fn test_polish_without_diacritics() {
        assert_eq!(parse("14 pazdziernika 2024").unwrap().date(), ymd(2024, 10, 14));
    }

    #[test]
    fn test_english_month_first() {
        let dt = parse("January 15, 2025").unwrap();
        assert_eq!(dt, ymd(2025, 1, 15).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(parse("Jan 15 2025").unwrap().date(), ymd(2025, 1, 15));
        assert_eq!(parse("Wednesday, January 15th, 2025").unwrap().date(), ymd(2025, 1, 15));
    }

    #[test]
    fn test_english_with_time() {
        let dt = parse("January 15, 2025 at 9:05 pm").unwrap();
        assert_eq!(dt, ymd(2025, 1, 15).and_hms_opt(21, 5, 0).unwrap());

        let dt = parse("15 January 2025, 12:30 am").unwrap();
        assert_eq!(dt, ymd(2025, 1, 15).and_hms_opt(0, 30, 0).unwrap());
    }

    #[test]
    fn test_other_languages() {
        assert_eq!(parse("15. Januar 2025").unwrap().date(), ymd(2025, 1, 15));
        assert_eq!(parse("3 März 2025").unwrap().date(), ymd(2025, 3, 3));
        assert_eq!(parse("1er février 2025").unwrap().date(), ymd(2025, 2, 1));
        assert_eq!(parse("15 de enero de 2025").unwrap().date(), ymd(2025, 1, 15));
    }

    #[test]
    fn test_iso_and_rfc() {
        assert_eq!(parse("2025-01-15").unwrap().date(), ymd(2025, 1, 15));
        assert_eq!(
            parse("2025-01-15T10:30:00Z").unwrap(),
            ymd(2025, 1, 15).and_hms_opt(10, 30, 0).unwrap()
        );
        // Offset is normalized to UTC.
        assert_eq!(
            parse("2025-01-15T10:30:00+02:00").unwrap(),
            ymd(2025, 1, 15).and_hms_opt(8, 30, 0).unwrap()
        );
        assert_eq!(
            parse("Wed, 15 Jan 2025 10:30:00 +0000").unwrap(),
            ymd(2025, 1, 15).and_hms_opt(10, 30, 0).unwrap()
        );
        assert_eq!(
            parse("2025-01-15 10:30").unwrap(),
            ymd(2025, 1, 15).and_hms_opt(10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_numeric_day_first() {
        assert_eq!(parse("14.10.2024").unwrap().date(), ymd(2024, 10, 14));
        assert_eq!(
            parse("14/10/2024 08:15").unwrap(),
            ymd(2024, 10, 14).and_hms_opt(8, 15, 0).unwrap()
        );
        assert!(parse("31.02.2024").is_none());
    }

    #[test]
    fn test_partial_dates() {
        assert_eq!(parse("October 2024").unwrap().date(), ymd(2024, 10, 1));
        assert_eq!(parse("14 października").unwrap().date(), ymd(2025, 10, 14));
        assert_eq!(parse("March 5").unwrap().date(), ymd(2025, 3, 5));
    }

    #[test]
    fn test_relative_dates() {
        assert_eq!(parse("today").unwrap(), reference());
        assert_eq!(parse("Wczoraj").unwrap().date(), ymd(2025, 3, 9));
        assert_eq!(
            parse("3 hours ago").unwrap(),
            ymd(2025, 3, 10).and_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(parse("5 dni temu").unwrap().date(), ymd(2025, 3, 5));
        assert_eq!(parse("a week ago").unwrap().date(), ymd(2025, 3, 3));
    }

    #[test]
    fn test_sentences_do_not_parse() {
        assert!(parse("This is the first paragraph of the article.").is_none());
        assert!(parse("Published on January 15, 2025 by the desk").is_none());
        assert!(parse("Page 2").is_none());
        assert!(parse("").is_none());
        assert!(parse("   ").is_none());
        assert!(parse("not a date").is_none());
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        assert_eq!(
            parse("  14\u{a0}Październik\n 2024 ").unwrap().date(),
            ymd(2024, 10, 14)
        );
    }
}
