//! Date-time encoding (Spec 7.1.8).
//!
//! A date-time value is a sequence of components, selected by the variant:
//!
//! | Komponente      | Repräsentation                                        |
//! |-----------------|-------------------------------------------------------|
//! | Year            | Integer, Offset von 2000 (Spec 7.1.5)                 |
//! | MonthDay        | 9-bit unsigned: month * 32 + day                      |
//! | Time            | 17-bit unsigned: ((hour * 64) + minutes) * 64 + secs  |
//! | FractionalSecs  | Presence-Bit + Unsigned Integer (Ziffern revers)      |
//! | TimeZone        | Presence-Bit + 11-bit unsigned: Minuten + 896         |
//!
//! dateTime = Year MonthDay Time [Fract] [TZ]; date = Year MonthDay [TZ];
//! time = Time [Fract] [TZ]; gYear = Year [TZ]; gYearMonth = Year MonthDay
//! [TZ]; gMonth/gMonthDay/gDay = MonthDay [TZ].

use crate::bitstream::{BitReader, BitWriter};
use crate::{Error, Result, integer, n_bit_unsigned_integer, unsigned_integer};

/// Which date-time components a value carries (Spec 7.1.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    DateTime,
    Date,
    Time,
    GYear,
    GYearMonth,
    GMonth,
    GMonthDay,
    GDay,
}

impl DateTimeKind {
    fn has_year(self) -> bool {
        matches!(self, Self::DateTime | Self::Date | Self::GYear | Self::GYearMonth)
    }
    fn has_month_day(self) -> bool {
        !matches!(self, Self::Time | Self::GYear)
    }
    fn has_time(self) -> bool {
        matches!(self, Self::DateTime | Self::Time)
    }
}

/// A decoded date-time value (Spec 7.1.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeValue {
    pub kind: DateTimeKind,
    /// Proleptic year (may be negative; only when the kind carries a year).
    pub year: i64,
    /// Month 1..=12 (0 when absent from the kind).
    pub month: u8,
    /// Day 1..=31 (0 when absent from the kind).
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Fractional second digits, canonical (no trailing zeros, may be empty).
    pub fractional: String,
    /// Timezone offset in minutes from UTC, if present (-840..=840 lexically).
    pub timezone_minutes: Option<i32>,
}

/// Bias für die 11-Bit TimeZone-Repräsentation (Spec 7.1.8).
const TZ_BIAS: i32 = 896;

impl DateTimeValue {
    /// Parses a lexical date-time form for the given kind.
    pub fn parse(lexical: &str, kind: DateTimeKind) -> Result<Self> {
        let s = crate::typed_value::trim_xml_ws(lexical);
        let err = || Error::value_format(lexical, "dateTime");

        let mut v = Self {
            kind,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
            fractional: String::new(),
            timezone_minutes: None,
        };

        // Timezone-Suffix abtrennen: Z oder ±hh:mm am Ende.
        let (body, tz) = split_timezone(s);
        if let Some(tz) = tz {
            v.timezone_minutes = Some(parse_timezone(tz).ok_or_else(err)?);
        }

        let mut rest = body;
        match kind {
            DateTimeKind::GMonth => {
                rest = rest.strip_prefix("--").ok_or_else(err)?;
                v.month = parse_2(rest, 1, 12).ok_or_else(err)?;
                rest = &rest[2..];
            }
            DateTimeKind::GMonthDay => {
                rest = rest.strip_prefix("--").ok_or_else(err)?;
                v.month = parse_2(rest, 1, 12).ok_or_else(err)?;
                rest = rest.get(2..).ok_or_else(err)?;
                rest = rest.strip_prefix('-').ok_or_else(err)?;
                v.day = parse_2(rest, 1, 31).ok_or_else(err)?;
                rest = &rest[2..];
            }
            DateTimeKind::GDay => {
                rest = rest.strip_prefix("---").ok_or_else(err)?;
                v.day = parse_2(rest, 1, 31).ok_or_else(err)?;
                rest = &rest[2..];
            }
            _ => {
                if kind.has_year() {
                    let (year, after) = parse_year(rest).ok_or_else(err)?;
                    v.year = year;
                    rest = after;
                    if kind.has_month_day() {
                        rest = rest.strip_prefix('-').ok_or_else(err)?;
                        v.month = parse_2(rest, 1, 12).ok_or_else(err)?;
                        rest = rest.get(2..).ok_or_else(err)?;
                        if kind != DateTimeKind::GYearMonth {
                            rest = rest.strip_prefix('-').ok_or_else(err)?;
                            v.day = parse_2(rest, 1, 31).ok_or_else(err)?;
                            rest = rest.get(2..).ok_or_else(err)?;
                        }
                    }
                }
                if kind.has_time() {
                    if kind == DateTimeKind::DateTime {
                        rest = rest.strip_prefix('T').ok_or_else(err)?;
                    }
                    v.hour = parse_2(rest, 0, 24).ok_or_else(err)?;
                    rest = rest.get(2..).and_then(|r| r.strip_prefix(':')).ok_or_else(err)?;
                    v.minute = parse_2(rest, 0, 59).ok_or_else(err)?;
                    rest = rest.get(2..).and_then(|r| r.strip_prefix(':')).ok_or_else(err)?;
                    v.second = parse_2(rest, 0, 60).ok_or_else(err)?;
                    rest = rest.get(2..).ok_or_else(err)?;
                    if let Some(frac) = rest.strip_prefix('.') {
                        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
                            return Err(err());
                        }
                        v.fractional = frac.trim_end_matches('0').to_string();
                        rest = "";
                    }
                }
            }
        }
        if !rest.is_empty() {
            return Err(err());
        }
        Ok(v)
    }

    /// Canonical lexical form for this value's kind.
    pub fn canonical_lexical(&self) -> String {
        let mut out = String::new();
        match self.kind {
            DateTimeKind::GMonth => out.push_str(&format!("--{:02}", self.month)),
            DateTimeKind::GMonthDay => {
                out.push_str(&format!("--{:02}-{:02}", self.month, self.day))
            }
            DateTimeKind::GDay => out.push_str(&format!("---{:02}", self.day)),
            _ => {
                if self.kind.has_year() {
                    if self.year < 0 {
                        out.push('-');
                    }
                    out.push_str(&format!("{:04}", self.year.unsigned_abs()));
                    if self.kind.has_month_day() {
                        out.push_str(&format!("-{:02}", self.month));
                        if self.kind != DateTimeKind::GYearMonth {
                            out.push_str(&format!("-{:02}", self.day));
                        }
                    }
                }
                if self.kind.has_time() {
                    if self.kind == DateTimeKind::DateTime {
                        out.push('T');
                    }
                    out.push_str(&format!(
                        "{:02}:{:02}:{:02}",
                        self.hour, self.minute, self.second
                    ));
                    if !self.fractional.is_empty() {
                        out.push('.');
                        out.push_str(&self.fractional);
                    }
                }
            }
        }
        match self.timezone_minutes {
            Some(0) => out.push('Z'),
            Some(tz) => {
                let sign = if tz < 0 { '-' } else { '+' };
                let abs = tz.unsigned_abs();
                out.push_str(&format!("{sign}{:02}:{:02}", abs / 60, abs % 60));
            }
            None => {}
        }
        out
    }
}

fn parse_2(s: &str, min: u8, max: u8) -> Option<u8> {
    let d = s.get(..2)?;
    if !d.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let v: u8 = d.parse().ok()?;
    (min..=max).contains(&v).then_some(v)
}

/// Jahr: mindestens 4 Ziffern, optionales Minus, keine führende Null bei > 4.
fn parse_year(s: &str) -> Option<(i64, &str)> {
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let digits_len = body.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len < 4 {
        return None;
    }
    let year: i64 = body[..digits_len].parse().ok()?;
    Some((if neg { -year } else { year }, &body[digits_len..]))
}

/// Trennt ein Timezone-Suffix ab (Z oder ±hh:mm).
fn split_timezone(s: &str) -> (&str, Option<&str>) {
    if let Some(body) = s.strip_suffix('Z') {
        return (body, Some("Z"));
    }
    // ±hh:mm sind die letzten 6 Zeichen, mit ':' an vorletzter Trennstelle.
    // Ein '-' kann auch Datums-Separator sein, daher nur am exakten Offset.
    if s.len() >= 6 {
        let tail = &s[s.len() - 6..];
        if (tail.starts_with('+') || tail.starts_with('-')) && tail.as_bytes()[3] == b':' {
            return (&s[..s.len() - 6], Some(tail));
        }
    }
    (s, None)
}

fn parse_timezone(tz: &str) -> Option<i32> {
    if tz == "Z" {
        return Some(0);
    }
    let sign = match tz.as_bytes()[0] {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let hours: i32 = tz.get(1..3)?.parse().ok()?;
    let minutes: i32 = tz.get(4..6)?.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 60 + minutes))
}

/// Encodes a date-time value (Spec 7.1.8).
pub fn encode(writer: &mut BitWriter, value: &DateTimeValue) {
    let kind = value.kind;
    if kind.has_year() {
        integer::encode(writer, value.year - 2000);
    }
    if kind.has_month_day() {
        let md = u64::from(value.month) * 32 + u64::from(value.day);
        n_bit_unsigned_integer::encode(writer, md, 9);
    }
    if kind.has_time() {
        let t = ((u64::from(value.hour) * 64) + u64::from(value.minute)) * 64
            + u64::from(value.second);
        n_bit_unsigned_integer::encode(writer, t, 17);
        if value.fractional.is_empty() {
            writer.write_bit(false);
        } else {
            writer.write_bit(true);
            let reversed: String = value.fractional.chars().rev().collect();
            unsigned_integer::encode(writer, reversed.parse().unwrap_or(0));
        }
    }
    match value.timezone_minutes {
        Some(tz) => {
            writer.write_bit(true);
            n_bit_unsigned_integer::encode(writer, (tz + TZ_BIAS) as u64, 11);
        }
        None => writer.write_bit(false),
    }
}

/// Decodes a date-time value (Spec 7.1.8).
pub fn decode(reader: &mut BitReader, kind: DateTimeKind) -> Result<DateTimeValue> {
    let mut v = DateTimeValue {
        kind,
        year: 0,
        month: 0,
        day: 0,
        hour: 0,
        minute: 0,
        second: 0,
        fractional: String::new(),
        timezone_minutes: None,
    };
    if kind.has_year() {
        v.year = integer::decode(reader)?.checked_add(2000).ok_or(Error::IntegerOverflow)?;
    }
    if kind.has_month_day() {
        let md = n_bit_unsigned_integer::decode(reader, 9)?;
        v.month = (md / 32) as u8;
        v.day = (md % 32) as u8;
    }
    if kind.has_time() {
        let t = n_bit_unsigned_integer::decode(reader, 17)?;
        v.hour = (t / 4096) as u8;
        v.minute = ((t / 64) % 64) as u8;
        v.second = (t % 64) as u8;
        if reader.read_bit()? {
            let reversed = unsigned_integer::decode(reader)?;
            v.fractional = reversed.to_string().chars().rev().collect();
        }
    }
    if reader.read_bit()? {
        let biased = n_bit_unsigned_integer::decode(reader, 11)? as i32;
        v.timezone_minutes = Some(biased - TZ_BIAS);
    }
    Ok(v)
}
