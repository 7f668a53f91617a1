use crate::{Error, Result};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::one_of;
use nom::combinator::{all_consuming, map, map_res, opt, value};
use nom::sequence::preceded;
use nom::{IResult, Parser};
use std::fmt;
use std::str::{self, FromStr};

/// A PDF date (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Missing trailing fields take their defaults (month and day 1, time 0). A
/// date without time zone information has `utc_offset == None` and is
/// interpreted as UT when converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Offset from UT in minutes.
    pub utc_offset: Option<i16>,
}

impl DateTime {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> DateTime {
        DateTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            utc_offset: None,
        }
    }

    pub fn with_utc_offset(mut self, minutes: i16) -> DateTime {
        self.utc_offset = Some(minutes);
        self
    }

    /// Parse a date string; the `D:` prefix is optional, trailing whitespace is ignored.
    pub fn parse(bytes: &[u8]) -> Result<DateTime> {
        let trimmed = bytes.trim_ascii_end();
        let (_, date) = all_consuming(date_time).parse(trimmed).map_err(|_| Error::InvalidDate)?;
        if date.is_valid() {
            Ok(date)
        } else {
            Err(Error::InvalidDate)
        }
    }

    fn is_valid(&self) -> bool {
        (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
            && self.utc_offset.is_none_or(|offset| offset.abs() < 24 * 60)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "D:{:04}{:02}{:02}{:02}{:02}{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        match self.utc_offset {
            None => Ok(()),
            Some(0) => f.write_str("Z"),
            Some(offset) => {
                let sign = if offset < 0 { '-' } else { '+' };
                let offset = offset.unsigned_abs();
                write!(f, "{}{:02}'{:02}'", sign, offset / 60, offset % 60)
            }
        }
    }
}

impl FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<DateTime> {
        DateTime::parse(s.as_bytes())
    }
}

fn number<'a>(digits: usize) -> impl Parser<&'a [u8], Output = u16, Error = nom::error::Error<&'a [u8]>> {
    map_res(
        take_while_m_n(digits, digits, |c: u8| c.is_ascii_digit()),
        |text: &[u8]| str::from_utf8(text).map_err(|_| ()).and_then(|s| s.parse::<u16>().map_err(|_| ())),
    )
}

fn utc_offset(input: &[u8]) -> IResult<&[u8], i16> {
    let universal = value(0, (tag(&b"Z"[..]), opt(number(2)), opt(tag(&b"'"[..])), opt(number(2)), opt(tag(&b"'"[..]))));
    let shifted = map(
        (
            one_of("+-"),
            number(2),
            opt(preceded(opt(tag(&b"'"[..])), number(2))),
            opt(tag(&b"'"[..])),
        ),
        |(sign, hours, minutes, _)| {
            let total = (hours * 60 + minutes.unwrap_or(0)) as i16;
            if sign == '-' { -total } else { total }
        },
    );
    alt((universal, shifted)).parse(input)
}

fn date_time(input: &[u8]) -> IResult<&[u8], DateTime> {
    let (input, _) = opt(tag(&b"D:"[..])).parse(input)?;
    let (input, year) = number(4).parse(input)?;
    let (input, month) = opt(number(2)).parse(input)?;
    let (input, day) = opt(number(2)).parse(input)?;
    let (input, hour) = opt(number(2)).parse(input)?;
    let (input, minute) = opt(number(2)).parse(input)?;
    let (input, second) = opt(number(2)).parse(input)?;
    let (input, offset) = opt(utc_offset).parse(input)?;

    Ok((
        input,
        DateTime {
            year,
            month: month.unwrap_or(1) as u8,
            day: day.unwrap_or(1) as u8,
            hour: hour.unwrap_or(0) as u8,
            minute: minute.unwrap_or(0) as u8,
            second: second.unwrap_or(0) as u8,
            utc_offset: offset,
        },
    ))
}

#[cfg(feature = "chrono")]
mod chrono_impl {
    use crate::{Error, Object};
    use chrono::{Datelike, FixedOffset, TimeZone, Timelike};

    impl<Tz: TimeZone> From<chrono::DateTime<Tz>> for super::DateTime {
        fn from(date: chrono::DateTime<Tz>) -> Self {
            let date = date.fixed_offset();
            super::DateTime {
                year: date.year() as u16,
                month: date.month() as u8,
                day: date.day() as u8,
                hour: date.hour() as u8,
                minute: date.minute() as u8,
                second: date.second() as u8,
                utc_offset: Some((date.offset().local_minus_utc() / 60) as i16),
            }
        }
    }

    impl<Tz: TimeZone> From<chrono::DateTime<Tz>> for Object {
        fn from(date: chrono::DateTime<Tz>) -> Self {
            Object::Date(date.into())
        }
    }

    impl TryFrom<super::DateTime> for chrono::DateTime<FixedOffset> {
        type Error = Error;

        fn try_from(value: super::DateTime) -> Result<Self, Error> {
            let offset = FixedOffset::east_opt(i32::from(value.utc_offset.unwrap_or(0)) * 60).ok_or(Error::InvalidDate)?;
            offset
                .with_ymd_and_hms(
                    i32::from(value.year),
                    u32::from(value.month),
                    u32::from(value.day),
                    u32::from(value.hour),
                    u32::from(value.minute),
                    u32::from(value.second),
                )
                .single()
                .ok_or(Error::InvalidDate)
        }
    }
}

#[cfg(feature = "jiff")]
mod jiff_impl {
    use crate::Object;
    use jiff::tz::{Offset, TimeZone};
    use jiff::{Timestamp, Zoned};

    impl From<Zoned> for super::DateTime {
        fn from(date: Zoned) -> Self {
            super::DateTime {
                year: date.year() as u16,
                month: date.month() as u8,
                day: date.day() as u8,
                hour: date.hour() as u8,
                minute: date.minute() as u8,
                second: date.second() as u8,
                utc_offset: Some((date.offset().seconds() / 60) as i16),
            }
        }
    }

    impl From<Timestamp> for super::DateTime {
        fn from(date: Timestamp) -> Self {
            date.to_zoned(TimeZone::UTC).into()
        }
    }

    impl From<Zoned> for Object {
        fn from(date: Zoned) -> Self {
            Object::Date(date.into())
        }
    }

    impl From<Timestamp> for Object {
        fn from(date: Timestamp) -> Self {
            Object::Date(date.into())
        }
    }

    impl TryFrom<super::DateTime> for Zoned {
        type Error = jiff::Error;

        fn try_from(value: super::DateTime) -> Result<Self, Self::Error> {
            let offset = Offset::from_seconds(i32::from(value.utc_offset.unwrap_or(0)) * 60)?;
            jiff::civil::DateTime::new(
                value.year as i16,
                value.month as i8,
                value.day as i8,
                value.hour as i8,
                value.minute as i8,
                value.second as i8,
                0,
            )?
            .to_zoned(TimeZone::fixed(offset))
        }
    }
}

#[cfg(feature = "time")]
mod time_impl {
    use crate::Object;
    use time::error::ComponentRange;
    use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

    impl From<OffsetDateTime> for super::DateTime {
        fn from(date: OffsetDateTime) -> Self {
            super::DateTime {
                year: date.year() as u16,
                month: u8::from(date.month()),
                day: date.day(),
                hour: date.hour(),
                minute: date.minute(),
                second: date.second(),
                utc_offset: Some(date.offset().whole_minutes()),
            }
        }
    }

    impl From<OffsetDateTime> for Object {
        fn from(date: OffsetDateTime) -> Self {
            Object::Date(date.into())
        }
    }

    impl TryFrom<super::DateTime> for OffsetDateTime {
        type Error = ComponentRange;

        fn try_from(value: super::DateTime) -> Result<OffsetDateTime, Self::Error> {
            let date = Date::from_calendar_date(i32::from(value.year), Month::try_from(value.month)?, value.day)?;
            let time = Time::from_hms(value.hour, value.minute, value.second)?;
            let offset = UtcOffset::from_whole_seconds(i32::from(value.utc_offset.unwrap_or(0)) * 60)?;
            Ok(PrimitiveDateTime::new(date, time).assume_offset(offset))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_date_with_offset() {
        let date = DateTime::parse(b"D:19981223195200-02'00'").unwrap();
        assert_eq!(date, DateTime::new(1998, 12, 23, 19, 52, 0).with_utc_offset(-120));
        assert_eq!(date.to_string(), "D:19981223195200-02'00'");
    }

    #[test]
    fn parse_partial_dates() {
        assert_eq!(DateTime::parse(b"D:2004").unwrap(), DateTime::new(2004, 1, 1, 0, 0, 0));
        assert_eq!(DateTime::parse(b"200403").unwrap(), DateTime::new(2004, 3, 1, 0, 0, 0));
        assert_eq!(
            DateTime::parse(b"D:20040301102030Z00'00'").unwrap(),
            DateTime::new(2004, 3, 1, 10, 20, 30).with_utc_offset(0)
        );
        assert_eq!(
            DateTime::parse(b"D:20040301102030+0530").unwrap().utc_offset,
            Some(330)
        );
    }

    #[test]
    fn reject_invalid_dates() {
        assert!(DateTime::parse(b"D:20041301").is_err());
        assert!(DateTime::parse(b"yesterday").is_err());
        assert!(DateTime::parse(b"D:2004010112xx").is_err());
    }

    #[test]
    fn object_as_datetime_reads_strings() {
        let object = crate::Object::string_literal("D:20200102030405Z");
        assert_eq!(
            object.as_datetime(),
            Some(DateTime::new(2020, 1, 2, 3, 4, 5).with_utc_offset(0))
        );
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn chrono_conversion_respects_offset() {
        use chrono::{TimeZone, Utc};

        let date = DateTime::parse(b"D:19981223195200-02'00'").unwrap();
        let converted: chrono::DateTime<chrono::FixedOffset> = date.try_into().unwrap();
        assert_eq!(
            converted.with_timezone(&Utc),
            Utc.with_ymd_and_hms(1998, 12, 23, 21, 52, 0).unwrap()
        );
        assert_eq!(DateTime::from(converted), date);
    }

    #[cfg(feature = "jiff")]
    #[test]
    fn jiff_conversion_roundtrip() {
        let date = DateTime::parse(b"D:20240229235959+01'00'").unwrap();
        let zoned: jiff::Zoned = date.try_into().unwrap();
        assert_eq!(zoned.timestamp().as_second(), 1_709_247_599);
        assert_eq!(DateTime::from(zoned), date);
    }

    #[cfg(feature = "time")]
    #[test]
    fn time_conversion_roundtrip() {
        let date = DateTime::parse(b"D:20010911124600Z").unwrap();
        let converted: time::OffsetDateTime = date.try_into().unwrap();
        assert_eq!(converted.unix_timestamp(), 1_000_212_360);
        assert_eq!(DateTime::from(converted), date);
    }
}
