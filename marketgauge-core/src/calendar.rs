//! Trading calendar: which date's session a computation belongs to.
//!
//! Rule-based NYSE holidays plus the unscheduled closures since 1990. Early
//! closes are not modeled; the configured close applies to every session.

use crate::config::{ConfigError, MarketConfig};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use thiserror::Error;

/// Requested dates must fall strictly after this day.
pub const EARLIEST_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1990, 1, 1) {
    Some(date) => date,
    None => panic!("invalid floor date"),
};

/// Full-day closures outside the regular holiday rules.
const SPECIAL_CLOSURES: &[(i32, u32, u32)] = &[
    (1994, 4, 27),  // President Nixon funeral
    (2001, 9, 11),  // September 11
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (2004, 6, 11),  // President Reagan funeral
    (2007, 1, 2),   // President Ford funeral
    (2012, 10, 29), // Hurricane Sandy
    (2012, 10, 30),
    (2018, 12, 5),  // President G.H.W. Bush funeral
    (2025, 1, 9),   // President Carter funeral
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    Format(String),

    #[error("{date} is in the future (market date is {today})")]
    InFuture { date: NaiveDate, today: NaiveDate },

    #[error("{date} is out of range: dates must be after 1990-01-01")]
    OutOfRange { date: NaiveDate },

    #[error("{date} was not a trading day")]
    NotTradingDay { date: NaiveDate },
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| DateError::Format(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradingCalendar {
    tz: Tz,
    close: NaiveTime,
}

impl Default for TradingCalendar {
    fn default() -> Self {
        Self::nyse()
    }
}

impl TradingCalendar {
    pub fn new(tz: Tz, close: NaiveTime) -> Self {
        Self { tz, close }
    }

    /// New York, 16:00 close.
    pub fn nyse() -> Self {
        Self::new(chrono_tz::America::New_York, NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN))
    }

    pub fn from_config(market: &MarketConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(market.tz()?, market.close_time()?))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    /// `now` in the market's time zone.
    pub fn market_now(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    /// Today's date in the market's time zone, regardless of the session.
    pub fn market_today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.market_now(now).date_naive()
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        holidays(date.year()).contains(&date)
            || SPECIAL_CLOSURES
                .iter()
                .any(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d) == Some(date))
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Closest trading day strictly before `date`.
    pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date;
        while let Some(prev) = day.pred_opt() {
            day = prev;
            if self.is_trading_day(day) {
                break;
            }
        }
        day
    }

    /// Date of the most recent completed session as of `now`.
    pub fn last_trading_date(&self, now: DateTime<Utc>) -> NaiveDate {
        let local = self.market_now(now);
        let today = local.date_naive();
        if self.is_trading_day(today) && local.time() >= self.close {
            today
        } else {
            self.previous_trading_day(today)
        }
    }

    /// Reject dates that cannot be scored: future, too old, or market closed.
    pub fn validate(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<(), DateError> {
        let today = self.market_today(now);
        if date > today {
            return Err(DateError::InFuture { date, today });
        }
        if date <= EARLIEST_DATE {
            return Err(DateError::OutOfRange { date });
        }
        if !self.is_trading_day(date) {
            return Err(DateError::NotTradingDay { date });
        }
        Ok(())
    }
}

/// Observed full-day NYSE holidays of `year`.
pub fn holidays(year: i32) -> Vec<NaiveDate> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    let mut days = Vec::with_capacity(10);

    // New Year's Day falling on a Saturday is not moved back into December.
    if let Some(new_year) = fixed(1, 1) {
        match new_year.weekday() {
            Weekday::Sat => {}
            Weekday::Sun => days.extend(new_year.succ_opt()),
            _ => days.push(new_year),
        }
    }
    if year >= 1998 {
        days.extend(nth_weekday(year, 1, Weekday::Mon, 3));
    }
    days.extend(nth_weekday(year, 2, Weekday::Mon, 3));
    days.extend(easter_sunday(year).and_then(|easter| easter.checked_sub_days(chrono::Days::new(2))));
    days.extend(last_weekday(year, 5, Weekday::Mon));
    if year >= 2022 {
        days.extend(fixed(6, 19).and_then(observed));
    }
    days.extend(fixed(7, 4).and_then(observed));
    days.extend(nth_weekday(year, 9, Weekday::Mon, 1));
    days.extend(nth_weekday(year, 11, Weekday::Thu, 4));
    days.extend(fixed(12, 25).and_then(observed));

    days
}

/// Saturday holidays move to Friday, Sunday holidays to Monday.
fn observed(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => date.pred_opt(),
        Weekday::Sun => date.succ_opt(),
        _ => Some(date),
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    nth_weekday(year, month, weekday, 5).or_else(|| nth_weekday(year, month, weekday, 4))
}

/// Anonymous Gregorian algorithm.
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}
