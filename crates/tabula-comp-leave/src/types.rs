//! Shared ledger types: grant status, payroll months, and allocations.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a comp-hour grant.
///
/// `Active`, `PartiallyUsed` and `FullyUsed` are derived purely from the hour
/// counters via [`GrantStatus::derive`]. `Expired` is terminal and is entered
/// only by the expiry converter; once expired, a grant's remaining hours are
/// no longer available for allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    /// No hours consumed yet.
    Active,
    /// Some hours consumed, some remaining.
    PartiallyUsed,
    /// All hours consumed.
    FullyUsed,
    /// Swept into an overtime pay record; terminal.
    Expired,
}

impl GrantStatus {
    /// Derive the status from the hour counters.
    ///
    /// This is the only place the mapping lives; every mutation path
    /// recomputes through it. `Expired` is never derived here.
    pub fn derive(hours_used: Decimal, hours_remaining: Decimal) -> Self {
        if hours_remaining.is_zero() {
            Self::FullyUsed
        } else if hours_used.is_zero() {
            Self::Active
        } else {
            Self::PartiallyUsed
        }
    }

    /// Whether hours can still be allocated from a grant in this status.
    pub fn is_allocatable(self) -> bool {
        matches!(self, Self::Active | Self::PartiallyUsed)
    }

    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::PartiallyUsed => "partially_used",
            Self::FullyUsed => "fully_used",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for GrantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "partially_used" => Ok(Self::PartiallyUsed),
            "fully_used" => Ok(Self::FullyUsed),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Unknown grant status: {s}")),
        }
    }
}

/// A calendar year-month (`YYYY-MM`) targeted by a payroll run.
///
/// The last day of the month is the expiry cutoff date for the conversion
/// batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayrollMonth {
    year: i32,
    month: u32,
}

impl PayrollMonth {
    /// Build a month, validating the components.
    pub fn new(year: i32, month: u32) -> Result<Self, String> {
        if !(1970..=9999).contains(&year) {
            return Err(format!("Year out of range: {year}"));
        }
        if !(1..=12).contains(&month) {
            return Err(format!("Month out of range: {month}"));
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar month immediately before the one containing `date`.
    ///
    /// This is the default target of a scheduled expiry run.
    pub fn previous_of(date: NaiveDate) -> Self {
        if date.month() == 1 {
            Self {
                year: date.year() - 1,
                month: 12,
            }
        } else {
            Self {
                year: date.year(),
                month: date.month() - 1,
            }
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Year and month are validated on construction.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("valid year-month")
    }

    /// Last calendar day of the month; the expiry cutoff.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .expect("valid year-month")
    }
}

impl fmt::Display for PayrollMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for PayrollMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid payroll month (expected YYYY-MM): {s}"))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("Invalid payroll month (expected YYYY-MM): {s}"));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| format!("Invalid payroll month year: {s}"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid payroll month number: {s}"))?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for PayrollMonth {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PayrollMonth> for String {
    fn from(m: PayrollMonth) -> Self {
        m.to_string()
    }
}

/// Hours taken from one grant during a consumption.
///
/// The full set produced by one consumption is recorded alongside the leave
/// request so a later reversal can replay it exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrantAllocation {
    pub grant_id: Uuid,
    pub hours: Decimal,
}

/// Whether `hours` sits on the half-hour grid the ledger accounts in.
pub fn is_half_hour_multiple(hours: Decimal) -> bool {
    (hours % Decimal::new(5, 1)).is_zero()
}
