//! Weekday working-time budgets.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::traits::BudgetRule;

const FULL_DAY_SECONDS: u32 = 8 * 3600;
const SHORT_DAY_SECONDS: u32 = 7 * 3600;

/// Budget per weekday. Weekdays without an entry are not worked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCalendar {
    budgets: HashMap<Weekday, u32>,
}

impl Default for WorkCalendar {
    /// Monday to Thursday full days, a shorter Friday, weekends off.
    fn default() -> Self {
        Self::new([
            (Weekday::Mon, FULL_DAY_SECONDS),
            (Weekday::Tue, FULL_DAY_SECONDS),
            (Weekday::Wed, FULL_DAY_SECONDS),
            (Weekday::Thu, FULL_DAY_SECONDS),
            (Weekday::Fri, SHORT_DAY_SECONDS),
        ])
    }
}

impl WorkCalendar {
    pub fn new(budgets: impl IntoIterator<Item = (Weekday, u32)>) -> Self {
        Self {
            budgets: budgets.into_iter().collect(),
        }
    }

    /// Same budget every day of the week.
    pub fn uniform(seconds: u32) -> Self {
        Self::new(
            [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
                Weekday::Sun,
            ]
            .map(|day| (day, seconds)),
        )
    }

    pub fn weekday_budget(&self, weekday: Weekday) -> u32 {
        self.budgets.get(&weekday).copied().unwrap_or(0)
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.weekday_budget(date.weekday()) > 0
    }

    /// The next `count` working days, starting at `start` inclusive.
    pub fn working_days(&self, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        if self.budgets.values().all(|&seconds| seconds == 0) {
            return Vec::new();
        }

        let mut days = Vec::with_capacity(count);
        let mut date = start;
        while days.len() < count {
            if self.is_working_day(date) {
                days.push(date);
            }
            match date.checked_add_days(Days::new(1)) {
                Some(next) => date = next,
                None => break,
            }
        }
        days
    }
}

impl BudgetRule for WorkCalendar {
    fn budget_for(&self, date: NaiveDate) -> u32 {
        self.weekday_budget(date.weekday())
    }
}
