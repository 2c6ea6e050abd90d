use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Weekly polling cadence shared by every watcher.
///
/// Each feed has a rapid window recurring weekly at its `(day_of_week,
/// anchor_second)` anchor, with Sunday = 0. Inside the window checks run
/// every `rapid_interval`, outside it every `check_interval`. All arithmetic
/// is on naive local wall-clock time, so the functions stay pure.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub check_interval: Duration,
    pub rapid_interval: Duration,
    pub rapid_duration: Duration,
}

impl Schedule {
    pub fn new(
        check_interval_seconds: u64,
        rapid_check_interval_seconds: u64,
        rapid_check_duration_seconds: u64,
    ) -> Self {
        Self {
            check_interval: Duration::seconds(check_interval_seconds as i64),
            rapid_interval: Duration::seconds(rapid_check_interval_seconds as i64),
            rapid_duration: Duration::seconds(rapid_check_duration_seconds as i64),
        }
    }

    /// Most recent occurrence of the weekly anchor at or before `from`.
    ///
    /// If `from` falls on the anchor day but before `anchor_second`, the
    /// anchor for today has not happened yet and the previous week's is
    /// returned instead. The result is never in the future.
    pub fn last_rapid_start(
        &self,
        from: NaiveDateTime,
        day_of_week: u32,
        anchor_second: u32,
    ) -> NaiveDateTime {
        let mut day_diff = day_of_week as i64 - from.weekday().num_days_from_sunday() as i64;
        if day_diff > 0 {
            day_diff -= 7;
        }

        if day_diff == 0 && from < anchor_time(from.date(), anchor_second) {
            day_diff -= 7;
        }

        anchor_time(from.date() + Duration::days(day_diff), anchor_second)
    }

    /// First occurrence of the weekly anchor after `last_rapid_start(from)`.
    pub fn next_rapid_start(
        &self,
        from: NaiveDateTime,
        day_of_week: u32,
        anchor_second: u32,
    ) -> NaiveDateTime {
        self.last_rapid_start(from + Duration::days(7), day_of_week, anchor_second)
    }

    /// Whether `at` falls inside the rapid window. The window start instant
    /// is rapid, the end instant (`start + rapid_duration`) is not.
    pub fn is_rapid(&self, at: NaiveDateTime, day_of_week: u32, anchor_second: u32) -> bool {
        // last_rapid_start never returns a future instant, so only the
        // window end needs checking.
        let start = self.last_rapid_start(at, day_of_week, anchor_second);
        at < start + self.rapid_duration
    }

    /// Plans the check after `last_check`: advance by the cadence active at
    /// `last_check`, but never past the start of the next rapid window, so
    /// the first check of a new window lands exactly on its boundary.
    pub fn next_check_time(
        &self,
        last_check: NaiveDateTime,
        day_of_week: u32,
        anchor_second: u32,
    ) -> NaiveDateTime {
        let interval = if self.is_rapid(last_check, day_of_week, anchor_second) {
            self.rapid_interval
        } else {
            self.check_interval
        };

        let next = last_check + interval;
        next.min(self.next_rapid_start(last_check, day_of_week, anchor_second))
    }

    /// Plans the first check after process start without phase-shifting the
    /// schedule: check instants sit on a fixed grid anchored to the feed's
    /// rapid window, so restarts land on the same instants.
    ///
    /// Inside the window the grid starts at the window start and steps by
    /// `rapid_interval`; outside it the grid starts at the window end and
    /// steps by `check_interval`. `start_time` is rounded up to the next
    /// grid point, clamped to the next window start like `next_check_time`.
    pub fn first_check_time(
        &self,
        start_time: NaiveDateTime,
        day_of_week: u32,
        anchor_second: u32,
    ) -> NaiveDateTime {
        let mut base = self.last_rapid_start(start_time, day_of_week, anchor_second);
        let interval = if self.is_rapid(start_time, day_of_week, anchor_second) {
            self.rapid_interval
        } else {
            base += self.rapid_duration;
            self.check_interval
        };

        let elapsed = (start_time - base).num_seconds();
        let step = interval.num_seconds();
        let periods = (elapsed + step - 1) / step;
        let next = base + Duration::seconds(periods * step);

        next.min(self.next_rapid_start(start_time, day_of_week, anchor_second))
    }
}

fn anchor_time(date: NaiveDate, anchor_second: u32) -> NaiveDateTime {
    // Seconds past midnight; values beyond 86399 would simply spill into the
    // next day, matching plain date + offset arithmetic.
    date.and_time(NaiveTime::MIN) + Duration::seconds(anchor_second as i64)
}
