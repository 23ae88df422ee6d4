//! Wall-clock utilities with clock abstraction for testability.

use chrono::{DateTime, Local, TimeZone};

/// Format used for console timestamps.
pub const CLOCK_TIME_FORMAT: &str = "%H:%M:%S";

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get the current local wall-clock time
    fn now(&self) -> DateTime<Local>;
}

/// System clock implementation (uses actual system time)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Fixed clock implementation for testing (returns a fixed time)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    fixed_time: DateTime<Local>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    pub fn new(fixed_time: DateTime<Local>) -> Self {
        Self { fixed_time }
    }

    /// Create a fixed clock showing the given local wall-clock time today.
    ///
    /// Falls back to the current time when the wall-clock time does not exist
    /// locally (e.g., inside a DST gap).
    pub fn at_hms(hour: u32, minute: u32, second: u32) -> Self {
        let fixed_time = Local::now()
            .date_naive()
            .and_hms_opt(hour, minute, second)
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .unwrap_or_else(Local::now);
        Self { fixed_time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.fixed_time
    }
}

/// Format a time as `HH:MM:SS`
pub fn format_clock_time(time: &DateTime<Local>) -> String {
    time.format(CLOCK_TIME_FORMAT).to_string()
}

/// Get the current Unix timestamp in seconds
pub fn unix_timestamp_secs(clock: &dyn Clock) -> i64 {
    clock.now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_returns_increasing_times() {
        // テスト項目: SystemClock が呼び出すたびに単調に増加する時刻を返す
        // given (前提条件):
        let clock = SystemClock;

        // when (操作):
        let time1 = clock.now();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let time2 = clock.now();

        // then (期待する結果):
        assert!(time2 >= time1);
    }

    #[test]
    fn test_fixed_clock_returns_consistent_time() {
        // テスト項目: FixedClock が複数回呼び出しても同じ時刻を返す
        // given (前提条件):
        let clock = FixedClock::at_hms(12, 34, 56);

        // when (操作):
        let time1 = clock.now();
        let time2 = clock.now();

        // then (期待する結果):
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_format_clock_time_pads_fields() {
        // テスト項目: 時刻が 2 桁ゼロ埋めの HH:MM:SS 形式に変換される
        // given (前提条件):
        let clock = FixedClock::at_hms(9, 5, 7);

        // when (操作):
        let result = format_clock_time(&clock.now());

        // then (期待する結果):
        assert_eq!(result, "09:05:07");
    }

    #[test]
    fn test_unix_timestamp_secs_matches_fixed_clock() {
        // テスト項目: unix_timestamp_secs が Clock の時刻から秒単位のタイムスタンプを返す
        // given (前提条件):
        let fixed = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = FixedClock::new(fixed);

        // when (操作):
        let timestamp = unix_timestamp_secs(&clock);

        // then (期待する結果):
        assert_eq!(timestamp, 1_700_000_000);
    }
}
