/// Wall clock milliseconds since the Unix epoch.
#[inline]
pub fn current_time_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
