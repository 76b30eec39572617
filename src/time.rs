use std::fmt;

use chrono::{SecondsFormat, Utc};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

/// Formats the current UTC time as RFC 3339 with nanosecond precision, e.g.
/// `2024-05-01T09:30:00.123456789Z`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Nanos;

impl FormatTime for Rfc3339Nanos {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        w.write_str(&Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

    use super::Rfc3339Nanos;

    #[test]
    fn nanosecond_precision_utc() {
        let mut timestamp = String::new();
        Rfc3339Nanos
            .format_time(&mut Writer::new(&mut timestamp))
            .unwrap();

        assert!(timestamp.ends_with('Z'), "{timestamp}");
        let (_, fraction) = timestamp.trim_end_matches('Z').split_once('.').unwrap();
        assert_eq!(fraction.len(), 9);
        DateTime::parse_from_rfc3339(&timestamp).unwrap();
    }
}
