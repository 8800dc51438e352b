//! Local wall-clock time labels for logs and chart points.

use smol_str::SmolStr;
use time::OffsetDateTime;

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn label_at(at: OffsetDateTime) -> SmolStr {
    format!("{:02}:{:02}:{:02}", at.hour(), at.minute(), at.second()).into()
}

/// Current local time formatted as `HH:MM:SS`.
#[must_use]
pub fn now_label() -> SmolStr {
    label_at(local_now())
}

/// Local time `seconds` away from now (negative values look back).
#[must_use]
pub fn offset_label(seconds: i64) -> SmolStr {
    label_at(local_now() + time::Duration::seconds(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_hh_mm_ss() {
        let label = now_label();
        assert_eq!(label.len(), 8);
        let bytes = label.as_bytes();
        assert_eq!(bytes[2], b':');
        assert_eq!(bytes[5], b':');
    }
}
