use chrono::{DateTime, FixedOffset, Utc};

/// All sheet timestamps are rendered in KST, the market this tracker follows.
const KST_OFFSET_SECS: i32 = 9 * 3600;

pub fn now_kst() -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is in range");
    Utc::now().with_timezone(&offset)
}

/// Row timestamp, e.g. `2026-08-04 14:03:11`.
pub fn timestamp(at: DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Batch identifier, e.g. `20260804-140311`.
pub fn batch_id(at: DateTime<FixedOffset>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}
