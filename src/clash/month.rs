use chrono::Utc;

/// Month key (YYYY-MM) for the current UTC month.
pub fn current_month_key() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Shape check for a YYYY-MM month key. Callers are expected to validate
/// before handing a month to the scoring core.
pub fn is_valid_month_key(key: &str) -> bool {
    let bytes = key.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
}

/// Extract YYYY-MM from a war timestamp like "20251203T081925.000Z".
pub fn month_key_from_end_time(end_time: &str) -> Option<String> {
    let (date, _) = end_time.split_once('T')?;
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}", &date[..4], &date[4..6]))
}
