/// Normalize a player/clan/war tag: strip whitespace, uppercase, ensure a
/// leading `#`. Returns an empty string for blank input.
pub fn normalize_tag(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if cleaned.is_empty() {
        return String::new();
    }
    if cleaned.starts_with('#') {
        cleaned
    } else {
        format!("#{cleaned}")
    }
}

/// Path-safe form of a tag for cache directories (`#` stripped).
pub fn tag_path_segment(tag: &str) -> String {
    normalize_tag(tag).trim_start_matches('#').to_string()
}
