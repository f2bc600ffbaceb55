/// Resolves one of the ten cardinal numerals used in volume and chapter
/// numbering to its decimal string. Anything outside the closed set passes
/// through unchanged, so callers never see an error for exotic numbering.
pub fn resolve_ordinal(token: &str) -> String {
    let resolved = match token {
        "一" => "1",
        "二" => "2",
        "三" => "3",
        "四" => "4",
        "五" => "5",
        "六" => "6",
        "七" => "7",
        "八" => "8",
        "九" => "9",
        "十" => "10",
        _ => return token.to_string(),
    };

    resolved.to_string()
}
