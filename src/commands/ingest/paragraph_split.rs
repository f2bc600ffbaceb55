/// Minimum size (in chars) before a buffer may close at a separator.
const SEMANTIC_UNIT_MIN_CHARS: usize = 20;
/// Greedy merge ceiling for phase B, in chars.
const PARAGRAPH_MERGE_LIMIT_CHARS: usize = 800;

const SEGMENT_SEPARATORS: [char; 5] = ['。', '！', '？', '；', '\n'];
const TERMINAL_MARKS: [char; 4] = ['。', '！', '？', '；'];

/// Splits classical prose into size-bounded paragraph groups that never cut
/// mid-sentence: sentence-respecting segmentation followed by a greedy merge
/// of short units. Total for any input; the empty string yields nothing.
pub fn split_classical_paragraphs(text: &str) -> Vec<String> {
    merge_short_units(segment_semantic_units(text))
}

/// Phase A: scan char by char and close the running buffer at a separator
/// only once it qualifies as a semantic unit (long enough and carrying at
/// least one terminal mark). A separator alone never forces a cut, so short
/// clauses keep accumulating. Whatever is left at end of input is emitted.
pub fn segment_semantic_units(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;
    let mut has_terminal_mark = false;

    for character in text.chars() {
        buffer.push(character);
        buffer_chars += 1;
        if TERMINAL_MARKS.contains(&character) {
            has_terminal_mark = true;
        }

        if SEGMENT_SEPARATORS.contains(&character)
            && buffer_chars >= SEMANTIC_UNIT_MIN_CHARS
            && has_terminal_mark
        {
            let unit = buffer.trim();
            if !unit.is_empty() {
                units.push(unit.to_string());
            }
            buffer.clear();
            buffer_chars = 0;
            has_terminal_mark = false;
        }
    }

    let trailing = buffer.trim();
    if !trailing.is_empty() {
        units.push(trailing.to_string());
    }

    units
}

/// Phase B: walk the units left to right, appending (newline-joined) while
/// the combined char count stays under the merge ceiling; otherwise flush
/// and restart from the current unit. No unit is ever dropped, so a group
/// can exceed the ceiling by at most the length of the unit that closed it.
pub fn merge_short_units(units: Vec<String>) -> Vec<String> {
    let mut merged = Vec::new();
    let mut accumulator = String::new();
    let mut accumulator_chars = 0usize;

    for unit in units {
        let unit_chars = unit.chars().count();

        if accumulator_chars + unit_chars < PARAGRAPH_MERGE_LIMIT_CHARS {
            if accumulator.is_empty() {
                accumulator = unit;
                accumulator_chars = unit_chars;
            } else {
                accumulator.push('\n');
                accumulator.push_str(&unit);
                accumulator_chars += unit_chars + 1;
            }
        } else {
            if !accumulator.is_empty() {
                merged.push(accumulator);
            }
            accumulator = unit;
            accumulator_chars = unit_chars;
        }
    }

    if !accumulator.is_empty() {
        merged.push(accumulator);
    }

    merged
}
