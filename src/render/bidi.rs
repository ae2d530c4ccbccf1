use unicode_bidi::{BidiInfo, Level};

/// Direction of the paragraph a subtitle line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDirection {
    /// Detect from the first strong character
    Auto,
    RightToLeft,
}

/// Reorder a logical-order string into left-to-right visual order
///
/// Runs at odd embedding levels are reversed and their paired punctuation is
/// mirrored, so a plain left-to-right glyph layout of the result reads
/// correctly for right-to-left scripts. Newlines are flattened to spaces.
pub fn visual_order(text: &str, direction: BaseDirection) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flattened.is_empty() {
        return flattened;
    }

    let base_level = match direction {
        BaseDirection::Auto => None,
        BaseDirection::RightToLeft => Some(Level::rtl()),
    };
    let info = BidiInfo::new(&flattened, base_level);

    let mut visual = String::with_capacity(flattened.len());
    for paragraph in &info.paragraphs {
        let (levels, runs) = info.visual_runs(paragraph, paragraph.range.clone());
        for run in runs {
            let slice = &flattened[run.clone()];
            if levels[run.start].is_rtl() {
                visual.extend(slice.chars().rev().map(mirror));
            } else {
                visual.push_str(slice);
            }
        }
    }
    visual
}

/// Mirrored counterpart of paired punctuation
fn mirror(c: char) -> char {
    match c {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '«' => '»',
        '»' => '«',
        '‹' => '›',
        '›' => '‹',
        other => other,
    }
}
