//! PGN movetext helpers.

use regex::Regex;

/// Strip leading tag-pair lines (`[White "..."]`) and return the movetext.
pub fn movetext(pgn: &str) -> &str {
    let mut rest = pgn.trim_start();
    while rest.starts_with('[') {
        match rest.find('\n') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => return "",
        }
    }
    rest
}

/// Byte offsets of `text` that lie outside `{comments}` and `(variations)`.
fn mainline_mask(text: &str) -> Vec<bool> {
    let mut mask = Vec::with_capacity(text.len());
    let mut depth = 0usize;
    let mut in_comment = false;
    for byte in text.bytes() {
        match byte {
            b'{' if !in_comment => in_comment = true,
            b'}' if in_comment => {
                in_comment = false;
                mask.push(false);
                continue;
            }
            b'(' if !in_comment => depth += 1,
            b')' if !in_comment && depth > 0 => {
                depth -= 1;
                mask.push(false);
                continue;
            }
            _ => {}
        }
        mask.push(depth == 0 && !in_comment);
    }
    mask
}

/// Moves still to be played from the position reached after `move_number` plies.
///
/// The full-move index is `move_number / 2`; the text from the first mainline
/// `"<n>."` token to the end of the movetext is returned. A move number that does not
/// appear in the text yields an empty string.
pub fn remaining_moves(move_number: i32, pgn: &str) -> String {
    if move_number < 0 {
        return String::new();
    }

    let text = movetext(pgn);
    let pattern = format!(r"(?:^|\s)({}\.)", move_number / 2);
    let Ok(re) = Regex::new(&pattern) else {
        return String::new();
    };

    let mask = mainline_mask(text);
    let result = re
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .find(|m| mask.get(m.start()).copied().unwrap_or(false))
        .map(|m| text[m.start()..].trim().to_string())
        .unwrap_or_default();
    result
}

/// Render SAN moves as numbered movetext: `1.e4 e5 2.Nf3`.
pub fn format_movetext<S: AsRef<str>>(sans: &[S], result: Option<&str>) -> String {
    let mut out = String::new();
    for (ply, san) in sans.iter().enumerate() {
        if !out.is_empty() {
            out.push(' ');
        }
        if ply % 2 == 0 {
            out.push_str(&format!("{}.", ply / 2 + 1));
        }
        out.push_str(san.as_ref());
    }
    if let Some(result) = result.filter(|r| !r.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(result);
    }
    out
}
