//! Chat formatting codes.
//!
//! Titles are written with an alternate code character (usually `&`) and
//! translated to the section sign the client understands.

/// The formatting prefix the client renders.
pub const SECTION_SIGN: char = '§';

const FORMAT_CODES: &str = "0123456789AaBbCcDdEeFfKkLlMmNnOoRrXx";

/// Replace `alt` followed by a valid format code with `§` and the lowercased code.
///
/// An `alt` not followed by a format code is left untouched.
pub fn translate_color_codes(alt: char, text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    for i in 0..chars.len().saturating_sub(1) {
        if chars[i] == alt && FORMAT_CODES.contains(chars[i + 1]) {
            chars[i] = SECTION_SIGN;
            chars[i + 1] = chars[i + 1].to_ascii_lowercase();
        }
    }
    chars.into_iter().collect()
}

/// Remove every `§` format code from `text`.
pub fn strip_color(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == SECTION_SIGN {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}
