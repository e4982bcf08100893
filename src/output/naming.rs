//! File and directory naming helpers

/// Longest sanitized stem kept in a filename
const MAX_STEM_LEN: usize = 50;

/// Turns arbitrary text into a filesystem-safe stem
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, runs of `_` collapse
/// into one, and the result is cut to 50 characters.
pub fn sanitize_stem(text: &str) -> String {
    let mut clean = String::with_capacity(text.len());
    for c in text.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' && clean.ends_with('_') {
            continue;
        }
        clean.push(c);
    }
    // Only ASCII remains, so byte truncation is char-safe
    clean.truncate(MAX_STEM_LEN);
    clean
}

/// Base HTML filename for a thread title
pub fn clean_filename(title: &str) -> String {
    format!("{}.html", sanitize_stem(title))
}

/// Name of part `part` derived from a base filename: `<base>_p<N>.<ext>`
pub fn part_filename(base_filename: &str, part: u32) -> String {
    let (stem, ext) = match base_filename.rfind('.') {
        Some(idx) if idx > 0 => base_filename.split_at(idx),
        _ => (base_filename, ""),
    };
    format!("{}_p{}{}", stem, part, ext)
}

/// Output directory name for a job profile
pub fn output_dir_name(profile: &str) -> String {
    format!("Archive_{}", sanitize_stem(profile))
}
