//! Output file names for finished chapters.

use crate::audio::TargetFormat;

/// Keep alphanumerics, spaces, hyphens and underscores.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// File name for a chapter's final file: `NN - Title.ext`.
pub fn final_file_name(number: usize, title: &str, format: TargetFormat) -> String {
    let mut safe = sanitize_title(title);
    if safe.is_empty() {
        safe = format!("Chapter {}", number);
    }
    format!("{:02} - {}.{}", number, safe, format.extension())
}
