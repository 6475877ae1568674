//! Directory names for written reports.

/// Maximum length for the company part of a report directory name
const MAX_SLUG_LENGTH: usize = 30;

/// Lowercase, hyphen-separated form of `text`. Does not truncate.
pub fn slugify(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    // Leading separators are dropped
    let mut prev_dash = true;
    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_dash = false;
        } else if !prev_dash {
            result.push('-');
            prev_dash = true;
        }
    }
    if result.ends_with('-') {
        result.pop();
    }
    result
}

/// [`slugify`] limited to `MAX_SLUG_LENGTH`, cut at a word boundary when
/// one is available.
pub fn slugify_truncate(text: &str) -> String {
    let mut result = slugify(text);
    if result.len() > MAX_SLUG_LENGTH {
        let mut end = MAX_SLUG_LENGTH;
        while !result.is_char_boundary(end) {
            end -= 1;
        }
        match result[..end].rfind('-') {
            Some(pos) if pos > 0 => result.truncate(pos),
            _ => result.truncate(end),
        }
    }
    if result.ends_with('-') {
        result.pop();
    }
    result
}

/// `<company>-<date>` directory name; `report-<date>` when the company name
/// has no usable characters.
pub fn report_slug(company: &str, date: &str) -> String {
    let company = slugify_truncate(company);
    let date = slugify(date);
    match (company.is_empty(), date.is_empty()) {
        (true, true) => "report".to_string(),
        (true, false) => format!("report-{}", date),
        (false, true) => company,
        (false, false) => format!("{}-{}", company, date),
    }
}
