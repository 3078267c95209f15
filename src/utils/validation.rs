use std::path::{Component, Path};

/// Longest file name kept from a client-supplied name, in bytes.
pub const MAX_FILENAME_LEN: usize = 200;

/// Name used when the client supplies no usable file name.
pub const FALLBACK_FILENAME: &str = "unnamed";

/// Reduce a client-supplied file name to something safe to store in the
/// staging directory. Any file type is accepted; only the name is touched.
pub fn sanitize_filename(filename: &str) -> String {
    // Browsers on Windows may send full paths with backslashes
    let last = filename.rsplit(['/', '\\']).next().unwrap_or("");

    let sanitized: String = last
        .chars()
        .map(|c| {
            if c.is_control()
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    let sanitized = sanitized.trim();
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        return FALLBACK_FILENAME.to_string();
    }

    // Limit length safely for UTF-8
    if sanitized.len() > MAX_FILENAME_LEN {
        let mut end = MAX_FILENAME_LEN;
        while !sanitized.is_char_boundary(end) {
            end -= 1;
        }
        sanitized[..end].to_string()
    } else {
        sanitized.to_string()
    }
}

/// True when `name` addresses a file directly inside a directory, with no
/// separators, parent references or root components.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
