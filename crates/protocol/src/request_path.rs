/// Lexically clean a client-supplied directory, rooted at `/`.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment and
/// never climbs above the root. The result always starts with `/` and has no
/// trailing separator unless it is the root itself.
pub fn clean_request_path(raw: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// True when a cleaned path names the filesystem root, which is never a valid
/// media directory.
pub fn is_root(cleaned: &str) -> bool {
    cleaned == "/"
}
