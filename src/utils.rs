use std::borrow::Cow;

pub fn make_single_line(s: &str) -> Cow<'_, str> {
    if s.contains('\n') {
        Cow::Owned(s.replace('\n', "↵"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Final component of a `/` separated path, empty if the path ends with `/`
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Splits a comma separated address list, trimming whitespace and dropping empty entries
pub fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}
