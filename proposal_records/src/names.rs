/// Turns a "Last, First" name into "First Last".
///
/// Only the first comma splits the name: everything after it is the first
/// name. Names without a comma, and missing names, are returned unchanged.
pub fn format_name(name: Option<&str>) -> Option<String> {
    let name = name?;
    match name.split_once(',') {
        Some((last, first)) => Some(format!("{} {}", first.trim(), last.trim())),
        None => Some(name.to_string()),
    }
}
