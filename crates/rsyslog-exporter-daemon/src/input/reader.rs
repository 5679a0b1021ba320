//! Line framing for omprog input.
//!
//! rsyslog may prefix the impstats JSON with a syslog header depending on the
//! template; the object is whatever sits between the first `{` and the last
//! `}`.

/// The JSON object inside `line`, or the whole trimmed line when there is no
/// `{...}` pair (the store then counts it as a parse failure).
pub fn extract_json(line: &str) -> &str {
    let line = line.trim_end_matches(['\r', '\n']);
    match (line.find('{'), line.rfind('}')) {
        (Some(start), Some(end)) if start < end => &line[start..=end],
        _ => line,
    }
}
