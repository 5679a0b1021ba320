//! Metric-name normalization.
//!
//! Origins, field names and counter suffixes all pass through the same rule so
//! the derived metric namespace stays stable and Prometheus-safe.

/// Lower-case, map everything outside `[a-z0-9_]` to `_`, collapse runs of `_`
/// and trim them from both ends.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = true; // swallows leading `_`

    for c in raw.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '_'
        };
        if c == '_' {
            if !last_underscore {
                out.push('_');
            }
            last_underscore = true;
        } else {
            out.push(c);
            last_underscore = false;
        }
    }

    if out.ends_with('_') {
        out.pop();
    }
    out
}

/// Join a metric base and a raw field name.
pub fn metric_name(base: &str, field: &str) -> String {
    format!("{base}_{}", normalize(field))
}
