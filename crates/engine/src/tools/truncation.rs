use erpchat_common::config::ToolResultLimits;
use serde_json::Value;

/// Row cap for a list query: the requested limit, never above the configured max.
pub fn capped_limit(requested: Option<u32>, limits: &ToolResultLimits) -> u32 {
    requested.map_or(limits.max_records, |l| l.min(limits.max_records))
}

/// Note matching records that the cap kept out of `results`.
///
/// Only a full page counts as truncated: a page shorter than the max means the
/// caller asked for fewer rows, or there were no more.
pub fn mark_truncated(result: &mut Value, total_count: i64, offset: u32, limits: &ToolResultLimits) {
    let returned = match result.get("results").and_then(Value::as_array) {
        Some(arr) => arr.len() as i64,
        None => return,
    };
    if returned < i64::from(limits.max_records) {
        return;
    }

    let omitted = total_count - i64::from(offset) - returned;
    if omitted > 0 {
        if let Some(obj) = result.as_object_mut() {
            obj.insert(
                "truncated".into(),
                Value::String(format!("[{} more results omitted]", omitted)),
            );
        }
    }
}
