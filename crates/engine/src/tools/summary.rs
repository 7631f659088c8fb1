//! Human-readable one-liners describing a tool result, for the usage log.
//!
//! Summaries are picked by sniffing the result's shape. Rules are tried in
//! order and the first matching predicate wins; anything unrecognized falls
//! through to a generic description. Nothing here can fail.

use serde_json::Value;

type Predicate = fn(&Value) -> bool;
type Summarizer = fn(&Value) -> String;

const RULES: &[(Predicate, Summarizer)] = &[
    (reports_error, summarize_error),
    (has_counted_results, summarize_counted_results),
    (has_periods, summarize_periods),
    (has_results, summarize_results),
    (Value::is_array, summarize_array),
];

/// Summarize a successful tool result.
pub fn summarize(result: &Value) -> String {
    RULES
        .iter()
        .find(|(matches, _)| matches(result))
        .map(|(_, summarize)| summarize(result))
        .unwrap_or_else(|| summarize_other(result))
}

fn reports_error(v: &Value) -> bool {
    v.get("error").is_some_and(Value::is_string)
}

fn summarize_error(v: &Value) -> String {
    format!(
        "Tool reported an error: {}",
        v["error"].as_str().unwrap_or_default()
    )
}

fn has_counted_results(v: &Value) -> bool {
    v.get("results").is_some_and(Value::is_array) && v.get("total_count").is_some_and(Value::is_u64)
}

fn summarize_counted_results(v: &Value) -> String {
    let returned = result_len(v);
    let total = v["total_count"].as_u64().unwrap_or_default() as usize;
    let truncated = v.get("truncated").is_some();

    let mut summary = if total > returned {
        format!("Retrieved {} of {} records", returned, total)
    } else {
        format!("Retrieved {} {}", returned, plural(returned, "record"))
    };
    if truncated {
        summary.push_str(" (truncated)");
    }
    summary
}

fn has_periods(v: &Value) -> bool {
    v.get("periods").is_some_and(Value::is_array)
}

fn summarize_periods(v: &Value) -> String {
    let periods = v["periods"].as_array().map(Vec::len).unwrap_or_default();
    format!("Computed {} reporting {}", periods, plural(periods, "period"))
}

fn has_results(v: &Value) -> bool {
    v.get("results").is_some_and(Value::is_array)
}

fn summarize_results(v: &Value) -> String {
    let n = result_len(v);
    format!("Retrieved {} {}", n, plural(n, "record"))
}

fn summarize_array(v: &Value) -> String {
    let n = v.as_array().map(Vec::len).unwrap_or_default();
    format!("Retrieved {} {}", n, plural(n, "record"))
}

fn summarize_other(v: &Value) -> String {
    match v {
        Value::Object(map) => format!("Returned {} {}", map.len(), plural(map.len(), "field")),
        Value::Null => "Returned no data".into(),
        _ => "Completed".into(),
    }
}

fn result_len(v: &Value) -> usize {
    v["results"].as_array().map(Vec::len).unwrap_or_default()
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}
