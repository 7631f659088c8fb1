//! Shared machinery for tools that list one doctype's records.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::llm::ToolDefinition;
use crate::store::{RecordFilter, RecordQuery, SortOrder};
use crate::tools::registry::ToolHandler;
use crate::tools::truncation::{capped_limit, mark_truncated};
use erpchat_common::config::ToolResultLimits;

use super::ErpToolContext;

/// How a free-text parameter is matched against its column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Matching {
    Exact,
    Contains,
}

/// An optional string parameter that narrows the listing.
pub(super) struct FilterParam {
    pub name: &'static str,
    pub column: &'static str,
    pub description: &'static str,
    pub matching: Matching,
}

/// Static description of a list tool: what it reads and how it can be narrowed.
pub(super) struct ListTool {
    pub description: &'static str,
    pub doctype: &'static str,
    /// Column filtered by `start_date`/`end_date`. `None` means no date range.
    pub date_column: Option<&'static str>,
    pub filters: &'static [FilterParam],
    /// Column that must be strictly positive on every returned record.
    pub positive_column: Option<&'static str>,
    /// Returned columns. `None` returns whole records.
    pub columns: Option<&'static [&'static str]>,
    pub sortable: &'static [&'static str],
    pub default_order_by: &'static str,
}

#[derive(Deserialize)]
struct ListArgs {
    start_date: Option<String>,
    end_date: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    order_by: Option<String>,
    order: Option<SortOrder>,
    #[serde(flatten)]
    rest: HashMap<String, Value>,
}

impl ListTool {
    pub fn definition(&self, name: &str) -> ToolDefinition {
        let mut properties = Map::new();
        let mut required = Vec::new();

        if self.date_column.is_some() {
            properties.insert(
                "start_date".into(),
                json!({"type": "string", "description": "Start date in YYYY-MM-DD format"}),
            );
            properties.insert(
                "end_date".into(),
                json!({"type": "string", "description": "End date in YYYY-MM-DD format"}),
            );
            required.extend(["start_date", "end_date"]);
        }
        for filter in self.filters {
            properties.insert(
                filter.name.into(),
                json!({"type": "string", "description": filter.description}),
            );
        }
        properties.insert(
            "limit".into(),
            json!({"type": "integer", "description": "Maximum number of records to return"}),
        );
        properties.insert(
            "offset".into(),
            json!({"type": "integer", "description": "Number of records to skip"}),
        );
        properties.insert(
            "order_by".into(),
            json!({"type": "string", "enum": self.sortable, "description": "Field to sort by"}),
        );
        properties.insert(
            "order".into(),
            json!({"type": "string", "enum": ["asc", "desc"], "description": "Sort direction"}),
        );

        ToolDefinition {
            name: name.into(),
            description: self.description.into(),
            parameters: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    /// Turn model arguments into a record query.
    ///
    /// Empty strings count as absent. The date range applies only when both
    /// bounds are present. Unknown parameters are rejected. The row limit is
    /// always set and never exceeds `limits.max_records`.
    pub fn query_from_args(
        &self,
        args: Value,
        limits: &ToolResultLimits,
    ) -> Result<RecordQuery, String> {
        let args: ListArgs =
            serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

        let mut query = RecordQuery::new(self.doctype);
        query.columns = self.columns;
        query.order_by = self.default_order_by;

        if let Some(column) = self.positive_column {
            query.filters.push(RecordFilter::Positive { column });
        }

        if let Some(column) = self.date_column {
            let from = parse_date("start_date", args.start_date.as_deref())?;
            let to = parse_date("end_date", args.end_date.as_deref())?;
            if let (Some(from), Some(to)) = (from, to) {
                query.filters.push(RecordFilter::Between { column, from, to });
            }
        } else if args.start_date.is_some() || args.end_date.is_some() {
            return Err("Invalid arguments: this tool does not filter by date".into());
        }

        let mut rest = args.rest;
        for filter in self.filters {
            let Some(value) = rest.remove(filter.name) else {
                continue;
            };
            let value = match value {
                Value::Null => continue,
                Value::String(s) if s.trim().is_empty() => continue,
                Value::String(s) => s,
                other => {
                    return Err(format!(
                        "Invalid arguments: {} must be a string, got {}",
                        filter.name, other
                    ))
                }
            };
            query.filters.push(match filter.matching {
                Matching::Exact => RecordFilter::Equals {
                    column: filter.column,
                    value,
                },
                Matching::Contains => RecordFilter::Contains {
                    column: filter.column,
                    needle: value,
                },
            });
        }
        if let Some(unknown) = rest.keys().min() {
            return Err(format!("Invalid arguments: unexpected parameter {}", unknown));
        }

        if let Some(order_by) = args.order_by.filter(|s| !s.is_empty()) {
            query.order_by = self
                .sortable
                .iter()
                .copied()
                .find(|c| *c == order_by)
                .ok_or_else(|| format!("Invalid arguments: cannot sort by {}", order_by))?;
        }
        query.order = args.order.unwrap_or_default();
        query.limit = Some(capped_limit(args.limit, limits));
        query.offset = args.offset;

        Ok(query)
    }

    /// Handler that runs this listing against the ERP store.
    pub fn handler(&'static self, ctx: Arc<ErpToolContext>) -> ToolHandler {
        Arc::new(move |args: Value| {
            let ctx = Arc::clone(&ctx);
            Box::pin(async move {
                let query = self.query_from_args(args, &ctx.limits)?;
                let page = ctx
                    .store
                    .fetch_records(&query)
                    .await
                    .map_err(|e| format!("Failed to list {}: {}", self.doctype, e))?;

                let mut result = json!({
                    "results": page.records,
                    "total_count": page.total_count,
                });
                mark_truncated(
                    &mut result,
                    page.total_count,
                    query.offset.unwrap_or(0),
                    &ctx.limits,
                );
                Ok(result)
            })
        })
    }
}

/// Parse an optional `YYYY-MM-DD` argument. Empty means absent.
pub(super) fn parse_date(param: &str, value: Option<&str>) -> Result<Option<NaiveDate>, String> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| format!("Invalid arguments: {} must be YYYY-MM-DD, got {:?}", param, s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ORDERS: ListTool = ListTool {
        description: "Get sales orders",
        doctype: "Sales Order",
        date_column: Some("transaction_date"),
        filters: &[
            FilterParam {
                name: "customer",
                column: "customer",
                description: "Customer name",
                matching: Matching::Exact,
            },
            FilterParam {
                name: "customer_name",
                column: "customer_name",
                description: "Partial customer name",
                matching: Matching::Contains,
            },
        ],
        positive_column: None,
        columns: None,
        sortable: &["transaction_date", "grand_total", "modified"],
        default_order_by: "transaction_date",
    };

    static OUTSTANDING: ListTool = ListTool {
        description: "Get outstanding invoices",
        doctype: "Sales Invoice",
        date_column: None,
        filters: &[],
        positive_column: Some("outstanding_amount"),
        columns: None,
        sortable: &["due_date"],
        default_order_by: "due_date",
    };

    const LIMITS: ToolResultLimits = ToolResultLimits { max_records: 100 };

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_definition_schema() {
        let def = ORDERS.definition("get_sales_orders");
        assert_eq!(def.name, "get_sales_orders");
        assert_eq!(def.parameters["type"], "object");
        assert_eq!(def.parameters["required"], json!(["start_date", "end_date"]));
        let props = &def.parameters["properties"];
        for key in ["start_date", "end_date", "customer", "customer_name", "limit", "offset", "order_by", "order"] {
            assert!(props.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(props["order_by"]["enum"][1], "grand_total");

        let def = OUTSTANDING.definition("get_outstanding_invoices");
        assert_eq!(def.parameters["required"], json!([]));
        assert!(def.parameters["properties"].get("start_date").is_none());
    }

    #[test]
    fn test_full_arguments() {
        let query = ORDERS
            .query_from_args(
                json!({
                    "start_date": "2024-01-01",
                    "end_date": "2024-01-31",
                    "customer": "Acme",
                    "customer_name": "acm",
                    "limit": 5,
                    "offset": 10,
                    "order_by": "grand_total",
                    "order": "asc",
                }),
                &LIMITS,
            )
            .unwrap();

        assert_eq!(query.doctype, "Sales Order");
        assert_eq!(
            query.filters,
            vec![
                RecordFilter::Between {
                    column: "transaction_date",
                    from: date("2024-01-01"),
                    to: date("2024-01-31"),
                },
                RecordFilter::Equals {
                    column: "customer",
                    value: "Acme".into(),
                },
                RecordFilter::Contains {
                    column: "customer_name",
                    needle: "acm".into(),
                },
            ]
        );
        assert_eq!(query.order_by, "grand_total");
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, Some(10));
    }

    #[test]
    fn test_absent_and_partial_filters_are_omitted() {
        let query = ORDERS
            .query_from_args(
                json!({"start_date": "2024-01-01", "customer": "", "customer_name": null}),
                &LIMITS,
            )
            .unwrap();
        assert!(query.filters.is_empty());
        assert_eq!(query.order_by, "transaction_date");
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.limit, Some(100));
    }

    #[test]
    fn test_base_filter_always_applies() {
        let query = OUTSTANDING.query_from_args(json!({}), &LIMITS).unwrap();
        assert_eq!(
            query.filters,
            vec![RecordFilter::Positive {
                column: "outstanding_amount"
            }]
        );
    }

    #[test]
    fn test_invalid_arguments() {
        let cases = [
            json!({"start_date": "01/02/2024", "end_date": "2024-01-31"}),
            json!({"customer": 42}),
            json!({"supplier": "Globex"}),
            json!({"order_by": "password"}),
            json!({"order": "sideways"}),
            json!({"limit": -1}),
        ];
        for args in cases {
            let err = ORDERS.query_from_args(args.clone(), &LIMITS).unwrap_err();
            assert!(err.starts_with("Invalid arguments"), "{} -> {}", args, err);
        }

        let err = OUTSTANDING
            .query_from_args(json!({"start_date": "2024-01-01"}), &LIMITS)
            .unwrap_err();
        assert!(err.contains("does not filter by date"));
    }

    #[test]
    fn test_limit_is_capped_in_sql() {
        let limits = ToolResultLimits { max_records: 50 };

        let query = ORDERS.query_from_args(json!({}), &limits).unwrap();
        assert_eq!(query.limit, Some(50));
        let sql = crate::store::build_record_query(&query).sql().to_string();
        assert!(sql.ends_with("LIMIT $1"), "{}", sql);

        let query = ORDERS.query_from_args(json!({"limit": 10000}), &limits).unwrap();
        assert_eq!(query.limit, Some(50));

        let query = ORDERS.query_from_args(json!({"limit": 7}), &limits).unwrap();
        assert_eq!(query.limit, Some(7));
    }
}
