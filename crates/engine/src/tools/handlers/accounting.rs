use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::ToolDefinition;
use crate::store::Periodicity;
use crate::tools::registry::ToolHandler;

use super::list::{parse_date, FilterParam, ListTool, Matching};
use super::ErpToolContext;

pub(super) static GENERAL_LEDGER_ENTRIES: ListTool = ListTool {
    description: "Get general ledger entries, optionally within a posting date range",
    doctype: "GL Entry",
    date_column: Some("posting_date"),
    filters: &[FilterParam {
        name: "account",
        column: "account",
        description: "Account name",
        matching: Matching::Exact,
    }],
    positive_column: None,
    columns: None,
    sortable: &["posting_date", "account", "debit", "credit", "modified"],
    default_order_by: "posting_date",
};

pub(super) static JOURNAL_ENTRIES: ListTool = ListTool {
    description: "Get journal entries, optionally within a posting date range",
    doctype: "Journal Entry",
    date_column: Some("posting_date"),
    filters: &[],
    positive_column: None,
    columns: None,
    sortable: &["posting_date", "total_debit", "modified"],
    default_order_by: "posting_date",
};

pub(super) static PAYMENTS: ListTool = ListTool {
    description: "Get payment entries, optionally within a posting date range",
    doctype: "Payment Entry",
    date_column: Some("posting_date"),
    filters: &[FilterParam {
        name: "payment_type",
        column: "payment_type",
        description: "Payment type (e.g., Receive, Pay)",
        matching: Matching::Exact,
    }],
    positive_column: None,
    columns: None,
    sortable: &["posting_date", "paid_amount", "modified"],
    default_order_by: "posting_date",
};

const MISSING_PERIOD_ARGS: &str = "period_start_date, periodicity and period_end_date are required";

pub(super) fn profit_and_loss_definition(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: "Get the profit and loss statement report".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "period_start_date": {
                    "type": "string",
                    "description": "Start date in YYYY-MM-DD format",
                },
                "period_end_date": {
                    "type": "string",
                    "description": "End date in YYYY-MM-DD format",
                },
                "periodicity": {
                    "type": "string",
                    "enum": ["Monthly", "Quarterly", "Half-Yearly", "Yearly"],
                    "description": "Periodicity of the report",
                },
                "company": {
                    "type": "string",
                    "description": "Company name; defaults to the user's company",
                },
            },
            "required": ["period_start_date", "period_end_date", "periodicity"],
        }),
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfitAndLossArgs {
    period_start_date: Option<String>,
    period_end_date: Option<String>,
    periodicity: Option<String>,
    company: Option<String>,
}

/// P&L per period. Missing required arguments produce an `error` payload the
/// model can read, not a dispatch failure.
pub(super) fn profit_and_loss_handler(ctx: Arc<ErpToolContext>) -> ToolHandler {
    Arc::new(move |args: Value| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move {
            let args: ProfitAndLossArgs =
                serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

            let from = parse_date("period_start_date", args.period_start_date.as_deref())?;
            let to = parse_date("period_end_date", args.period_end_date.as_deref())?;
            let periodicity = args.periodicity.as_deref().map(str::trim).filter(|s| !s.is_empty());

            let (Some(from), Some(to), Some(periodicity)) = (from, to, periodicity) else {
                return Ok(json!({ "error": MISSING_PERIOD_ARGS }));
            };
            let periodicity = Periodicity::parse(periodicity).ok_or_else(|| {
                format!(
                    "Invalid arguments: periodicity must be Monthly, Quarterly, Half-Yearly or Yearly, got {:?}",
                    periodicity
                )
            })?;
            if from > to {
                return Err(format!(
                    "Invalid arguments: period_start_date {} is after period_end_date {}",
                    from, to
                ));
            }

            let company = args
                .company
                .filter(|c| !c.trim().is_empty())
                .or_else(|| ctx.default_company.clone());

            let report = ctx
                .store
                .profit_and_loss(from, to, periodicity, company)
                .await
                .map_err(|e| format!("Failed to compute profit and loss: {}", e))?;

            serde_json::to_value(report).map_err(|e| e.to_string())
        })
    })
}
