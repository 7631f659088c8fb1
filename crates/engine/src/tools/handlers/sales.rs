use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::ToolDefinition;
use crate::store::StoreError;
use crate::tools::registry::ToolHandler;

use super::list::{FilterParam, ListTool, Matching};
use super::ErpToolContext;

pub(super) static SALES_INVOICES: ListTool = ListTool {
    description: "Get sales invoices, optionally within a posting date range",
    doctype: "Sales Invoice",
    date_column: Some("posting_date"),
    filters: &[FilterParam {
        name: "customer",
        column: "customer",
        description: "Customer name",
        matching: Matching::Exact,
    }],
    positive_column: None,
    columns: None,
    sortable: &["posting_date", "due_date", "grand_total", "outstanding_amount", "modified"],
    default_order_by: "posting_date",
};

pub(super) static OUTSTANDING_INVOICES: ListTool = ListTool {
    description: "Get the list of outstanding (unpaid or partly paid) sales invoices",
    doctype: "Sales Invoice",
    date_column: None,
    filters: &[FilterParam {
        name: "customer",
        column: "customer",
        description: "Customer name",
        matching: Matching::Exact,
    }],
    positive_column: Some("outstanding_amount"),
    columns: None,
    sortable: &["due_date", "posting_date", "outstanding_amount", "modified"],
    default_order_by: "due_date",
};

pub(super) static SALES_ORDERS: ListTool = ListTool {
    description: "Get sales orders, optionally within a transaction date range",
    doctype: "Sales Order",
    date_column: Some("transaction_date"),
    filters: &[FilterParam {
        name: "customer",
        column: "customer",
        description: "Customer name",
        matching: Matching::Exact,
    }],
    positive_column: None,
    columns: None,
    sortable: &["transaction_date", "delivery_date", "grand_total", "modified"],
    default_order_by: "transaction_date",
};

pub(super) static CUSTOMERS: ListTool = ListTool {
    description: "Get a list of customers by name",
    doctype: "Customer",
    date_column: None,
    filters: &[FilterParam {
        name: "customer_name",
        column: "customer_name",
        description: "Customer name to search for (partial match supported)",
        matching: Matching::Contains,
    }],
    positive_column: None,
    columns: None,
    sortable: &["customer_name", "creation", "modified"],
    default_order_by: "customer_name",
};

pub(super) fn sales_invoice_definition(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.into(),
        description: "Get a sales invoice by invoice number".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "invoice_number": {
                    "type": "string",
                    "description": "Invoice number",
                },
            },
            "required": ["invoice_number"],
        }),
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InvoiceArgs {
    invoice_number: String,
}

/// Single invoice lookup. Returns a one-element list, or an empty list when
/// no invoice has that number.
pub(super) fn sales_invoice_handler(ctx: Arc<ErpToolContext>) -> ToolHandler {
    Arc::new(move |args: Value| {
        let ctx = Arc::clone(&ctx);
        Box::pin(async move {
            let args: InvoiceArgs =
                serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

            match ctx.store.fetch_record("Sales Invoice", &args.invoice_number).await {
                Ok(invoice) => Ok(json!([invoice])),
                Err(StoreError::NotFound(_)) => Ok(json!([])),
                Err(e) => Err(format!("Failed to get sales invoice: {}", e)),
            }
        })
    })
}
