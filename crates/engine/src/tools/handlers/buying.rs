use super::list::{FilterParam, ListTool, Matching};

const SUPPLIER: FilterParam = FilterParam {
    name: "supplier",
    column: "supplier",
    description: "Supplier name",
    matching: Matching::Exact,
};

pub(super) static PURCHASE_ORDERS: ListTool = ListTool {
    description: "Get purchase orders, optionally within a transaction date range",
    doctype: "Purchase Order",
    date_column: Some("transaction_date"),
    filters: &[SUPPLIER],
    positive_column: None,
    columns: None,
    sortable: &["transaction_date", "schedule_date", "grand_total", "modified"],
    default_order_by: "transaction_date",
};

pub(super) static PURCHASE_INVOICES: ListTool = ListTool {
    description: "Get purchase invoices, optionally within a posting date range",
    doctype: "Purchase Invoice",
    date_column: Some("posting_date"),
    filters: &[SUPPLIER],
    positive_column: None,
    columns: None,
    sortable: &["posting_date", "due_date", "grand_total", "outstanding_amount", "modified"],
    default_order_by: "posting_date",
};
