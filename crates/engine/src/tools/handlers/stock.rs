use super::list::{FilterParam, ListTool, Matching};

/// Per-warehouse quantities from the stock bins.
pub(super) static STOCK_LEVELS: ListTool = ListTool {
    description: "Get current stock levels per item and warehouse",
    doctype: "Bin",
    date_column: None,
    filters: &[
        FilterParam {
            name: "item_code",
            column: "item_code",
            description: "Item code",
            matching: Matching::Exact,
        },
        FilterParam {
            name: "warehouse",
            column: "warehouse",
            description: "Warehouse",
            matching: Matching::Exact,
        },
    ],
    positive_column: None,
    columns: Some(&["item_code", "warehouse", "actual_qty"]),
    sortable: &["item_code", "warehouse", "actual_qty"],
    default_order_by: "item_code",
};
