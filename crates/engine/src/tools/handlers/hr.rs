use super::list::{FilterParam, ListTool, Matching};

pub(super) static EMPLOYEES: ListTool = ListTool {
    description: "Get a list of employees",
    doctype: "Employee",
    date_column: None,
    filters: &[
        FilterParam {
            name: "department",
            column: "department",
            description: "Department",
            matching: Matching::Exact,
        },
        FilterParam {
            name: "designation",
            column: "designation",
            description: "Designation",
            matching: Matching::Exact,
        },
    ],
    positive_column: None,
    columns: None,
    sortable: &["employee_name", "date_of_joining", "modified"],
    default_order_by: "employee_name",
};
