mod accounting;
mod buying;
mod hr;
mod list;
mod sales;
mod stock;

use std::sync::Arc;

use erpchat_common::config::ToolResultLimits;

use crate::llm::ToolDefinition;
use crate::store::ErpStore;

use super::registry::{ToolHandler, ToolRegistry};

/// Shared state handed to every ERP tool handler.
pub struct ErpToolContext {
    pub store: ErpStore,
    pub limits: ToolResultLimits,
    /// Company used by reports when the model does not name one.
    pub default_company: Option<String>,
}

/// The closed set of ERP query tools the model may call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErpTool {
    SalesInvoices,
    SalesInvoice,
    Employees,
    PurchaseOrders,
    Customers,
    StockLevels,
    GeneralLedgerEntries,
    ProfitAndLossStatement,
    OutstandingInvoices,
    SalesOrders,
    PurchaseInvoices,
    JournalEntries,
    Payments,
}

impl ErpTool {
    /// Every tool, in the order advertised to the model.
    pub const ALL: [ErpTool; 13] = [
        Self::SalesInvoices,
        Self::SalesInvoice,
        Self::Employees,
        Self::PurchaseOrders,
        Self::Customers,
        Self::StockLevels,
        Self::GeneralLedgerEntries,
        Self::ProfitAndLossStatement,
        Self::OutstandingInvoices,
        Self::SalesOrders,
        Self::PurchaseInvoices,
        Self::JournalEntries,
        Self::Payments,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::SalesInvoices => "get_sales_invoices",
            Self::SalesInvoice => "get_sales_invoice",
            Self::Employees => "get_employees",
            Self::PurchaseOrders => "get_purchase_orders",
            Self::Customers => "get_customers",
            Self::StockLevels => "get_stock_levels",
            Self::GeneralLedgerEntries => "get_general_ledger_entries",
            Self::ProfitAndLossStatement => "get_profit_and_loss_statement",
            Self::OutstandingInvoices => "get_outstanding_invoices",
            Self::SalesOrders => "get_sales_orders",
            Self::PurchaseInvoices => "get_purchase_invoices",
            Self::JournalEntries => "get_journal_entries",
            Self::Payments => "get_payments",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Schema advertised to the model.
    pub fn definition(self) -> ToolDefinition {
        match self.kind() {
            ToolKind::Listing(listing) => listing.definition(self.name()),
            ToolKind::InvoiceLookup => sales::sales_invoice_definition(self.name()),
            ToolKind::ProfitAndLoss => accounting::profit_and_loss_definition(self.name()),
        }
    }

    pub fn handler(self, ctx: Arc<ErpToolContext>) -> ToolHandler {
        match self.kind() {
            ToolKind::Listing(listing) => listing.handler(ctx),
            ToolKind::InvoiceLookup => sales::sales_invoice_handler(ctx),
            ToolKind::ProfitAndLoss => accounting::profit_and_loss_handler(ctx),
        }
    }

    fn kind(self) -> ToolKind {
        match self {
            Self::SalesInvoices => ToolKind::Listing(&sales::SALES_INVOICES),
            Self::SalesInvoice => ToolKind::InvoiceLookup,
            Self::Employees => ToolKind::Listing(&hr::EMPLOYEES),
            Self::PurchaseOrders => ToolKind::Listing(&buying::PURCHASE_ORDERS),
            Self::Customers => ToolKind::Listing(&sales::CUSTOMERS),
            Self::StockLevels => ToolKind::Listing(&stock::STOCK_LEVELS),
            Self::GeneralLedgerEntries => ToolKind::Listing(&accounting::GENERAL_LEDGER_ENTRIES),
            Self::ProfitAndLossStatement => ToolKind::ProfitAndLoss,
            Self::OutstandingInvoices => ToolKind::Listing(&sales::OUTSTANDING_INVOICES),
            Self::SalesOrders => ToolKind::Listing(&sales::SALES_ORDERS),
            Self::PurchaseInvoices => ToolKind::Listing(&buying::PURCHASE_INVOICES),
            Self::JournalEntries => ToolKind::Listing(&accounting::JOURNAL_ENTRIES),
            Self::Payments => ToolKind::Listing(&accounting::PAYMENTS),
        }
    }
}

/// How a tool is implemented: most are plain listings.
enum ToolKind {
    Listing(&'static list::ListTool),
    InvoiceLookup,
    ProfitAndLoss,
}

/// Register every ERP tool with the registry.
pub fn register_erp_tools(registry: &mut ToolRegistry, ctx: ErpToolContext) {
    let ctx = Arc::new(ctx);
    for tool in ErpTool::ALL {
        registry.register(tool.definition(), tool.handler(Arc::clone(&ctx)));
    }
    tracing::debug!(tools = ErpTool::ALL.len(), "Registered ERP tools");
}
