//! Aggregate financial reports computed from the general ledger.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

use super::{ErpStore, StoreError};

/// Reporting period granularity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Periodicity {
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Periodicity {
    /// Parse the ERP's periodicity labels, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(Self::Monthly),
            "quarterly" => Some(Self::Quarterly),
            "half-yearly" | "half yearly" | "halfyearly" => Some(Self::HalfYearly),
            "yearly" | "annual" => Some(Self::Yearly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::HalfYearly => "Half-Yearly",
            Self::Yearly => "Yearly",
        }
    }

    /// SQL expression mapping `gle.posting_date` to the first day of its period.
    fn bucket_sql(self) -> &'static str {
        match self {
            Self::Monthly => "date_trunc('month', gle.posting_date)::date",
            Self::Quarterly => "date_trunc('quarter', gle.posting_date)::date",
            Self::HalfYearly => {
                "make_date(extract(year FROM gle.posting_date)::int, \
                 CASE WHEN extract(month FROM gle.posting_date) <= 6 THEN 1 ELSE 7 END, 1)"
            }
            Self::Yearly => "date_trunc('year', gle.posting_date)::date",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct PeriodTotals {
    pub period_start: NaiveDate,
    pub income: f64,
    pub expense: f64,
    pub net_profit: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub income: f64,
    pub expense: f64,
    pub net_profit: f64,
}

/// Profit and loss statement over a date range.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfitAndLoss {
    /// `None` means all companies.
    pub company: Option<String>,
    pub periodicity: &'static str,
    pub periods: Vec<PeriodTotals>,
    pub totals: ReportTotals,
}

impl ProfitAndLoss {
    fn from_periods(company: Option<String>, periodicity: Periodicity, periods: Vec<PeriodTotals>) -> Self {
        let totals = periods.iter().fold(ReportTotals::default(), |acc, p| ReportTotals {
            income: acc.income + p.income,
            expense: acc.expense + p.expense,
            net_profit: acc.net_profit + p.net_profit,
        });
        Self {
            company,
            periodicity: periodicity.as_str(),
            periods,
            totals,
        }
    }
}

/// Income is credit-normal and expense debit-normal. Cancelled entries are excluded.
fn build_profit_and_loss_query(
    from: NaiveDate,
    to: NaiveDate,
    periodicity: Periodicity,
    company: Option<&str>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT period_start, income, expense, income - expense AS net_profit FROM (\
         SELECT {} AS period_start, \
         COALESCE(SUM(CASE WHEN acc.root_type = 'Income' THEN gle.credit - gle.debit ELSE 0 END), 0)::float8 AS income, \
         COALESCE(SUM(CASE WHEN acc.root_type = 'Expense' THEN gle.debit - gle.credit ELSE 0 END), 0)::float8 AS expense \
         FROM \"tabGL Entry\" gle \
         JOIN \"tabAccount\" acc ON acc.name = gle.account \
         WHERE acc.root_type IN ('Income', 'Expense') AND gle.is_cancelled = 0 \
         AND gle.posting_date BETWEEN ",
        periodicity.bucket_sql()
    ));
    qb.push_bind(from);
    qb.push(" AND ");
    qb.push_bind(to);
    if let Some(company) = company {
        qb.push(" AND gle.company = ");
        qb.push_bind(company.to_string());
    }
    qb.push(" GROUP BY 1) buckets ORDER BY period_start");
    qb
}

impl ErpStore {
    /// Income, expense and net profit per period between `from` and `to` inclusive.
    pub async fn profit_and_loss(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        periodicity: Periodicity,
        company: Option<String>,
    ) -> Result<ProfitAndLoss, StoreError> {
        let periods: Vec<PeriodTotals> =
            build_profit_and_loss_query(from, to, periodicity, company.as_deref())
                .build_query_as()
                .fetch_all(self.pool())
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;

        tracing::debug!(
            company = company.as_deref().unwrap_or("all"),
            periodicity = periodicity.as_str(),
            periods = periods.len(),
            "Computed profit and loss"
        );

        Ok(ProfitAndLoss::from_periods(company, periodicity, periods))
    }
}
