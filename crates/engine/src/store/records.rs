use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder, Row};

use super::{column_ref, table_name, ErpStore, StoreError};

/// One condition on a record query. All conditions are ANDed.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordFilter {
    Equals { column: &'static str, value: String },
    /// Case-insensitive substring match.
    Contains { column: &'static str, needle: String },
    /// Inclusive date range.
    Between {
        column: &'static str,
        from: NaiveDate,
        to: NaiveDate,
    },
    Positive { column: &'static str },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A filtered, sorted, paginated read of one doctype's table.
///
/// Column names are trusted; callers pass only names from their own
/// whitelists. Values are always bound.
#[derive(Clone, Debug)]
pub struct RecordQuery {
    pub doctype: &'static str,
    /// Columns to return. `None` returns the whole row.
    pub columns: Option<&'static [&'static str]>,
    pub filters: Vec<RecordFilter>,
    pub order_by: &'static str,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl RecordQuery {
    /// Whole records, newest modification first.
    pub fn new(doctype: &'static str) -> Self {
        Self {
            doctype,
            columns: None,
            filters: Vec::new(),
            order_by: "modified",
            order: SortOrder::Desc,
            limit: None,
            offset: None,
        }
    }
}

/// A page of records plus the number of rows matching the filters.
#[derive(Clone, Debug, Default)]
pub struct RecordPage {
    pub records: Vec<Value>,
    pub total_count: i64,
}

/// `SELECT` for one page. Rows come back as a single JSON column named `record`.
///
/// Postgres does the serialization: dates become ISO-8601 strings, numerics
/// become JSON numbers and intervals become duration strings.
pub fn build_record_query(query: &RecordQuery) -> QueryBuilder<'static, Postgres> {
    let projection = match query.columns {
        None => "to_jsonb(t)".to_string(),
        Some(columns) => {
            let pairs: Vec<String> = columns
                .iter()
                .map(|c| format!("'{}', {}", c, column_ref(c)))
                .collect();
            format!("jsonb_build_object({})", pairs.join(", "))
        }
    };

    let mut qb = QueryBuilder::new(format!(
        "SELECT {} AS record FROM {} t WHERE 1 = 1",
        projection,
        table_name(query.doctype)
    ));
    push_filters(&mut qb, &query.filters);

    qb.push(format!(
        " ORDER BY {} {}",
        column_ref(query.order_by),
        query.order.as_sql()
    ));
    if let Some(limit) = query.limit {
        qb.push(" LIMIT ");
        qb.push_bind(i64::from(limit));
    }
    if let Some(offset) = query.offset {
        qb.push(" OFFSET ");
        qb.push_bind(i64::from(offset));
    }
    qb
}

/// `SELECT count(*)` over the same filters, ignoring pagination.
pub fn build_count_query(query: &RecordQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT count(*) AS total_count FROM {} t WHERE 1 = 1",
        table_name(query.doctype)
    ));
    push_filters(&mut qb, &query.filters);
    qb
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filters: &[RecordFilter]) {
    for filter in filters {
        match filter {
            RecordFilter::Equals { column, value } => {
                qb.push(format!(" AND {} = ", column_ref(column)));
                qb.push_bind(value.clone());
            }
            RecordFilter::Contains { column, needle } => {
                qb.push(format!(" AND {} ILIKE ", column_ref(column)));
                qb.push_bind(format!("%{}%", escape_like(needle)));
            }
            RecordFilter::Between { column, from, to } => {
                qb.push(format!(" AND {} BETWEEN ", column_ref(column)));
                qb.push_bind(*from);
                qb.push(" AND ");
                qb.push_bind(*to);
            }
            RecordFilter::Positive { column } => {
                qb.push(format!(" AND {} > 0", column_ref(column)));
            }
        }
    }
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl ErpStore {
    /// Run a record query, returning the page and the total match count.
    pub async fn fetch_records(&self, query: &RecordQuery) -> Result<RecordPage, StoreError> {
        let total_count: i64 = build_count_query(query)
            .build()
            .fetch_one(self.pool())
            .await
            .and_then(|row| row.try_get("total_count"))
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let rows = build_record_query(query)
            .build()
            .fetch_all(self.pool())
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let records = rows
            .iter()
            .map(|row| row.try_get::<Value, _>("record"))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))?;

        tracing::debug!(
            doctype = query.doctype,
            returned = records.len(),
            total_count,
            "Fetched records"
        );

        Ok(RecordPage {
            records,
            total_count,
        })
    }

    /// Fetch one whole record by its `name` primary key.
    pub async fn fetch_record(&self, doctype: &'static str, name: &str) -> Result<Value, StoreError> {
        let sql = format!(
            "SELECT to_jsonb(t) AS record FROM {} t WHERE t.\"name\" = $1",
            table_name(doctype)
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", doctype, name)))?;

        row.try_get("record")
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}
