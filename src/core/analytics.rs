//! Derives chart-ready and table-ready views from an analysis record.
//!
//! Every function here is pure and total. Missing or malformed data degrades
//! to zeros and empty collections rather than errors; an empty view is for the
//! renderer to present as "no data".
use crate::core::model::{AnalysisRecord, MerchantInsights, Transaction, TransactionType};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Number of merchants shown individually before the rest are grouped.
pub const TOP_MERCHANTS: usize = 5;
pub const MERCHANT_LABEL_CHARS: usize = 15;
pub const OTHERS_LABEL: &str = "Others";
pub const DEFAULT_PAYMENT_METHOD: &str = "OTH";
const NOT_AVAILABLE: &str = "N/A";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];
// Numeric dashed dates are month first, as browsers read them.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%b %d %Y",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalancePoint {
    pub date: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CashFlowSummary {
    pub income: f64,
    pub expense: f64,
}

impl CashFlowSummary {
    pub fn net(&self) -> f64 {
        self.income - self.expense
    }
}

/// One slice of the merchant-volume ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantSlice {
    /// Display label, shortened to [`MERCHANT_LABEL_CHARS`].
    pub label: String,
    pub full_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Credit,
    /// Debits, and anything not explicitly a credit.
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayTransaction {
    pub date: String,
    pub narration: Option<String>,
    pub receiver: Option<String>,
    pub method: String,
    pub amount: f64,
    pub balance: f64,
    pub direction: Direction,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountOverview {
    pub bank_name: String,
    pub ifsc_code: String,
    pub account_number: String,
    pub branch: String,
    pub account_holder: String,
    pub period: String,
    /// Overall parse confidence as a percentage.
    pub confidence_pct: f64,
    pub high_confidence_txns: u64,
    pub total_transactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantCard {
    pub name: String,
    pub count: f64,
    pub avg_amount: f64,
    pub last_seen: String,
}

/// Every view derived from one record, computed in a single pass for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub overview: AccountOverview,
    pub balance_history: Vec<BalancePoint>,
    pub cash_flow: CashFlowSummary,
    pub merchant_ranking: Vec<MerchantSlice>,
    pub merchant_cards: Vec<MerchantCard>,
    pub transactions: Vec<DisplayTransaction>,
}

impl Dashboard {
    pub fn from_record(record: &AnalysisRecord) -> Self {
        Dashboard {
            overview: account_overview(record),
            balance_history: balance_history(&record.transactions),
            cash_flow: cash_flow_summary(&record.transactions),
            merchant_ranking: merchant_ranking(&record.merchant_insights),
            merchant_cards: merchant_cards(&record.merchant_insights),
            transactions: transaction_view(&record.transactions),
        }
    }
}

/// Parses the free-form dates the analyzer emits into epoch milliseconds.
/// Dates without a zone are read as UTC.
pub fn parse_timestamp(date: &str) -> Option<i64> {
    let date = date.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(date) {
        return Some(dt.timestamp_millis());
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(date, fmt).ok())
    {
        return Some(dt.and_utc().timestamp_millis());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn sort_key(transaction: &Transaction) -> i64 {
    transaction
        .transaction_date
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(0)
}

/// Transactions in ascending date order. The sort is stable, and a date that
/// cannot be parsed sorts as the epoch instead of being dropped.
pub fn chronological(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut ordered: Vec<&Transaction> = transactions.iter().collect();
    ordered.sort_by_key(|t| sort_key(t));
    ordered
}

pub fn balance_history(transactions: &[Transaction]) -> Vec<BalancePoint> {
    chronological(transactions)
        .into_iter()
        .map(|t| BalancePoint {
            date: t.transaction_date.clone().unwrap_or_default(),
            balance: t.balance,
        })
        .collect()
}

/// Sums credits into income and debits into expense. Other types count toward neither.
pub fn cash_flow_summary(transactions: &[Transaction]) -> CashFlowSummary {
    transactions
        .iter()
        .fold(CashFlowSummary::default(), |mut summary, t| {
            match t.transaction_type {
                Some(TransactionType::Credit) => summary.income += t.amount,
                Some(TransactionType::Debit) => summary.expense += t.amount,
                _ => {}
            }
            summary
        })
}

fn shorten_label(name: &str) -> String {
    if name.chars().count() > MERCHANT_LABEL_CHARS {
        let head: String = name.chars().take(MERCHANT_LABEL_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Ranks merchants by volume (`count * avg_amount`), largest first.
///
/// Merchants with no positive volume are left out. Equal volumes keep the
/// order the analyzer listed them in. Only the top [`TOP_MERCHANTS`] are kept;
/// the rest are summed into a trailing [`OTHERS_LABEL`] slice when that sum is
/// positive.
pub fn merchant_ranking(insights: &MerchantInsights) -> Vec<MerchantSlice> {
    let mut slices: Vec<MerchantSlice> = insights
        .iter()
        .map(|(name, insight)| MerchantSlice {
            label: shorten_label(name),
            full_name: name.to_string(),
            value: insight.count * insight.avg_amount,
        })
        .filter(|slice| slice.value > 0.0)
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));

    let others: f64 = slices.iter().skip(TOP_MERCHANTS).map(|s| s.value).sum();
    slices.truncate(TOP_MERCHANTS);
    if others > 0.0 {
        slices.push(MerchantSlice {
            label: OTHERS_LABEL.to_string(),
            full_name: OTHERS_LABEL.to_string(),
            value: others,
        });
    }
    slices
}

pub fn merchant_cards(insights: &MerchantInsights) -> Vec<MerchantCard> {
    insights
        .iter()
        .map(|(name, insight)| MerchantCard {
            name: name.to_string(),
            count: insight.count,
            avg_amount: insight.avg_amount,
            last_seen: non_empty(insight.last_seen.as_deref())
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn text_or(value: &Option<String>, default: &str) -> String {
    non_empty(value.as_deref()).unwrap_or(default).to_string()
}

/// Table rows in the order received, with display defaults filled in.
pub fn transaction_view(transactions: &[Transaction]) -> Vec<DisplayTransaction> {
    transactions
        .iter()
        .map(|t| DisplayTransaction {
            date: t.transaction_date.clone().unwrap_or_default(),
            narration: non_empty(t.narration.as_deref()).map(str::to_string),
            receiver: non_empty(
                t.receiver_details
                    .as_ref()
                    .and_then(|r| r.name.as_deref()),
            )
            .map(str::to_string),
            method: non_empty(t.payment_method.as_deref())
                .unwrap_or(DEFAULT_PAYMENT_METHOD)
                .to_string(),
            amount: t.amount,
            balance: t.balance,
            direction: match t.transaction_type {
                Some(TransactionType::Credit) => Direction::Credit,
                _ => Direction::Debit,
            },
            reference: t.transaction_reference.clone(),
        })
        .collect()
}

pub fn account_overview(record: &AnalysisRecord) -> AccountOverview {
    let info = &record.account_info;
    let period = info.statement_period.clone().unwrap_or_default();
    let confidence = &record.confidence_summary;

    AccountOverview {
        bank_name: text_or(&info.bank_name, "Unknown Bank"),
        ifsc_code: text_or(&info.ifsc_code, "NO IFSC"),
        account_number: text_or(&info.account_number, NOT_AVAILABLE),
        branch: text_or(&info.branch, NOT_AVAILABLE),
        account_holder: text_or(&info.account_holder, "Unknown"),
        period: format!(
            "{} - {}",
            text_or(&period.from, NOT_AVAILABLE),
            text_or(&period.to, NOT_AVAILABLE)
        ),
        confidence_pct: confidence.overall_score * 100.0,
        high_confidence_txns: confidence.high_confidence_txns,
        total_transactions: confidence.total_transactions,
    }
}
