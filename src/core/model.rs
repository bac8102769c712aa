//! Analysis record data model.
//!
//! The analyzer's payload is loosely shaped: fields may be absent, `null`, or
//! carry the wrong JSON type. All defaulting happens here, once, while the
//! payload is decoded. Consumers of these types never see a missing amount or
//! a half-decoded section; they see zeros, `None`, and empty collections.
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// Lenient field decoders. Each one accepts any JSON value and falls back to
/// the field's default instead of failing the surrounding struct.
mod lenient {
    use super::*;

    fn as_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(as_f64).unwrap_or(0.0))
    }

    /// Amounts are unsigned magnitudes; direction lives in the transaction type.
    pub fn magnitude<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        number(deserializer).map(f64::abs)
    }

    pub fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(as_f64))
    }

    pub fn count<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value
            .as_ref()
            .and_then(as_f64)
            .filter(|n| *n >= 0.0)
            .map_or(0, |n| n.trunc() as u64))
    }

    /// Integer flag; `true`/`false` are accepted as `1`/`0`.
    pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Bool(flag)) => i64::from(flag),
            Some(other) => as_f64(&other).map_or(0, |n| n.trunc() as i64),
            None => 0,
        })
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    pub fn object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(value @ Value::Object(_)) => serde_json::from_value(value).ok(),
            _ => None,
        })
    }

    pub fn transaction_type<'de, D>(deserializer: D) -> Result<Option<TransactionType>, D::Error>
    where
        D: Deserializer<'de>,
    {
        text(deserializer).map(|t| t.map(TransactionType::from))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementPeriod {
    #[serde(deserialize_with = "lenient::text")]
    pub from: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub to: Option<String>,
}

/// Holder and bank identity. Every field is nullable on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    #[serde(deserialize_with = "lenient::text")]
    pub account_holder: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub account_number: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub bank_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub branch: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub ifsc_code: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub phone: Option<String>,
    #[serde(
        deserialize_with = "lenient::object",
        skip_serializing_if = "Option::is_none"
    )]
    pub statement_period: Option<StatementPeriod>,
}

/// How much of the statement the analyzer parsed with high confidence.
///
/// `high_confidence_txns <= total_transactions` is expected but not enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSummary {
    #[serde(deserialize_with = "lenient::count")]
    pub high_confidence_txns: u64,
    #[serde(deserialize_with = "lenient::number")]
    pub overall_score: f64,
    #[serde(deserialize_with = "lenient::count")]
    pub total_transactions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Credit,
    Debit,
    /// Any other label the analyzer emits. Kept verbatim so it round-trips.
    Other(String),
}

impl From<String> for TransactionType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "CREDIT" => TransactionType::Credit,
            "DEBIT" => TransactionType::Debit,
            _ => TransactionType::Other(label),
        }
    }
}

impl From<TransactionType> for String {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Credit => "CREDIT".to_string(),
            TransactionType::Debit => "DEBIT".to_string(),
            TransactionType::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverDetails {
    #[serde(deserialize_with = "lenient::text")]
    pub account: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub vpa: Option<String>,
}

/// A single statement line. `amount` is always a non-negative magnitude.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    #[serde(deserialize_with = "lenient::text")]
    pub account: Option<String>,
    #[serde(deserialize_with = "lenient::magnitude")]
    pub amount: f64,
    #[serde(deserialize_with = "lenient::number")]
    pub balance: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub bank_peer: Option<String>,
    #[serde(deserialize_with = "lenient::strings")]
    pub category: Vec<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub confidence_score: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub merchant: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub narration: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub payment_gateway: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub payment_method: Option<String>,
    #[serde(deserialize_with = "lenient::object")]
    pub receiver_details: Option<ReceiverDetails>,
    #[serde(deserialize_with = "lenient::strings")]
    pub remarks: Vec<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub transaction_date: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub transaction_reference: Option<String>,
    #[serde(deserialize_with = "lenient::transaction_type")]
    pub transaction_type: Option<TransactionType>,
    #[serde(deserialize_with = "lenient::text")]
    pub upi_id: Option<String>,
    /// Fields this crate does not interpret, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-merchant statistics computed by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantInsight {
    #[serde(deserialize_with = "lenient::number")]
    pub avg_amount: f64,
    #[serde(deserialize_with = "lenient::strings")]
    pub common_days: Vec<String>,
    /// Kept fractional; the analyzer may emit averaged counts.
    #[serde(deserialize_with = "lenient::number")]
    pub count: f64,
    #[serde(deserialize_with = "lenient::text")]
    pub first_seen: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub last_seen: Option<String>,
    #[serde(deserialize_with = "lenient::number")]
    pub median_amount: f64,
    #[serde(deserialize_with = "lenient::optional_number")]
    pub std_amount: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Merchant name to insight, in the order the analyzer sent them.
///
/// Ranking ties are broken by this order, so it must survive decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MerchantInsights(Vec<(String, MerchantInsight)>);

impl MerchantInsights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a merchant. A replaced merchant keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, insight: MerchantInsight) {
        let name = name.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = insight,
            None => self.0.push((name, insight)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MerchantInsight> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, insight)| insight)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MerchantInsight)> {
        self.0.iter().map(|(name, insight)| (name.as_str(), insight))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, MerchantInsight)> for MerchantInsights {
    fn from_iter<I: IntoIterator<Item = (S, MerchantInsight)>>(iter: I) -> Self {
        let mut insights = MerchantInsights::new();
        for (name, insight) in iter {
            insights.insert(name, insight);
        }
        insights
    }
}

impl Serialize for MerchantInsights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, insight) in &self.0 {
            map.serialize_entry(name, insight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MerchantInsights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InsightsVisitor;

        impl<'de> Visitor<'de> for InsightsVisitor {
            type Value = MerchantInsights;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of merchant names to insights")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut insights = MerchantInsights::new();
                while let Some((name, value)) = access.next_entry::<String, Value>()? {
                    let insight = serde_json::from_value(value).unwrap_or_else(|e| {
                        warn!(merchant = %name, error = %e, "Malformed merchant insight, using defaults");
                        MerchantInsight::default()
                    });
                    insights.insert(name, insight);
                }
                Ok(insights)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(MerchantInsights::new())
            }
        }

        deserializer.deserialize_any(InsightsVisitor)
    }
}

/// The structured result of analyzing one uploaded statement.
///
/// Decoding is total: any JSON value yields a record, with malformed sections
/// replaced by their empty defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct AnalysisRecord {
    pub account_info: AccountInfo,
    pub confidence_summary: ConfidenceSummary,
    pub merchant_insights: MerchantInsights,
    pub transactions: Vec<Transaction>,
}

impl AnalysisRecord {
    pub fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            warn!("Analysis result is not an object, using an empty record");
            return Self::default();
        };

        let record = AnalysisRecord {
            account_info: section(&mut fields, "account_info"),
            confidence_summary: section(&mut fields, "confidence_summary"),
            merchant_insights: section(&mut fields, "merchant_insights"),
            transactions: transactions(fields.remove("transactions")),
        };

        let confidence = &record.confidence_summary;
        if confidence.high_confidence_txns > confidence.total_transactions {
            warn!(
                high = confidence.high_confidence_txns,
                total = confidence.total_transactions,
                "High-confidence count exceeds total transactions"
            );
        }
        debug!(
            transactions = record.transactions.len(),
            merchants = record.merchant_insights.len(),
            "Normalized analysis record"
        );
        record
    }
}

impl From<Value> for AnalysisRecord {
    fn from(value: Value) -> Self {
        AnalysisRecord::from_value(value)
    }
}

fn section<T: DeserializeOwned + Default>(fields: &mut Map<String, Value>, name: &str) -> T {
    match fields.remove(name) {
        None | Some(Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(section = name, error = %e, "Malformed section, using defaults");
            T::default()
        }),
    }
}

fn transactions(value: Option<Value>) -> Vec<Transaction> {
    let items = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!(found = %other, "Transactions is not a list, ignoring it");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            if !item.is_object() {
                warn!(index, "Skipping transaction that is not an object");
                return None;
            }
            serde_json::from_value(item)
                .map_err(|e| warn!(index, error = %e, "Skipping undecodable transaction"))
                .ok()
        })
        .collect()
}

/// Response envelope wrapping every analyzer reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResponse {
    #[serde(deserialize_with = "lenient::integer")]
    pub success: i64,
    #[serde(deserialize_with = "lenient::text")]
    pub message: Option<String>,
    #[serde(deserialize_with = "lenient::integer")]
    pub status_code: i64,
    /// Kept raw until classification: on failure it may hold `{ "error": ... }`
    /// instead of an analysis.
    pub result: Option<Value>,
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        self.success == 1
    }
}
