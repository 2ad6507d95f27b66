//! Batch ingestion contracts (§6): CSV and JSON parsing into `Line`s, with
//! per-row rejection so one malformed row never fails the whole batch.

use std::collections::BTreeMap;

use chrono::Utc;
use payflow_schemas::{Line, LineStatus, Party, PaymentType};
use serde_json::Value;

const REQUIRED_CSV_COLUMNS: [&str; 4] = ["beneficiary", "amount", "purpose", "reference"];

pub struct RowRejection {
    pub row_index: usize,
    pub reason: String,
}

pub struct IngestOutcome {
    pub lines: Vec<Line>,
    pub rejections: Vec<RowRejection>,
}

fn unknown_party(name: &str) -> Party {
    Party { name: name.to_string(), account: "UNKNOWN".to_string(), ifsc: "UNKN0000000".to_string(), bank: "UNKNOWN".to_string() }
}

fn purpose_to_payment_type(code: &str) -> PaymentType {
    match code.to_uppercase().replace([' ', '-'], "_").as_str() {
        "PAYROLL" => PaymentType::Payroll,
        "VENDOR_PAYMENT" => PaymentType::VendorPayment,
        "LOAN_DISBURSEMENT" => PaymentType::LoanDisbursement,
        "UTILITY" => PaymentType::Utility,
        "TAX" => PaymentType::Tax,
        "REFUND" => PaymentType::Refund,
        "TRANSFER" => PaymentType::Transfer,
        _ => PaymentType::Unknown,
    }
}

/// Parse a CSV batch. Header row required; `beneficiary`, `amount`,
/// `purpose`, `reference` must all be present and non-empty per row.
/// Additional columns are preserved verbatim into `additional_fields`.
pub fn parse_csv(batch_id: &str, bytes: &[u8]) -> IngestOutcome {
    let mut rdr = csv::Reader::from_reader(bytes);
    let headers = match rdr.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return IngestOutcome {
                lines: Vec::new(),
                rejections: vec![RowRejection { row_index: 0, reason: format!("missing or malformed header row: {e}") }],
            }
        }
    };

    let missing: Vec<&str> =
        REQUIRED_CSV_COLUMNS.iter().filter(|c| !headers.iter().any(|h| h == **c)).copied().collect();
    if !missing.is_empty() {
        return IngestOutcome {
            lines: Vec::new(),
            rejections: vec![RowRejection { row_index: 0, reason: format!("missing required columns: {}", missing.join(", ")) }],
        };
    }

    let mut lines = Vec::new();
    let mut rejections = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => match csv_row_to_line(batch_id, idx, &headers, &record) {
                Ok(line) => lines.push(line),
                Err(reason) => rejections.push(RowRejection { row_index: idx, reason }),
            },
            Err(e) => rejections.push(RowRejection { row_index: idx, reason: e.to_string() }),
        }
    }

    IngestOutcome { lines, rejections }
}

fn csv_row_to_line(
    batch_id: &str,
    idx: usize,
    headers: &csv::StringRecord,
    record: &csv::StringRecord,
) -> Result<Line, String> {
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for (h, v) in headers.iter().zip(record.iter()) {
        fields.insert(h.to_string(), v.to_string());
    }

    let beneficiary = fields.get("beneficiary").filter(|s| !s.is_empty()).ok_or("missing beneficiary")?.clone();
    let amount_str = fields.get("amount").filter(|s| !s.is_empty()).ok_or("missing amount")?;
    let purpose = fields.get("purpose").filter(|s| !s.is_empty()).ok_or("missing purpose")?.clone();
    let reference = fields.get("reference").filter(|s| !s.is_empty()).ok_or("missing reference")?.clone();

    let amount_rupees: f64 = amount_str.parse().map_err(|_| format!("malformed amount: {amount_str}"))?;

    let additional_fields = fields
        .iter()
        .filter(|(k, _)| !REQUIRED_CSV_COLUMNS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    Ok(Line {
        line_id: format!("{batch_id}-L{}", idx + 1),
        batch_id: batch_id.to_string(),
        transaction_id: reference.clone(),
        payment_type: purpose_to_payment_type(&purpose),
        amount: payflow_schemas::Paise::from_rupees(amount_rupees),
        currency: "INR".to_string(),
        purpose_code: purpose,
        sender: unknown_party("Batch Sender"),
        receiver: unknown_party(&beneficiary),
        schedule_ts: Utc::now(),
        additional_fields,
        status: LineStatus::Pending,
    })
}

/// Parse a JSON batch: either a top-level array, or `{transactions: [...]}`.
pub fn parse_json(batch_id: &str, bytes: &[u8]) -> IngestOutcome {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(e) => {
            return IngestOutcome {
                lines: Vec::new(),
                rejections: vec![RowRejection { row_index: 0, reason: format!("invalid JSON: {e}") }],
            }
        }
    };

    let txns = match value {
        Value::Array(a) => a,
        Value::Object(mut o) => match o.remove("transactions") {
            Some(Value::Array(a)) => a,
            _ => {
                return IngestOutcome {
                    lines: Vec::new(),
                    rejections: vec![RowRejection {
                        row_index: 0,
                        reason: "expected a JSON array or {transactions: [...]}".to_string(),
                    }],
                }
            }
        },
        _ => {
            return IngestOutcome {
                lines: Vec::new(),
                rejections: vec![RowRejection { row_index: 0, reason: "unsupported JSON shape".to_string() }],
            }
        }
    };

    let mut lines = Vec::new();
    let mut rejections = Vec::new();
    for (idx, txn) in txns.into_iter().enumerate() {
        match json_txn_to_line(batch_id, idx, &txn) {
            Ok(line) => lines.push(line),
            Err(reason) => rejections.push(RowRejection { row_index: idx, reason }),
        }
    }
    IngestOutcome { lines, rejections }
}

fn json_txn_to_line(batch_id: &str, idx: usize, txn: &Value) -> Result<Line, String> {
    let obj = txn.as_object().ok_or("transaction must be a JSON object")?;

    let transaction_id =
        obj.get("transactionId").and_then(Value::as_str).ok_or("missing transactionId")?.to_string();
    let amount = obj.get("amount").and_then(Value::as_f64).ok_or("missing or non-numeric amount")?;
    let currency = obj.get("currency").and_then(Value::as_str).unwrap_or("INR").to_string();
    let transaction_type = obj.get("transactionType").and_then(Value::as_str).unwrap_or("TRANSFER");

    let sender = party_from_json(obj.get("remitter").and_then(Value::as_object), "Remitter");
    let receiver = party_from_json(obj.get("beneficiary").and_then(Value::as_object), "Beneficiary");

    let mut additional_fields = BTreeMap::new();
    for key in ["additionalDetails", "response"] {
        if let Some(v) = obj.get(key) {
            additional_fields.insert(key.to_string(), v.clone());
        }
    }

    Ok(Line {
        line_id: format!("{batch_id}-L{}", idx + 1),
        batch_id: batch_id.to_string(),
        transaction_id,
        payment_type: purpose_to_payment_type(transaction_type),
        amount: payflow_schemas::Paise::from_rupees(amount),
        currency,
        purpose_code: transaction_type.to_string(),
        sender,
        receiver,
        schedule_ts: Utc::now(),
        additional_fields,
        status: LineStatus::Pending,
    })
}

fn party_from_json(obj: Option<&serde_json::Map<String, Value>>, default_name: &str) -> Party {
    let Some(obj) = obj else { return unknown_party(default_name) };
    Party {
        name: obj.get("name").and_then(Value::as_str).unwrap_or(default_name).to_string(),
        account: obj
            .get("accountNumber")
            .or_else(|| obj.get("account"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string(),
        ifsc: obj.get("ifsc").and_then(Value::as_str).unwrap_or("UNKN0000000").to_string(),
        bank: obj.get("bank").or_else(|| obj.get("bankName")).and_then(Value::as_str).unwrap_or("UNKNOWN").to_string(),
    }
}
