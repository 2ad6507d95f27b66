//! Seeded mock rail executor. Grounded on
//! `original_source/services/pdr/mock_rail_apis.py`: the per-rail success
//! rates, retry-penalty formula, RTGS working-hours refusal, UTR format, and
//! error-code tables are reproduced from that file so behavior is
//! deterministic under a caller-supplied seed (§4.5).

use chrono::{DateTime, Datelike, Timelike, Utc};
use payflow_schemas::{Line, RailType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq)]
pub enum RailExecutionResult {
    Success { utr: String, actual_eta_ms: u32 },
    Failure { error_code: String, error_message: String },
}

/// Common envelope every rail request carries, mirroring the bank gateway's
/// `SubHeader` block.
#[derive(Clone, Debug, Serialize)]
pub struct SubHeader {
    pub request_uuid: String,
    pub service_request_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DebitAccountInformation {
    pub debit_account_number: String,
    pub debit_account_holder_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreditAccountInformation {
    pub bank_name: String,
    pub credit_account_number: String,
    pub credit_account_holder_name: String,
    pub ifsc_code: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImpsFundsTransferRequestBody {
    pub request_id: String,
    pub remittor_mobile_number: String,
    pub remittor_mmid: String,
    pub remittor_name: String,
    pub remittor_account_number: String,
    pub beneficiary_ifsc: String,
    pub beneficiary_account_no: String,
    pub beneficiary_name: String,
    pub amount: String,
    pub remarks: String,
    pub checksum: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ImpsFundsTransferRequest {
    pub sub_header: SubHeader,
    pub imps_funds_transfer_request_body: ImpsFundsTransferRequestBody,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchPaymentRequestBody {
    pub transaction_amount: String,
    pub source_reference_number: String,
    pub debit_account_information: DebitAccountInformation,
    pub credit_account_information: CreditAccountInformation,
    /// Present for IFT only; `None` for NEFT/RTGS.
    pub remarks: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchPaymentRequest {
    pub sub_header: SubHeader,
    pub request_body: BatchPaymentRequestBody,
}

/// The rail-specific envelope built before a mock execution roll, preserved
/// for audit fidelity even though the mock never round-trips it to a real
/// gateway.
#[derive(Clone, Debug, Serialize)]
pub enum RailRequestPayload {
    Imps(ImpsFundsTransferRequest),
    Neft(BatchPaymentRequest),
    Rtgs(BatchPaymentRequest),
    Ift(BatchPaymentRequest),
    Other,
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Builds the rail-specific request envelope from a line, grounded on
/// `mock_rail_apis.py`'s `_build_{imps,neft,rtgs,ift}_request`.
fn build_rail_request(
    rail_name: &str,
    line: &Line,
    rng: &mut StdRng,
) -> RailRequestPayload {
    let request_uuid = uuid::Uuid::new_v4().to_string();
    match rail_name {
        "IMPS" => RailRequestPayload::Imps(ImpsFundsTransferRequest {
            sub_header: SubHeader {
                request_uuid,
                service_request_id: "DMZ.IMPSFundTransferAPI.POST.001".to_string(),
            },
            imps_funds_transfer_request_body: ImpsFundsTransferRequestBody {
                request_id: line.transaction_id.clone(),
                remittor_mobile_number: "919999999999".to_string(),
                remittor_mmid: "9211222".to_string(),
                remittor_name: line.sender.name.clone(),
                remittor_account_number: line.sender.account.clone(),
                beneficiary_ifsc: line.receiver.ifsc.clone(),
                beneficiary_account_no: line.receiver.account.clone(),
                beneficiary_name: line.receiver.name.clone(),
                amount: format!("{:.2}", line.amount.rupees()),
                remarks: truncate(&line.purpose_code, 50),
                checksum: rng.gen_range(1_000_000_000u64..10_000_000_000u64).to_string(),
            },
        }),
        "NEFT" | "RTGS" => {
            let service_request_id = "NB.GEN.PDT.ELIG".to_string();
            RailRequestPayload::make_neft_or_rtgs(rail_name, line, request_uuid, service_request_id)
        }
        "IFT" => RailRequestPayload::Ift(BatchPaymentRequest {
            sub_header: SubHeader {
                request_uuid,
                service_request_id: "NB.GEN.PDT.ELIG".to_string(),
            },
            request_body: BatchPaymentRequestBody {
                transaction_amount: format!("{:.2}", line.amount.rupees()),
                source_reference_number: line.transaction_id.clone(),
                debit_account_information: DebitAccountInformation {
                    debit_account_number: line.sender.account.clone(),
                    debit_account_holder_name: format!(
                        "TRF/{}/{}",
                        line.transaction_id,
                        truncate(&line.receiver.name, 20)
                    ),
                },
                credit_account_information: CreditAccountInformation {
                    bank_name: line.receiver.bank.clone(),
                    credit_account_number: line.receiver.account.clone(),
                    credit_account_holder_name: format!("TRF FROM {}", truncate(&line.sender.name, 20)),
                    ifsc_code: line.receiver.ifsc.clone(),
                },
                remarks: Some(truncate(&line.purpose_code, 100)),
            },
        }),
        _ => RailRequestPayload::Other,
    }
}

impl RailRequestPayload {
    fn make_neft_or_rtgs(
        rail_name: &str,
        line: &Line,
        request_uuid: String,
        service_request_id: String,
    ) -> Self {
        let body = BatchPaymentRequestBody {
            transaction_amount: format!("{:.2}", line.amount.rupees()),
            source_reference_number: line.transaction_id.clone(),
            debit_account_information: DebitAccountInformation {
                debit_account_number: line.sender.account.clone(),
                debit_account_holder_name: line.sender.name.clone(),
            },
            credit_account_information: CreditAccountInformation {
                bank_name: line.receiver.bank.clone(),
                credit_account_number: line.receiver.account.clone(),
                credit_account_holder_name: line.receiver.name.clone(),
                ifsc_code: line.receiver.ifsc.clone(),
            },
            remarks: None,
        };
        let request = BatchPaymentRequest {
            sub_header: SubHeader {
                request_uuid,
                service_request_id,
            },
            request_body: body,
        };
        if rail_name == "RTGS" {
            RailRequestPayload::Rtgs(request)
        } else {
            RailRequestPayload::Neft(request)
        }
    }
}

/// Base success probability per rail, before retry/amount penalties.
fn base_success_rate(rail_name: &str) -> f64 {
    match rail_name {
        "IMPS" => 0.96,
        "NEFT" => 0.94,
        "RTGS" => 0.99,
        "IFT" => 0.99,
        "UPI" => 0.98,
        _ => 0.90,
    }
}

fn error_codes(rail_name: &str) -> &'static [(&'static str, &'static str)] {
    match rail_name {
        "IMPS" => &[
            ("IMPS_TIMEOUT", "Beneficiary bank did not respond in time"),
            ("IMPS_INVALID_MMID", "Invalid MMID/account combination"),
            ("IMPS_DAILY_LIMIT", "Beneficiary bank daily IMPS limit reached"),
        ],
        "NEFT" => &[
            ("NEFT_BATCH_REJECT", "Rejected by NEFT settlement batch"),
            ("NEFT_ACCOUNT_FROZEN", "Beneficiary account frozen"),
        ],
        "RTGS" => &[
            ("RTGS_BELOW_MINIMUM", "Amount below RTGS floor"),
            ("RTGS_IFSC_NOT_FOUND", "IFSC not enabled for RTGS"),
        ],
        "IFT" => &[("IFT_ACCOUNT_CLOSED", "Destination account closed")],
        "UPI" => &[
            ("UPI_VPA_INVALID", "VPA could not be resolved"),
            ("UPI_PSP_DOWN", "Beneficiary PSP unreachable"),
        ],
        _ => &[("RAIL_ERROR", "Unspecified rail failure")],
    }
}

/// Per-line, per-attempt mock execution. Deterministic for a given
/// `(seed, rail_name, line_id, attempt_no)` tuple.
pub struct MockRailExecutor {
    rng: StdRng,
}

impl MockRailExecutor {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn execute_rail(
        &mut self,
        rail_name: &str,
        rail_type: RailType,
        line: &Line,
        attempt_no: u32,
        now: DateTime<Utc>,
    ) -> RailExecutionResult {
        if rail_name == "RTGS" && !rtgs_working_hours(now) {
            return RailExecutionResult::Failure {
                error_code: "OUTSIDE_WORKING_HOURS".to_string(),
                error_message: "RTGS settlement window is Mon-Fri 09:00-16:30 IST".to_string(),
            };
        }

        if rail_type == RailType::Intrabank
            && line.sender.ifsc_prefix() != line.receiver.ifsc_prefix()
        {
            return RailExecutionResult::Failure {
                error_code: "INTRABANK_MISMATCH".to_string(),
                error_message: "Sender and receiver are not at the same bank".to_string(),
            };
        }

        let request = build_rail_request(rail_name, line, &mut self.rng);
        tracing::debug!(
            rail_name,
            line_id = %line.line_id,
            request = ?request,
            "mock_rail/request_built"
        );

        let mut rate = base_success_rate(rail_name);
        // Retry penalty: each attempt beyond the first subtracts 0.1,
        // floored so the rail never becomes guaranteed-fail.
        if attempt_no > 1 {
            rate = (rate - (attempt_no as f64 - 1.0) * 0.1).max(0.1);
        }
        // Large-amount multiplicative penalty above the 10-lakh threshold.
        if line.amount.rupees() > 1_000_000.0 {
            rate *= 0.9;
        }

        let roll: f64 = self.rng.gen();
        if roll < rate {
            let utr = self.generate_utr(rail_name, now);
            let eta_jitter: i64 = self.rng.gen_range(-10..=10);
            let actual_eta_ms = (base_eta_ms(rail_name) as i64 + eta_jitter * 1000).max(500) as u32;
            RailExecutionResult::Success { utr, actual_eta_ms }
        } else {
            let codes = error_codes(rail_name);
            let idx = self.rng.gen_range(0..codes.len());
            let (code, message) = codes[idx];
            RailExecutionResult::Failure {
                error_code: code.to_string(),
                error_message: message.to_string(),
            }
        }
    }

    /// `{RAIL}{yymmdd}{6-digit}`.
    fn generate_utr(&mut self, rail_name: &str, now: DateTime<Utc>) -> String {
        let suffix: u32 = self.rng.gen_range(0..1_000_000);
        format!(
            "{}{:02}{:02}{:02}{:06}",
            rail_name,
            now.year() % 100,
            now.month(),
            now.day(),
            suffix
        )
    }
}

impl crate::cascade::RailExecutor for MockRailExecutor {
    fn execute(
        &mut self,
        rail: &payflow_schemas::RailConfig,
        line: &Line,
        attempt_no: u32,
        now: DateTime<Utc>,
    ) -> RailExecutionResult {
        self.execute_rail(&rail.rail_name, rail.rail_type, line, attempt_no, now)
    }
}

fn base_eta_ms(rail_name: &str) -> u32 {
    match rail_name {
        "UPI" => 3_000,
        "IMPS" => 8_000,
        "IFT" => 2_000,
        "NEFT" => 1_800_000,
        "RTGS" => 600_000,
        _ => 60_000,
    }
}

/// RTGS settles Mon-Fri 09:00-16:30 inclusive.
fn rtgs_working_hours(now: DateTime<Utc>) -> bool {
    use chrono::Weekday::*;
    let weekday = now.date_naive().weekday();
    if !matches!(weekday, Mon | Tue | Wed | Thu | Fri) {
        return false;
    }
    let t = now.time();
    let start = chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap();
    let end = chrono::NaiveTime::from_hms_opt(16, 30, 0).unwrap();
    t >= start && t <= end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use payflow_schemas::{Paise, PaymentType, Party};

    fn line(amount: f64) -> Line {
        Line {
            line_id: "L1".to_string(),
            batch_id: "B1".to_string(),
            transaction_id: "T1".to_string(),
            payment_type: PaymentType::VendorPayment,
            amount: Paise::from_rupees(amount),
            currency: "INR".to_string(),
            purpose_code: "VENDOR_PAYMENT".to_string(),
            sender: Party {
                name: "A".to_string(),
                account: "1".to_string(),
                ifsc: "HDFC0000001".to_string(),
                bank: "HDFC".to_string(),
            },
            receiver: Party {
                name: "B".to_string(),
                account: "2".to_string(),
                ifsc: "ICIC0000099".to_string(),
                bank: "ICICI".to_string(),
            },
            schedule_ts: Utc::now(),
            additional_fields: Default::default(),
            status: payflow_schemas::LineStatus::Pending,
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let mut a = MockRailExecutor::new(42);
        let mut b = MockRailExecutor::new(42);
        let ra = a.execute_rail("IMPS", RailType::Instant, &line(1000.0), 1, now);
        let rb = b.execute_rail("IMPS", RailType::Instant, &line(1000.0), 1, now);
        assert_eq!(ra, rb);
    }

    #[test]
    fn rtgs_outside_working_hours_is_refused() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 16, 30, 1).unwrap();
        let mut exec = MockRailExecutor::new(1);
        let result = exec.execute_rail("RTGS", RailType::Realtime, &line(600_000.0), 1, now);
        assert!(matches!(
            result,
            RailExecutionResult::Failure { ref error_code, .. } if error_code == "OUTSIDE_WORKING_HOURS"
        ));
    }

    #[test]
    fn rtgs_at_exact_boundary_is_admitted() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 16, 30, 0).unwrap();
        assert!(rtgs_working_hours(now));
        let now_after = Utc.with_ymd_and_hms(2026, 8, 3, 16, 30, 1).unwrap();
        assert!(!rtgs_working_hours(now_after));
    }

    #[test]
    fn intrabank_mismatch_is_rejected() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let mut exec = MockRailExecutor::new(1);
        let result = exec.execute_rail("IFT", RailType::Intrabank, &line(1000.0), 1, now);
        assert!(matches!(
            result,
            RailExecutionResult::Failure { ref error_code, .. } if error_code == "INTRABANK_MISMATCH"
        ));
    }

    #[test]
    fn utr_matches_expected_format() {
        let now = Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap();
        let mut exec = MockRailExecutor::new(7);
        for _ in 0..20 {
            if let RailExecutionResult::Success { utr, .. } =
                exec.execute_rail("UPI", RailType::Instant, &line(500.0), 1, now)
            {
                assert!(utr.starts_with("UPI260803"));
                assert_eq!(utr.len(), "UPI".len() + 6 + 6);
                return;
            }
        }
        panic!("expected at least one success in 20 attempts at 0.98 base rate");
    }
}
