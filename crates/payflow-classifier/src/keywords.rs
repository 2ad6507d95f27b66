use payflow_schemas::PaymentType;

/// Curated purpose-keyword map, in declaration order (fuzzy-match ties
/// resolve by first-declared keyword order per the spec). Adapted from the
/// reference intent manager's mapping table, narrowed to the canonical
/// intent set this system defines.
pub const KEYWORDS: &[(&str, PaymentType)] = &[
    ("SALARY", PaymentType::Payroll),
    ("PAYROLL", PaymentType::Payroll),
    ("WAGES", PaymentType::Payroll),
    ("STAFF_SALARY", PaymentType::Payroll),
    ("EMPLOYEE_PAYMENT", PaymentType::Payroll),
    ("VENDOR_PAYMENT", PaymentType::VendorPayment),
    ("SUPPLIER_PAYMENT", PaymentType::VendorPayment),
    ("SUPPLIER", PaymentType::VendorPayment),
    ("VENDOR", PaymentType::VendorPayment),
    ("CONTRACTOR", PaymentType::VendorPayment),
    ("SERVICES", PaymentType::VendorPayment),
    ("GOODS", PaymentType::VendorPayment),
    ("LOAN_DISBURSEMENT", PaymentType::LoanDisbursement),
    ("LOAN_DISB", PaymentType::LoanDisbursement),
    ("DISBURSEMENT", PaymentType::LoanDisbursement),
    ("UTILITY", PaymentType::Utility),
    ("UTILITY_BILL", PaymentType::Utility),
    ("ELECTRICITY", PaymentType::Utility),
    ("WATER_BILL", PaymentType::Utility),
    ("TAX", PaymentType::Tax),
    ("GST", PaymentType::Tax),
    ("TDS", PaymentType::Tax),
    ("INCOME_TAX", PaymentType::Tax),
    ("REFUND", PaymentType::Refund),
    ("REVERSAL", PaymentType::Refund),
    ("CHARGEBACK", PaymentType::Refund),
    ("TRANSFER", PaymentType::Transfer),
    ("FUND_TRANSFER", PaymentType::Transfer),
    ("P2P", PaymentType::Transfer),
];
