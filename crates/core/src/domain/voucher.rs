use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::RequestId;
use super::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherId(pub String);

impl VoucherId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Voucher approval state, independent of the parent request lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoucherStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Voucher Approved")]
    Approved,
    #[serde(rename = "Voucher Denied")]
    Denied,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Voucher Approved",
            Self::Denied => "Voucher Denied",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Voucher Approved" => Some(Self::Approved),
            "Voucher Denied" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// An expense receipt submitted for reimbursement. The approver is copied from
/// the parent request's admin at creation and gates approve/deny.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub request_id: RequestId,
    pub classification: String,
    pub amount: Decimal,
    pub tax_type: String,
    pub currency: String,
    pub issued_on: NaiveDate,
    pub file_url_pdf: Option<String>,
    pub file_url_xml: Option<String>,
    pub status: VoucherStatus,
    pub approver_id: UserId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoucherDraft {
    pub request_id: RequestId,
    pub classification: String,
    pub amount: Decimal,
    pub tax_type: String,
    pub currency: String,
    pub issued_on: NaiveDate,
    pub file_url_pdf: Option<String>,
    pub file_url_xml: Option<String>,
}

/// Partial update: absent fields keep their current values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoucherPatch {
    pub classification: Option<String>,
    pub amount: Option<Decimal>,
    pub tax_type: Option<String>,
    pub currency: Option<String>,
    pub issued_on: Option<NaiveDate>,
    pub file_url_pdf: Option<String>,
    pub file_url_xml: Option<String>,
}

impl Voucher {
    pub fn apply(&mut self, patch: VoucherPatch) {
        if let Some(classification) = patch.classification {
            self.classification = classification;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(tax_type) = patch.tax_type {
            self.tax_type = tax_type;
        }
        if let Some(currency) = patch.currency {
            self.currency = currency;
        }
        if let Some(issued_on) = patch.issued_on {
            self.issued_on = issued_on;
        }
        if let Some(file_url_pdf) = patch.file_url_pdf {
            self.file_url_pdf = Some(file_url_pdf);
        }
        if let Some(file_url_xml) = patch.file_url_xml {
            self.file_url_xml = Some(file_url_xml);
        }
    }
}
