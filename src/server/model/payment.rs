use std::str::FromStr;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use crate::server::model::item::PaymentItem;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) enum PaymentType {
    Cash,
    Maestro,
    CreditCard,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentType::Cash => "Cash",
            PaymentType::Maestro => "Maestro",
            PaymentType::CreditCard => "CreditCard",
        }
    }
}

impl FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(Self::Cash),
            "Maestro" => Ok(Self::Maestro),
            "CreditCard" => Ok(Self::CreditCard),
            s => Err(format!("Invalid payment type: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Payment {
    pub id: i64,
    pub cash_desk_number: i32,
    pub employee_registration_number: i32,
    pub payment_type: PaymentType,
    pub payment_date_time: DateTime<Utc>,
    /// unset while the payment is open
    pub confirmed: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_open(&self) -> bool {
        self.confirmed.is_none()
    }
}

/// A payment as it is handed to the store, before it has an id.
#[derive(Debug, Clone)]
pub(crate) struct NewPayment {
    pub cash_desk_number: i32,
    pub employee_registration_number: i32,
    pub payment_type: PaymentType,
    pub payment_date_time: DateTime<Utc>,
}

/// Body of `POST /api/payments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewPaymentCommand {
    pub cash_desk_id: i32,
    pub employee_id: i32,
    pub payment_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentDetail {
    #[serde(flatten)]
    pub payment: Payment,
    pub items: Vec<PaymentItem>,
}
