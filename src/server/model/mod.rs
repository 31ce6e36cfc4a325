use chrono::NaiveDate;
use serde::Deserialize;

pub(crate) mod cash_desk;
pub(crate) mod config;
pub(crate) mod employee;
pub(crate) mod item;
pub(crate) mod payment;

/// Query string of `GET /api/payments`, also used as the store-level filter.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentFilter {
    pub cash_desk: Option<i32>,
    pub date_from: Option<NaiveDate>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &payment::Payment) -> bool {
        let desk_ok = self
            .cash_desk
            .map_or(true, |number| payment.cash_desk_number == number);
        let date_ok = self
            .date_from
            .map_or(true, |from| payment.payment_date_time.date_naive() >= from);
        desk_ok && date_ok
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeletePaymentParams {
    #[serde(default)]
    pub delete_items: bool,
}
