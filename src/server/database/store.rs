//! Persistence seam of the payment service.
//!
//! Every service operation opens one [`StoreTransaction`] through
//! [`PaymentStore::begin`], runs its rule checks and writes through it and
//! finishes with `commit` or `rollback`.

use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use tokio_postgres::error::SqlState;
use crate::server::model::cash_desk::CashDesk;
use crate::server::model::employee::Employee;
use crate::server::model::item::PaymentItem;
use crate::server::model::payment::{NewPayment, Payment};
use crate::server::model::PaymentFilter;

#[derive(Debug, Display, Error)]
pub(crate) enum StoreError {
    #[display("server is busy")]
    Busy,
    /// a statement ran longer than the configured limit
    #[display("statement timed out")]
    Timeout,
    /// a write hit a uniqueness constraint
    #[display("conflicting write")]
    Conflict,
    #[display("corrupt record: {_0}")]
    Corrupt(#[error(not(source))] String),
    #[display("database error: {_0}")]
    Db(tokio_postgres::Error),
}

impl From<tokio_postgres::Error> for StoreError {
    fn from(e: tokio_postgres::Error) -> Self {
        match e.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => StoreError::Conflict,
            Some(code) if *code == SqlState::QUERY_CANCELED => StoreError::Timeout,
            _ => StoreError::Db(e),
        }
    }
}

pub(crate) trait PaymentStore: Send + Sync + 'static {
    type Tx: StoreTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

pub(crate) struct NewItem<'a> {
    pub payment_id: i64,
    pub article_name: &'a str,
    pub amount: i32,
    pub price: rust_decimal::Decimal,
}

pub(crate) trait StoreTransaction: Sized {
    /// Look up a cash desk and hold it until the transaction ends, so that
    /// payments for the desk are created one at a time.
    async fn lock_cash_desk(&mut self, number: i32) -> Result<Option<CashDesk>, StoreError>;

    async fn find_employee(&mut self, registration_number: i32) -> Result<Option<Employee>, StoreError>;

    async fn has_open_payment(&mut self, cash_desk_number: i32) -> Result<bool, StoreError>;

    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>, StoreError>;

    /// Like `find_payment`, but the row stays locked until the transaction ends.
    async fn lock_payment(&mut self, id: i64) -> Result<Option<Payment>, StoreError> {
        self.find_payment(id).await
    }

    async fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError>;

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn set_confirmed(&mut self, id: i64, confirmed: DateTime<Utc>) -> Result<(), StoreError>;

    async fn find_items(&mut self, payment_id: i64) -> Result<Vec<PaymentItem>, StoreError>;

    async fn insert_item(&mut self, item: NewItem<'_>) -> Result<PaymentItem, StoreError>;

    /// Returns the number of removed items.
    async fn delete_items(&mut self, payment_id: i64) -> Result<u64, StoreError>;

    async fn delete_payment(&mut self, id: i64) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
