//! Payment lifecycle: `Open --confirm--> Confirmed`, `Open | Confirmed --delete--> Deleted`.
//!
//! Each public operation runs its checks and writes inside a single store
//! transaction. A rule violation rolls the transaction back, so nothing of a
//! failed operation is ever persisted.

use log::{error, info, warn};
use crate::server::database::store::{NewItem, PaymentStore, StoreError, StoreTransaction};
use crate::server::model::item::{NewPaymentItemCommand, PaymentItem};
use crate::server::model::payment::{NewPayment, NewPaymentCommand, Payment, PaymentDetail, PaymentType};
use crate::server::model::PaymentFilter;
use crate::server::service::error::PaymentServiceError;
use crate::server::util::time::helper::get_utc_now;

/// What `delete_payment` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeleteOutcome {
    Deleted,
    /// there was no such payment, nothing changed
    Absent,
}

pub(crate) struct PaymentService<S: PaymentStore> {
    store: S,
}

async fn finish<T, R>(tx: T, result: Result<R, PaymentServiceError>) -> Result<R, PaymentServiceError>
where
    T: StoreTransaction,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!("rollback failed after '{}', {}", e, rollback_err);
            }
            Err(e)
        }
    }
}

impl<S: PaymentStore> PaymentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = tx.list_payments(filter).await.map_err(PaymentServiceError::from);
        finish(tx, result).await
    }

    pub async fn get_payment(&self, id: i64) -> Result<Option<PaymentDetail>, PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = Self::load_detail(&mut tx, id).await;
        finish(tx, result).await
    }

    async fn load_detail(tx: &mut S::Tx, id: i64) -> Result<Option<PaymentDetail>, PaymentServiceError> {
        let Some(payment) = tx.find_payment(id).await? else {
            return Ok(None);
        };
        let items = tx.find_items(id).await?;
        Ok(Some(PaymentDetail { payment, items }))
    }

    /// Open a new payment on a cash desk.
    pub async fn create_payment(&self, cmd: &NewPaymentCommand) -> Result<Payment, PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = Self::create_in(&mut tx, cmd).await;
        let payment = finish(tx, result).await.inspect_err(|e| {
            warn!("create payment on cash desk {} rejected, {}", cmd.cash_desk_id, e);
        })?;
        info!("payment {} opened on cash desk {}", payment.id, payment.cash_desk_number);
        Ok(payment)
    }

    async fn create_in(tx: &mut S::Tx, cmd: &NewPaymentCommand) -> Result<Payment, PaymentServiceError> {
        let cash_desk = tx
            .lock_cash_desk(cmd.cash_desk_id)
            .await?
            .ok_or(PaymentServiceError::InvalidCashDesk)?;
        let employee = tx
            .find_employee(cmd.employee_id)
            .await?
            .ok_or(PaymentServiceError::InvalidEmployee)?;
        let payment_type: PaymentType = cmd
            .payment_type
            .parse()
            .map_err(|_| PaymentServiceError::InvalidPaymentType)?;

        if tx.has_open_payment(cash_desk.number).await? {
            return Err(PaymentServiceError::OpenPaymentForCashDesk);
        }
        if payment_type == PaymentType::CreditCard && !employee.role.can_authorize_credit_card() {
            return Err(PaymentServiceError::InsufficientRights);
        }

        let new_payment = NewPayment {
            cash_desk_number: cash_desk.number,
            employee_registration_number: employee.registration_number,
            payment_type,
            payment_date_time: get_utc_now(),
        };
        tx.insert_payment(new_payment).await.map_err(|e| match e {
            // lost a race against another open payment on the same desk
            StoreError::Conflict => PaymentServiceError::OpenPaymentForCashDesk,
            e => e.into(),
        })
    }

    /// Close an open payment. Confirmed payments are immutable.
    pub async fn confirm_payment(&self, id: i64) -> Result<(), PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = Self::confirm_in(&mut tx, id).await;
        finish(tx, result).await.inspect_err(|e| {
            warn!("confirm payment {} rejected, {}", id, e);
        })?;
        info!("payment {} confirmed", id);
        Ok(())
    }

    async fn confirm_in(tx: &mut S::Tx, id: i64) -> Result<(), PaymentServiceError> {
        Self::lock_open_payment(tx, id).await?;
        tx.set_confirmed(id, get_utc_now()).await?;
        Ok(())
    }

    async fn lock_open_payment(tx: &mut S::Tx, id: i64) -> Result<Payment, PaymentServiceError> {
        let payment = tx
            .lock_payment(id)
            .await?
            .ok_or(PaymentServiceError::PaymentNotFound)?;
        if !payment.is_open() {
            return Err(PaymentServiceError::AlreadyConfirmed);
        }
        Ok(payment)
    }

    pub async fn add_payment_item(&self, cmd: &NewPaymentItemCommand) -> Result<PaymentItem, PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = Self::add_item_in(&mut tx, cmd).await;
        let item = finish(tx, result).await.inspect_err(|e| {
            warn!("add item to payment {} rejected, {}", cmd.payment_id, e);
        })?;
        info!("item {} added to payment {}", item.id, item.payment_id);
        Ok(item)
    }

    async fn add_item_in(tx: &mut S::Tx, cmd: &NewPaymentItemCommand) -> Result<PaymentItem, PaymentServiceError> {
        let payment = Self::lock_open_payment(tx, cmd.payment_id).await?;
        if !cmd.has_valid_price() {
            return Err(PaymentServiceError::InvalidPrice);
        }
        let item = tx
            .insert_item(NewItem {
                payment_id: payment.id,
                article_name: &cmd.article_name,
                amount: cmd.amount,
                price: cmd.price,
            })
            .await?;
        Ok(item)
    }

    /// Remove a payment. Items are only removed along with it when
    /// `delete_items` is set; a missing payment is not an error.
    pub async fn delete_payment(&self, id: i64, delete_items: bool) -> Result<DeleteOutcome, PaymentServiceError> {
        let mut tx = self.store.begin().await?;
        let result = Self::delete_in(&mut tx, id, delete_items).await;
        let outcome = finish(tx, result).await.inspect_err(|e| {
            warn!("delete payment {} rejected, {}", id, e);
        })?;
        if outcome == DeleteOutcome::Deleted {
            info!("payment {} deleted", id);
        }
        Ok(outcome)
    }

    async fn delete_in(tx: &mut S::Tx, id: i64, delete_items: bool) -> Result<DeleteOutcome, PaymentServiceError> {
        if tx.lock_payment(id).await?.is_none() {
            return Ok(DeleteOutcome::Absent);
        }
        let items = tx.find_items(id).await?;
        if !items.is_empty() {
            if !delete_items {
                return Err(PaymentServiceError::PaymentHasItems);
            }
            tx.delete_items(id).await?;
        }
        tx.delete_payment(id).await?;
        Ok(DeleteOutcome::Deleted)
    }
}
