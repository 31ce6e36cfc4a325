use std::collections::BTreeMap;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use crate::server::database::store::{NewItem, PaymentStore, StoreError, StoreTransaction};
use crate::server::model::cash_desk::CashDesk;
use crate::server::model::employee::{Employee, Role};
use crate::server::model::item::PaymentItem;
use crate::server::model::payment::{NewPayment, Payment};
use crate::server::model::PaymentFilter;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    cash_desks: BTreeMap<i32, CashDesk>,
    employees: BTreeMap<i32, Employee>,
    payments: BTreeMap<i64, Payment>,
    items: BTreeMap<i64, PaymentItem>,
    last_payment_id: i64,
    last_item_id: i64,
}

/// In-process store. A transaction owns the store lock for its whole
/// lifetime. Reads go straight to the shared state; the first write makes a
/// working copy that replaces the shared state on commit.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new(
        cash_desks: impl IntoIterator<Item = CashDesk>,
        employees: impl IntoIterator<Item = Employee>,
    ) -> Self {
        let state = MemoryState {
            cash_desks: cash_desks.into_iter().map(|d| (d.number, d)).collect(),
            employees: employees
                .into_iter()
                .map(|e| (e.registration_number, e))
                .collect(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Same master data as the `V2__seed.sql` migration.
    pub fn seeded() -> Self {
        Self::new(
            (1..=3).map(|number| CashDesk { number }),
            [
                Employee {
                    registration_number: 1001,
                    first_name: "Max".to_string(),
                    last_name: "Mustermann".to_string(),
                    role: Role::Manager,
                },
                Employee {
                    registration_number: 1002,
                    first_name: "Erika".to_string(),
                    last_name: "Musterfrau".to_string(),
                    role: Role::Cashier,
                },
            ],
        )
    }
}

impl PaymentStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(MemoryTransaction { guard, working: None })
    }
}

pub(crate) struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    /// copy of the shared state, made on the first write
    working: Option<MemoryState>,
}

impl MemoryTransaction {
    fn state(&self) -> &MemoryState {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn state_mut(&mut self) -> &mut MemoryState {
        let shared = &self.guard;
        self.working.get_or_insert_with(|| MemoryState::clone(shared))
    }

    #[cfg(test)]
    fn has_writes(&self) -> bool {
        self.working.is_some()
    }
}

impl StoreTransaction for MemoryTransaction {
    async fn lock_cash_desk(&mut self, number: i32) -> Result<Option<CashDesk>, StoreError> {
        Ok(self.state().cash_desks.get(&number).cloned())
    }

    async fn find_employee(&mut self, registration_number: i32) -> Result<Option<Employee>, StoreError> {
        Ok(self.state().employees.get(&registration_number).cloned())
    }

    async fn has_open_payment(&mut self, cash_desk_number: i32) -> Result<bool, StoreError> {
        Ok(self
            .state()
            .payments
            .values()
            .any(|p| p.cash_desk_number == cash_desk_number && p.is_open()))
    }

    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>, StoreError> {
        Ok(self.state().payments.get(&id).cloned())
    }

    async fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        Ok(self
            .state()
            .payments
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError> {
        // mirrors the partial unique index on open payments per cash desk
        if self.has_open_payment(payment.cash_desk_number).await? {
            return Err(StoreError::Conflict);
        }
        let state = self.state_mut();
        state.last_payment_id += 1;
        let payment = Payment {
            id: state.last_payment_id,
            cash_desk_number: payment.cash_desk_number,
            employee_registration_number: payment.employee_registration_number,
            payment_type: payment.payment_type,
            payment_date_time: payment.payment_date_time,
            confirmed: None,
        };
        state.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn set_confirmed(&mut self, id: i64, confirmed: DateTime<Utc>) -> Result<(), StoreError> {
        if !self.state().payments.contains_key(&id) {
            return Ok(());
        }
        if let Some(payment) = self.state_mut().payments.get_mut(&id) {
            payment.confirmed = Some(confirmed);
        }
        Ok(())
    }

    async fn find_items(&mut self, payment_id: i64) -> Result<Vec<PaymentItem>, StoreError> {
        Ok(self
            .state()
            .items
            .values()
            .filter(|i| i.payment_id == payment_id)
            .cloned()
            .collect())
    }

    async fn insert_item(&mut self, item: NewItem<'_>) -> Result<PaymentItem, StoreError> {
        let state = self.state_mut();
        state.last_item_id += 1;
        let item = PaymentItem {
            id: state.last_item_id,
            payment_id: item.payment_id,
            article_name: item.article_name.to_string(),
            amount: item.amount,
            price: item.price,
        };
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_items(&mut self, payment_id: i64) -> Result<u64, StoreError> {
        if !self.state().items.values().any(|i| i.payment_id == payment_id) {
            return Ok(0);
        }
        let items = &mut self.state_mut().items;
        let before = items.len();
        items.retain(|_, i| i.payment_id != payment_id);
        Ok((before - items.len()) as u64)
    }

    async fn delete_payment(&mut self, id: i64) -> Result<u64, StoreError> {
        // no cascading: items must be gone first, like the foreign key demands
        if self.state().items.values().any(|i| i.payment_id == id) {
            return Err(StoreError::Conflict);
        }
        if !self.state().payments.contains_key(&id) {
            return Ok(0);
        }
        self.state_mut().payments.remove(&id);
        Ok(1)
    }

    async fn commit(self) -> Result<(), StoreError> {
        let MemoryTransaction { mut guard, working } = self;
        if let Some(working) = working {
            *guard = working;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
