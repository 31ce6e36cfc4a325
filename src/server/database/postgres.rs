use std::future::Future;
use std::time::Duration;
use chrono::{DateTime, Utc};
use log::{error, warn};
use tokio::time;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Row};
use crate::server::database::connection::Connection;
use crate::server::database::pool::Pool;
use crate::server::database::store::{NewItem, PaymentStore, StoreError, StoreTransaction};
use crate::server::model::cash_desk::CashDesk;
use crate::server::model::employee::Employee;
use crate::server::model::item::PaymentItem;
use crate::server::model::payment::{NewPayment, Payment};
use crate::server::model::PaymentFilter;

const PAYMENT_COLUMNS: &str =
    "id, cash_desk_number, employee_registration_number, payment_type, payment_date_time, confirmed";
const ITEM_COLUMNS: &str = "id, payment_id, article_name, amount, price";
/// the server cancels a statement after `timeout`, the client gives up this much later
const CLIENT_GRACE: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: Pool<Client>,
    /// how long `begin` waits for a pooled connection, and how long a single statement may run
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: Pool<Client>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

impl PaymentStore for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StoreError> {
        let conn = self.pool.acquire(self.timeout).await.ok_or(StoreError::Busy)?;
        let tx = PgTransaction { conn, timeout: self.timeout, done: false };
        let begin = format!("BEGIN; SET LOCAL statement_timeout = {}", self.timeout.as_millis());
        tx.batch(&begin).await?;
        Ok(tx)
    }
}

/// Run one statement, giving up once `limit` elapses.
async fn within<T, F>(limit: Duration, statement: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, tokio_postgres::Error>>,
{
    let sleep = time::sleep(limit);
    tokio::pin!(sleep);
    tokio::select! {
        res = statement => Ok(res?),
        _ = &mut sleep => {
            error!("statement did not finish within {:?}", limit);
            Err(StoreError::Timeout)
        },
    }
}

/// One `BEGIN ... COMMIT` block on a pooled connection.
pub(crate) struct PgTransaction {
    conn: Connection<Client>,
    /// server side `statement_timeout` of this transaction
    timeout: Duration,
    done: bool,
}

impl PgTransaction {
    fn client(&self) -> &Client {
        self.conn.client()
    }

    fn limit(&self) -> Duration {
        self.timeout + CLIENT_GRACE
    }

    async fn batch(&self, stmt: &str) -> Result<(), StoreError> {
        within(self.limit(), self.client().batch_execute(stmt)).await
    }

    async fn query(&self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>, StoreError> {
        within(self.limit(), self.client().query(stmt, params)).await
    }

    async fn query_one(&self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Row, StoreError> {
        within(self.limit(), self.client().query_one(stmt, params)).await
    }

    async fn query_opt(&self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Option<Row>, StoreError> {
        within(self.limit(), self.client().query_opt(stmt, params)).await
    }

    async fn execute(&self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, StoreError> {
        within(self.limit(), self.client().execute(stmt, params)).await
    }

    async fn finish(mut self, stmt: &str) -> Result<(), StoreError> {
        self.batch(stmt).await?;
        self.done = true;
        Ok(())
    }
}

impl Drop for PgTransaction {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // never hand a connection with an open transaction back to the pool
        let Some(client) = self.conn.take_client() else {
            return;
        };
        let pool = self.conn.pool().clone();
        let limit = self.limit();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match within(limit, client.batch_execute("ROLLBACK")).await {
                        Ok(()) => pool.release(client),
                        Err(e) => {
                            error!("failed to roll back abandoned transaction, replacing connection, {}", e);
                            pool.discard(client);
                        }
                    }
                });
            }
            Err(_) => warn!("no runtime to roll back abandoned transaction, dropping connection"),
        }
    }
}

fn payment_from_row(row: &Row) -> Result<Payment, StoreError> {
    let payment_type: &str = row.try_get("payment_type")?;
    Ok(Payment {
        id: row.try_get("id")?,
        cash_desk_number: row.try_get("cash_desk_number")?,
        employee_registration_number: row.try_get("employee_registration_number")?,
        payment_type: payment_type.parse().map_err(StoreError::Corrupt)?,
        payment_date_time: row.try_get("payment_date_time")?,
        confirmed: row.try_get("confirmed")?,
    })
}

fn item_from_row(row: &Row) -> Result<PaymentItem, StoreError> {
    Ok(PaymentItem {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        article_name: row.try_get("article_name")?,
        amount: row.try_get("amount")?,
        price: row.try_get("price")?,
    })
}

impl StoreTransaction for PgTransaction {
    async fn lock_cash_desk(&mut self, number: i32) -> Result<Option<CashDesk>, StoreError> {
        let row = self
            .query_opt("SELECT number FROM cash_desk WHERE number = $1 FOR UPDATE", &[&number])
            .await?;
        row.map(|r| -> Result<CashDesk, StoreError> { Ok(CashDesk { number: r.try_get("number")? }) })
            .transpose()
    }

    async fn find_employee(&mut self, registration_number: i32) -> Result<Option<Employee>, StoreError> {
        let row = self
            .query_opt(
                r#"
                SELECT registration_number, first_name, last_name, role
                FROM employee
                WHERE registration_number = $1
            "#,
                &[&registration_number],
            )
            .await?;
        let Some(r) = row else {
            return Ok(None);
        };
        let role: &str = r.try_get("role")?;
        Ok(Some(Employee {
            registration_number: r.try_get("registration_number")?,
            first_name: r.try_get("first_name")?,
            last_name: r.try_get("last_name")?,
            role: role.parse().map_err(StoreError::Corrupt)?,
        }))
    }

    async fn has_open_payment(&mut self, cash_desk_number: i32) -> Result<bool, StoreError> {
        let row = self
            .query_one(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM payment
                    WHERE cash_desk_number = $1 AND confirmed IS NULL
                ) AS open
            "#,
                &[&cash_desk_number],
            )
            .await?;
        Ok(row.try_get("open")?)
    }

    async fn find_payment(&mut self, id: i64) -> Result<Option<Payment>, StoreError> {
        let stmt = format!("SELECT {PAYMENT_COLUMNS} FROM payment WHERE id = $1");
        self.query_opt(&stmt, &[&id]).await?.as_ref().map(payment_from_row).transpose()
    }

    async fn lock_payment(&mut self, id: i64) -> Result<Option<Payment>, StoreError> {
        let stmt = format!("SELECT {PAYMENT_COLUMNS} FROM payment WHERE id = $1 FOR UPDATE");
        self.query_opt(&stmt, &[&id]).await?.as_ref().map(payment_from_row).transpose()
    }

    async fn list_payments(&mut self, filter: &PaymentFilter) -> Result<Vec<Payment>, StoreError> {
        let stmt = format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payment
            WHERE ($1::int IS NULL OR cash_desk_number = $1)
            AND ($2::date IS NULL OR (payment_date_time AT TIME ZONE 'UTC')::date >= $2)
            ORDER BY id
        "#
        );
        self.query(&stmt, &[&filter.cash_desk, &filter.date_from])
            .await?
            .iter()
            .map(payment_from_row)
            .collect()
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, StoreError> {
        let stmt = format!(
            r#"
            INSERT INTO payment(cash_desk_number, employee_registration_number, payment_type, payment_date_time)
            VALUES ($1, $2, $3, $4)
            RETURNING {PAYMENT_COLUMNS}
        "#
        );
        let row = self
            .query_one(
                &stmt,
                &[
                    &payment.cash_desk_number,
                    &payment.employee_registration_number,
                    &payment.payment_type.as_str(),
                    &payment.payment_date_time,
                ],
            )
            .await?;
        payment_from_row(&row)
    }

    async fn set_confirmed(&mut self, id: i64, confirmed: DateTime<Utc>) -> Result<(), StoreError> {
        self.execute("UPDATE payment SET confirmed = $2 WHERE id = $1", &[&id, &confirmed])
            .await?;
        Ok(())
    }

    async fn find_items(&mut self, payment_id: i64) -> Result<Vec<PaymentItem>, StoreError> {
        let stmt = format!("SELECT {ITEM_COLUMNS} FROM payment_item WHERE payment_id = $1 ORDER BY id");
        self.query(&stmt, &[&payment_id])
            .await?
            .iter()
            .map(item_from_row)
            .collect()
    }

    async fn insert_item(&mut self, item: NewItem<'_>) -> Result<PaymentItem, StoreError> {
        let stmt = format!(
            r#"
            INSERT INTO payment_item(payment_id, article_name, amount, price)
            VALUES ($1, $2, $3, $4)
            RETURNING {ITEM_COLUMNS}
        "#
        );
        let row = self
            .query_one(&stmt, &[&item.payment_id, &item.article_name, &item.amount, &item.price])
            .await?;
        item_from_row(&row)
    }

    async fn delete_items(&mut self, payment_id: i64) -> Result<u64, StoreError> {
        self.execute("DELETE FROM payment_item WHERE payment_id = $1", &[&payment_id])
            .await
    }

    async fn delete_payment(&mut self, id: i64) -> Result<u64, StoreError> {
        self.execute("DELETE FROM payment WHERE id = $1", &[&id]).await
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish("COMMIT").await
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.finish("ROLLBACK").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn hung_statement_times_out() {
        let res = within(LIMIT, std::future::pending::<Result<(), tokio_postgres::Error>>()).await;
        assert!(matches!(res, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn statement_finishing_in_time_passes_its_result() {
        let res = within(LIMIT, async { Ok::<_, tokio_postgres::Error>(7) }).await;
        assert!(matches!(res, Ok(7)));
    }
}
