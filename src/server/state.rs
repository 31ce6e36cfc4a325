use crate::server::database::store::PaymentStore;
use crate::server::service::payment::PaymentService;

pub(crate) struct AppState<S: PaymentStore> {
    payments: PaymentService<S>,
}

impl<S: PaymentStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            payments: PaymentService::new(store),
        }
    }

    pub fn payments(&self) -> &PaymentService<S> {
        &self.payments
    }
}
