use actix_web::web;
use crate::server::controller::error::CustomError;
use crate::server::controller::payments::{
    delete_payment, get_payment, get_payments, patch_payment, post_payment, post_payment_item,
};
use crate::server::database::store::PaymentStore;

/// Mount the payment API for a given store.
pub(crate) fn configure<S: PaymentStore>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| CustomError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api/payments")
            .route("", web::get().to(get_payments::<S>))
            .route("", web::post().to(post_payment::<S>))
            .route("/{id}", web::get().to(get_payment::<S>))
            .route("/{id}", web::patch().to(patch_payment::<S>))
            .route("/{id}", web::delete().to(delete_payment::<S>))
            .route("/{id}/items", web::post().to(post_payment_item::<S>)),
    );
}
