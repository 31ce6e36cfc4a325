use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentItem {
    pub id: i64,
    pub payment_id: i64,
    pub article_name: String,
    pub amount: i32,
    pub price: Decimal,
}

/// Body of `POST /api/payments/{id}/items`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewPaymentItemCommand {
    pub payment_id: i64,
    pub article_name: String,
    pub amount: i32,
    pub price: Decimal,
}

/// Prices are stored with two decimal places and at most eight integer digits.
const PRICE_SCALE: u32 = 2;
// 9_999_999_999 with scale PRICE_SCALE (`Decimal::new` is not const)
const MAX_PRICE: Decimal = Decimal::from_parts(0x540B_E3FF, 0x2, 0, false, PRICE_SCALE);

impl NewPaymentItemCommand {
    /// whether the price can be stored without rounding or overflow
    pub fn has_valid_price(&self) -> bool {
        self.price.normalize().scale() <= PRICE_SCALE && self.price.abs() <= MAX_PRICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn with_price(price: &str) -> NewPaymentItemCommand {
        NewPaymentItemCommand {
            payment_id: 1,
            article_name: "Coffee".to_string(),
            amount: 1,
            price: Decimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn price_must_fit_two_decimal_places() {
        assert!(with_price("3.5").has_valid_price());
        assert!(with_price("3.50").has_valid_price());
        assert!(with_price("3.500").has_valid_price());
        assert!(!with_price("3.999").has_valid_price());
    }

    #[test]
    fn price_must_fit_eight_integer_digits() {
        assert!(with_price("99999999.99").has_valid_price());
        assert!(with_price("-99999999.99").has_valid_price());
        assert!(!with_price("100000000").has_valid_price());
        assert!(!with_price("1000000000").has_valid_price());
    }
}
