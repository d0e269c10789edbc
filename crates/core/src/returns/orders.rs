use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub product_name: String,
    pub purchase_date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub status: String,
}

/// Read access to orders by identifier. Identifiers are upper-case.
pub trait OrderCatalog: Send + Sync {
    fn find(&self, order_id: &str) -> Option<Order>;
    /// Every known identifier, sorted.
    fn order_ids(&self) -> Vec<String>;
}

struct SampleOrder {
    order_id: &'static str,
    product_name: &'static str,
    days_ago: u64,
    amount_cents: i64,
}

const SAMPLE_ORDERS: &[SampleOrder] = &[
    SampleOrder {
        order_id: "ORD-001",
        product_name: "Dell XPS 15 Laptop",
        days_ago: 15,
        amount_cents: 129_999,
    },
    SampleOrder { order_id: "ORD-002", product_name: "iPhone 13", days_ago: 45, amount_cents: 79_999 },
    SampleOrder {
        order_id: "ORD-003",
        product_name: "Samsung Galaxy Tab (Defective)",
        days_ago: 10,
        amount_cents: 44_999,
    },
];

/// Demo orders whose purchase dates trail the clock: one recent, one outside
/// the window and one recent defective item.
pub struct SampleOrderCatalog<C> {
    clock: C,
}

impl<C> SampleOrderCatalog<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C> OrderCatalog for SampleOrderCatalog<C>
where
    C: Clock,
{
    fn find(&self, order_id: &str) -> Option<Order> {
        let sample = SAMPLE_ORDERS.iter().find(|sample| sample.order_id == order_id)?;
        let purchase_date = self.clock.today().checked_sub_days(Days::new(sample.days_ago))?;
        Some(Order {
            order_id: sample.order_id.to_string(),
            product_name: sample.product_name.to_string(),
            purchase_date,
            amount: Decimal::new(sample.amount_cents, 2),
            category: "electronics".to_string(),
            status: "delivered".to_string(),
        })
    }

    fn order_ids(&self) -> Vec<String> {
        SAMPLE_ORDERS.iter().map(|sample| sample.order_id.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::{OrderCatalog, SampleOrderCatalog};
    use crate::clock::FixedClock;

    fn catalog() -> SampleOrderCatalog<FixedClock> {
        SampleOrderCatalog::new(FixedClock::on_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
        ))
    }

    #[test]
    fn sample_dates_trail_the_clock() {
        let catalog = catalog();

        let laptop = catalog.find("ORD-001").expect("known order");
        assert_eq!(laptop.purchase_date, NaiveDate::from_ymd_opt(2025, 2, 14).expect("valid date"));
        assert_eq!(laptop.amount, Decimal::new(129_999, 2));

        let phone = catalog.find("ORD-002").expect("known order");
        assert_eq!(phone.purchase_date, NaiveDate::from_ymd_opt(2025, 1, 15).expect("valid date"));
    }

    #[test]
    fn lookup_is_exact_on_identifier() {
        let catalog = catalog();

        assert!(catalog.find("ord-001").is_none());
        assert!(catalog.find("ORD-999").is_none());
        assert_eq!(catalog.order_ids(), vec!["ORD-001", "ORD-002", "ORD-003"]);
    }

    #[test]
    fn order_serializes_date_and_amount_for_tools() {
        let order = catalog().find("ORD-003").expect("known order");
        let json = serde_json::to_value(&order).expect("serialize order");

        assert_eq!(json["purchase_date"], "2025-02-19");
        assert_eq!(json["amount"].as_f64(), Some(449.99));
        assert_eq!(json["status"], "delivered");
    }
}
