//! Typed schemas for each domain's payload.
//!
//! Field names are camelCase to match the JSON the app already writes.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::domain::Domain;

/// A payload type bound to one domain.
pub trait DomainRecord: Serialize + DeserializeOwned + Send + Sync {
    const DOMAIN: Domain;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sale,
    Purchase,
    Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub kind: TransactionKind,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub qty: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

/// Money owed by a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub id: String,
    pub customer: String,
    pub amount: f64,
    #[serde(default)]
    pub paid: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_ms: Option<u64>,
    #[serde(default)]
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitEntry {
    pub id: String,
    /// e.g. `2025-06`.
    pub period: String,
    pub revenue: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub currency: String,
    pub low_stock_threshold: u32,
    pub reminders_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            low_stock_threshold: 5,
            reminders_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub business_name: String,
    pub owner_name: String,
    pub phone: Option<String>,
}

impl DomainRecord for Vec<Transaction> {
    const DOMAIN: Domain = Domain::Transactions;
}

impl DomainRecord for Vec<InventoryItem> {
    const DOMAIN: Domain = Domain::Inventory;
}

impl DomainRecord for Vec<CreditEntry> {
    const DOMAIN: Domain = Domain::Credits;
}

impl DomainRecord for Vec<ProfitEntry> {
    const DOMAIN: Domain = Domain::Profits;
}

impl DomainRecord for Settings {
    const DOMAIN: Domain = Domain::Settings;
}

impl DomainRecord for Profile {
    const DOMAIN: Domain = Domain::Profile;
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn sparse_inventory_parses() {
        let items: Vec<InventoryItem> =
            serde_json::from_value(json!([{"id": "inv_1", "qty": 5}])).unwrap();
        assert_eq!(items[0].qty, 5);
        assert!(items[0].name.is_empty());
        assert_eq!(items[0].unit_price, None);
    }

    #[test]
    fn transaction_wire_shape() {
        let tx = Transaction {
            id: "tx_1".into(),
            kind: TransactionKind::Sale,
            amount: 12.5,
            item_id: Some("inv_1".into()),
            quantity: Some(2),
            note: None,
            timestamp_ms: 1_700_000_000_000,
        };
        assert_eq!(
            serde_json::to_value(&tx).unwrap(),
            json!({
                "id": "tx_1",
                "kind": "sale",
                "amount": 12.5,
                "itemId": "inv_1",
                "quantity": 2,
                "timestampMs": 1_700_000_000_000u64
            })
        );
    }

    #[test]
    fn settings_fill_defaults() {
        let settings: Settings = serde_json::from_value(json!({"currency": "KES"})).unwrap();
        assert_eq!(settings.currency, "KES");
        assert_eq!(settings.low_stock_threshold, 5);
    }

    #[test]
    fn credit_requires_customer() {
        let parsed = serde_json::from_value::<CreditEntry>(json!({"id": "c1", "amount": 3.0}));
        assert!(parsed.is_err());
    }

    #[test]
    fn records_are_bound_to_domains() {
        assert_eq!(<Vec<Transaction>>::DOMAIN, Domain::Transactions);
        assert_eq!(<Vec<InventoryItem>>::DOMAIN, Domain::Inventory);
        assert_eq!(<Vec<CreditEntry>>::DOMAIN, Domain::Credits);
        assert_eq!(<Vec<ProfitEntry>>::DOMAIN, Domain::Profits);
        assert_eq!(Settings::DOMAIN, Domain::Settings);
        assert_eq!(Profile::DOMAIN, Domain::Profile);
    }
}
