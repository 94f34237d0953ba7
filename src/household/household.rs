use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{common::new_record_id, member::Member, product::Product, transaction::Transaction};

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Document persisted per household: members, budget entries, and inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub products: Vec<Product>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Household::schema_version_default")]
    pub schema_version: u8,
}

impl Household {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_record_id(),
            name: name.into(),
            members: Vec::new(),
            transactions: Vec::new(),
            products: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_member(&mut self, member: Member, now: DateTime<Utc>) -> String {
        let id = member.id.clone();
        self.members.push(member);
        self.touch(now);
        id
    }

    pub fn add_transaction(&mut self, transaction: Transaction, now: DateTime<Utc>) -> String {
        let id = transaction.id.clone();
        self.transactions.push(transaction);
        self.touch(now);
        id
    }

    pub fn add_product(&mut self, product: Product, now: DateTime<Utc>) -> String {
        let id = product.id.clone();
        self.products.push(product);
        self.touch(now);
        id
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    pub fn member_mut(&mut self, id: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|member| member.id == id)
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|txn| txn.id == id)
    }

    pub fn transaction_mut(&mut self, id: &str) -> Option<&mut Transaction> {
        self.transactions.iter_mut().find(|txn| txn.id == id)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|product| product.id == id)
    }

    pub fn remove_member(&mut self, id: &str, now: DateTime<Utc>) -> Option<Member> {
        let index = self.members.iter().position(|member| member.id == id)?;
        self.touch(now);
        Some(self.members.remove(index))
    }

    pub fn remove_transaction(&mut self, id: &str, now: DateTime<Utc>) -> Option<Transaction> {
        let index = self.transactions.iter().position(|txn| txn.id == id)?;
        self.touch(now);
        Some(self.transactions.remove(index))
    }

    pub fn remove_product(&mut self, id: &str, now: DateTime<Utc>) -> Option<Product> {
        let index = self.products.iter().position(|product| product.id == id)?;
        self.touch(now);
        Some(self.products.remove(index))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}
