//! Marketplace entities as the backend serves them.
//!
//! Timestamps stay as the RFC 3339 strings the API sends; use
//! `bazaar_kernel::datetime::parse_timestamp` when a typed value is needed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Available,
    Pending,
    Sold,
    Inactive,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub images: Vec<String>,
    pub seller_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Item {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == ItemStatus::Available
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub item_id: String,
    pub buyer_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_id: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub status: OfferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Offer {
    /// Marks a pending offer accepted. Decided offers are left untouched.
    pub fn accept(&mut self) -> bool {
        self.decide(OfferStatus::Accepted)
    }

    /// Marks a pending offer rejected. Decided offers are left untouched.
    pub fn reject(&mut self) -> bool {
        self.decide(OfferStatus::Rejected)
    }

    fn decide(&mut self, to: OfferStatus) -> bool {
        if self.status != OfferStatus::Pending {
            return false;
        }
        self.status = to;
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    /// `PENDING -> CONFIRMED -> COMPLETED`, and `PENDING | CONFIRMED -> CANCELLED`.
    #[must_use]
    pub const fn can_become(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Confirmed)
                | (Self::Confirmed, Self::Completed)
                | (Self::Pending | Self::Confirmed, Self::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub item_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
    pub buyer_id: String,
    pub seller_id: String,
    pub amount: f64,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Transaction {
    pub fn confirm(&mut self) -> bool {
        self.transition(TransactionStatus::Confirmed)
    }

    pub fn complete(&mut self) -> bool {
        self.transition(TransactionStatus::Completed)
    }

    pub fn cancel(&mut self) -> bool {
        self.transition(TransactionStatus::Cancelled)
    }

    fn transition(&mut self, to: TransactionStatus) -> bool {
        if !self.status.can_become(to) {
            return false;
        }
        self.status = to;
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer(status: OfferStatus) -> Offer {
        Offer {
            id: "o-1".into(),
            item_id: "i-1".into(),
            buyer_id: "u-2".into(),
            seller_id: None,
            amount: 15_000.0,
            message: None,
            status,
            created_at: None,
        }
    }

    fn transaction(status: TransactionStatus) -> Transaction {
        Transaction {
            id: "t-1".into(),
            item_id: "i-1".into(),
            item_title: None,
            buyer_id: "u-2".into(),
            seller_id: "u-1".into(),
            amount: 15_000.0,
            status,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn pending_offer_can_be_decided_once() {
        let mut o = offer(OfferStatus::Pending);
        assert!(o.accept());
        assert_eq!(o.status, OfferStatus::Accepted);
        assert!(!o.reject());
        assert_eq!(o.status, OfferStatus::Accepted);
    }

    #[test]
    fn expired_offer_is_never_changed() {
        let mut o = offer(OfferStatus::Expired);
        assert!(!o.accept());
        assert!(!o.reject());
        assert_eq!(o.status, OfferStatus::Expired);
    }

    #[test]
    fn transaction_follows_its_lifecycle() {
        let mut t = transaction(TransactionStatus::Pending);
        assert!(!t.complete());
        assert!(t.confirm());
        assert!(!t.confirm());
        assert!(t.complete());
        assert!(!t.cancel());
        assert_eq!(t.status, TransactionStatus::Completed);
    }

    #[test]
    fn confirmed_transaction_can_be_cancelled() {
        let mut t = transaction(TransactionStatus::Confirmed);
        assert!(t.cancel());
        assert_eq!(t.status, TransactionStatus::Cancelled);
        assert!(!t.confirm());
    }

    #[test]
    fn unknown_status_blocks_every_transition() {
        let mut t = transaction(TransactionStatus::Unknown);
        assert!(!t.confirm());
        assert!(!t.complete());
        assert!(!t.cancel());
    }
}
