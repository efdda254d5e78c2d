use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for reported items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle status of a reported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    PendingApproval,
    Approved,
    Rejected,
    Claimed,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::PendingApproval,
        ItemStatus::Approved,
        ItemStatus::Rejected,
        ItemStatus::Claimed,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ItemStatus::PendingApproval => "pending_approval",
            ItemStatus::Approved => "approved",
            ItemStatus::Rejected => "rejected",
            ItemStatus::Claimed => "claimed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown item status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ItemStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.label() == value.trim())
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Categories offered to reporters. Submissions outside this list are accepted.
pub const RECOMMENDED_CATEGORIES: [&str; 9] = [
    "Electronics",
    "Clothing & Accessories",
    "Books & Documents",
    "Jewelry & Watches",
    "Keys & ID Cards",
    "Bags & Backpacks",
    "Sports Equipment",
    "Toys & Games",
    "Other",
];

pub fn is_recommended_category(category: &str) -> bool {
    RECOMMENDED_CATEGORIES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(category.trim()))
}

/// Raw report fields as received from the reporter; validated by the item store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location_found: String,
    #[serde(default)]
    pub date_found: String,
    #[serde(default)]
    pub contact_info: String,
}

/// Who claimed an item and when. Present exactly while the item is claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub claimed_by: String,
    pub claimant_contact: String,
    pub claimed_date: DateTime<Utc>,
}

/// Moderator sign-off. Set on approval and kept for the rest of the item's life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approved_by: String,
    pub approved_at: DateTime<Utc>,
}

/// A found item tracked through the approval and claim lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_found: String,
    pub date_found: NaiveDate,
    pub contact_info: String,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub claim: Option<ClaimRecord>,
    pub approval: Option<ApprovalRecord>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Full record as shown to moderators.
    pub fn record_view(&self) -> ItemRecordView {
        ItemRecordView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location_found: self.location_found.clone(),
            date_found: self.date_found,
            contact_info: self.contact_info.clone(),
            image_url: self.image_url.clone(),
            status: self.status,
            claimed_by: self.claim.as_ref().map(|claim| claim.claimed_by.clone()),
            claimant_contact: self
                .claim
                .as_ref()
                .map(|claim| claim.claimant_contact.clone()),
            claimed_date: self.claim.as_ref().map(|claim| claim.claimed_date),
            approved_by: self
                .approval
                .as_ref()
                .map(|approval| approval.approved_by.clone()),
            approved_at: self.approval.as_ref().map(|approval| approval.approved_at),
            rejection_reason: self.rejection_reason.clone(),
            created_at: self.created_at,
        }
    }

    /// Listing entry safe to hand to anonymous callers.
    pub fn public_view(&self) -> PublicItemView {
        PublicItemView {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            location_found: self.location_found.clone(),
            date_found: self.date_found,
            contact_info: self.contact_info.clone(),
            image_url: self.image_url.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Moderator-facing representation with every lifecycle column spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecordView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_found: String,
    pub date_found: NaiveDate,
    pub contact_info: String,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub claimed_by: Option<String>,
    pub claimant_contact: Option<String>,
    pub claimed_date: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicItemView {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_found: String,
    pub date_found: NaiveDate,
    pub contact_info: String,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip_through_from_str() {
        for status in ItemStatus::ALL {
            assert_eq!(status.label().parse::<ItemStatus>(), Ok(status));
        }
        assert!("archived".parse::<ItemStatus>().is_err());
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&ItemStatus::PendingApproval).expect("serialize");
        assert_eq!(json, "\"pending_approval\"");
    }

    #[test]
    fn recommended_categories_match_case_insensitively() {
        assert!(is_recommended_category("bags & backpacks"));
        assert!(!is_recommended_category("Umbrellas"));
    }
}
