//! Status transition rules and input validation for items.
//!
//! `pending_approval` moves to `approved` or `rejected`; `approved` and `claimed`
//! alternate through claim/unclaim; `rejected` is terminal.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::domain::{ApprovalRecord, ClaimRecord, Item, ItemId, ItemStatus, ItemSubmission};

pub const DEFAULT_REJECTION_REASON: &str = "No reason provided";

impl ItemStatus {
    /// Whether the lifecycle has an edge from `self` to `target`.
    pub const fn permits(self, target: ItemStatus) -> bool {
        matches!(
            (self, target),
            (ItemStatus::PendingApproval, ItemStatus::Approved)
                | (ItemStatus::PendingApproval, ItemStatus::Rejected)
                | (ItemStatus::Approved, ItemStatus::Claimed)
                | (ItemStatus::Claimed, ItemStatus::Approved)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Rejected)
    }
}

/// A guarded status change. Repositories apply it only when the stored status
/// equals [`Transition::required_status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Approve(ApprovalRecord),
    Reject { reason: String },
    Claim(ClaimRecord),
    Unclaim,
}

impl Transition {
    pub const fn required_status(&self) -> ItemStatus {
        match self {
            Transition::Approve(_) | Transition::Reject { .. } => ItemStatus::PendingApproval,
            Transition::Claim(_) => ItemStatus::Approved,
            Transition::Unclaim => ItemStatus::Claimed,
        }
    }

    pub const fn target_status(&self) -> ItemStatus {
        match self {
            Transition::Approve(_) | Transition::Unclaim => ItemStatus::Approved,
            Transition::Reject { .. } => ItemStatus::Rejected,
            Transition::Claim(_) => ItemStatus::Claimed,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Transition::Approve(_) => "approve",
            Transition::Reject { .. } => "reject",
            Transition::Claim(_) => "claim",
            Transition::Unclaim => "unclaim",
        }
    }

    /// Mutates `item` into the post-transition state. Callers check the
    /// required status first; this only rewrites the affected fields.
    pub fn apply(&self, item: &mut Item) {
        debug_assert!(self.required_status().permits(self.target_status()));
        item.status = self.target_status();
        match self {
            Transition::Approve(approval) => item.approval = Some(approval.clone()),
            Transition::Reject { reason } => item.rejection_reason = Some(reason.clone()),
            Transition::Claim(claim) => item.claim = Some(claim.clone()),
            Transition::Unclaim => item.claim = None,
        }
    }
}

/// Single field-level complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Collected validation failures for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Submission fields after trimming and date parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location_found: String,
    pub date_found: NaiveDate,
    pub contact_info: String,
}

impl ValidatedSubmission {
    pub fn into_item(self, image_url: Option<String>, created_at: DateTime<Utc>) -> Item {
        Item {
            id: ItemId::generate(),
            title: self.title,
            description: self.description,
            category: self.category,
            location_found: self.location_found,
            date_found: self.date_found,
            contact_info: self.contact_info,
            image_url,
            status: ItemStatus::PendingApproval,
            claim: None,
            approval: None,
            rejection_reason: None,
            created_at,
        }
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

fn required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, "is required");
    }
    trimmed.to_string()
}

pub fn validate_submission(
    submission: &ItemSubmission,
) -> Result<ValidatedSubmission, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = required(&mut errors, "title", &submission.title);
    let description = required(&mut errors, "description", &submission.description);
    let category = required(&mut errors, "category", &submission.category);
    let location_found = required(&mut errors, "location_found", &submission.location_found);
    let contact_info = required(&mut errors, "contact_info", &submission.contact_info);

    let raw_date = required(&mut errors, "date_found", &submission.date_found);
    let date_found = if raw_date.is_empty() {
        None
    } else {
        match parse_date(&raw_date) {
            Ok(date) => Some(date),
            Err(message) => {
                errors.push("date_found", message);
                None
            }
        }
    };

    match date_found {
        Some(date_found) => errors.into_result(ValidatedSubmission {
            title,
            description,
            category,
            location_found,
            date_found,
            contact_info,
        }),
        None => Err(errors),
    }
}

/// Trimmed claimant details, both mandatory.
pub fn validate_claimant(
    claimant_name: &str,
    claimant_contact: &str,
) -> Result<(String, String), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let name = required(&mut errors, "claimant_name", claimant_name);
    let contact = required(&mut errors, "claimant_contact", claimant_contact);
    errors.into_result((name, contact))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ItemSubmission {
        ItemSubmission {
            title: "Blue Backpack".to_string(),
            description: "Navy blue with a laptop sleeve".to_string(),
            category: "Bags & Backpacks".to_string(),
            location_found: "Central Library".to_string(),
            date_found: "2025-10-01".to_string(),
            contact_info: "finder@example.com".to_string(),
        }
    }

    #[test]
    fn only_documented_edges_are_permitted() {
        let mut edges = Vec::new();
        for from in ItemStatus::ALL {
            for to in ItemStatus::ALL {
                if from.permits(to) {
                    edges.push((from, to));
                }
            }
        }
        assert_eq!(
            edges,
            vec![
                (ItemStatus::PendingApproval, ItemStatus::Approved),
                (ItemStatus::PendingApproval, ItemStatus::Rejected),
                (ItemStatus::Approved, ItemStatus::Claimed),
                (ItemStatus::Claimed, ItemStatus::Approved),
            ]
        );
        assert!(ItemStatus::ALL
            .into_iter()
            .all(|to| !ItemStatus::Rejected.permits(to)));
        assert!(ItemStatus::Rejected.is_terminal());
    }

    #[test]
    fn unclaim_clears_claim_but_keeps_approval() {
        let approved_at = Utc::now();
        let mut item = validate_submission(&submission())
            .expect("valid")
            .into_item(None, Utc::now());

        Transition::Approve(ApprovalRecord {
            approved_by: "admin".to_string(),
            approved_at,
        })
        .apply(&mut item);
        Transition::Claim(ClaimRecord {
            claimed_by: "Jane".to_string(),
            claimant_contact: "jane@x.com".to_string(),
            claimed_date: Utc::now(),
        })
        .apply(&mut item);
        assert_eq!(item.status, ItemStatus::Claimed);
        assert!(item.claim.is_some());

        Transition::Unclaim.apply(&mut item);
        assert_eq!(item.status, ItemStatus::Approved);
        assert!(item.claim.is_none());
        assert_eq!(
            item.approval.as_ref().map(|approval| approval.approved_at),
            Some(approved_at)
        );
    }

    #[test]
    fn missing_fields_are_reported_individually() {
        let mut bad = submission();
        bad.title = "   ".to_string();
        bad.contact_info.clear();

        let errors = validate_submission(&bad).expect_err("missing fields");
        assert!(errors.has_field("title"));
        assert!(errors.has_field("contact_info"));
        assert_eq!(errors.fields().len(), 2);
    }

    #[test]
    fn malformed_date_is_a_validation_error() {
        let mut bad = submission();
        bad.date_found = "last tuesday".to_string();

        let errors = validate_submission(&bad).expect_err("bad date");
        assert!(errors.has_field("date_found"));
        assert!(errors.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn claimant_details_are_trimmed_and_required() {
        assert_eq!(
            validate_claimant(" Jane ", "jane@x.com"),
            Ok(("Jane".to_string(), "jane@x.com".to_string()))
        );
        let errors = validate_claimant("", " ").expect_err("both missing");
        assert!(errors.has_field("claimant_name"));
        assert!(errors.has_field("claimant_contact"));
    }
}
