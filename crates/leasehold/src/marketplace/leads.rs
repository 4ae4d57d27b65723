//! CRM lead bookkeeping.
//!
//! Labels are free-form and may change in any direction. Stages drive the label only at the
//! two terminal points: `confirmed` converts the lead and `rejected` loses it.

use chrono::{DateTime, Utc};

use super::domain::{Lead, LeadId, LeadKey, LeadLabel, LeadNote, LeadStage, UserId};
use super::error::MarketplaceError;

impl Lead {
    /// A fresh lead for a tenant's first contact.
    pub fn open(key: LeadKey, now: DateTime<Utc>) -> Self {
        Lead {
            id: LeadId::generate(),
            owner: key.owner,
            tenant: key.tenant,
            property: key.property,
            label: LeadLabel::Warm,
            stage: LeadStage::Enquiry,
            notes: Vec::new(),
            contact_count: 1,
            first_contact_at: now,
            last_contact_at: now,
            converted_at: None,
            rejected_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record_contact(&mut self, now: DateTime<Utc>) {
        self.contact_count = self.contact_count.saturating_add(1);
        self.last_contact_at = now;
        self.updated_at = now;
    }

    pub fn set_label(&mut self, label: LeadLabel, now: DateTime<Utc>) {
        self.label = label;
        self.updated_at = now;
    }

    pub fn set_stage(&mut self, stage: LeadStage, reason: Option<String>, now: DateTime<Utc>) {
        self.stage = stage;
        match stage {
            LeadStage::Confirmed => {
                self.label = LeadLabel::Converted;
                self.converted_at = Some(now);
            }
            LeadStage::Rejected => {
                self.label = LeadLabel::Lost;
                self.rejected_at = Some(now);
                self.rejection_reason = reason;
            }
            _ => {}
        }
        self.updated_at = now;
    }

    /// Append-only; earlier notes are never touched.
    pub fn append_note(
        &mut self,
        author: &UserId,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<(), MarketplaceError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(MarketplaceError::Validation(
                "note body cannot be empty".to_string(),
            ));
        }
        self.notes.push(LeadNote {
            body: body.to_string(),
            author: author.clone(),
            created_at: now,
        });
        self.last_contact_at = now;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::domain::PropertyId;
    use crate::marketplace::tests::common::{later, timestamp};

    fn lead() -> Lead {
        Lead::open(
            LeadKey {
                owner: UserId("owner-1".to_string()),
                tenant: UserId("tenant-1".to_string()),
                property: PropertyId("prop-1".to_string()),
            },
            timestamp(),
        )
    }

    #[test]
    fn open_starts_as_warm_enquiry() {
        let lead = lead();
        assert_eq!(lead.stage, LeadStage::Enquiry);
        assert_eq!(lead.label, LeadLabel::Warm);
        assert_eq!(lead.contact_count, 1);
        assert!(lead.notes.is_empty());
    }

    #[test]
    fn any_label_can_follow_any_label() {
        let mut lead = lead();
        lead.set_label(LeadLabel::Converted, timestamp());
        lead.set_label(LeadLabel::Cold, timestamp());
        lead.set_label(LeadLabel::Hot, timestamp());
        assert_eq!(lead.label, LeadLabel::Hot);
        assert_eq!(lead.stage, LeadStage::Enquiry);
    }

    #[test]
    fn confirmed_stage_forces_converted_label() {
        let mut lead = lead();
        lead.set_label(LeadLabel::Cold, timestamp());
        lead.set_stage(LeadStage::Confirmed, None, later(5));
        assert_eq!(lead.label, LeadLabel::Converted);
        assert_eq!(lead.converted_at, Some(later(5)));
    }

    #[test]
    fn rejected_stage_forces_lost_label_and_reason() {
        let mut lead = lead();
        lead.set_stage(
            LeadStage::Rejected,
            Some("budget mismatch".to_string()),
            later(2),
        );
        assert_eq!(lead.label, LeadLabel::Lost);
        assert_eq!(lead.rejected_at, Some(later(2)));
        assert_eq!(lead.rejection_reason.as_deref(), Some("budget mismatch"));
    }

    #[test]
    fn intermediate_stages_keep_the_label() {
        let mut lead = lead();
        lead.set_label(LeadLabel::Hot, timestamp());
        lead.set_stage(LeadStage::ViewingScheduled, None, later(1));
        assert_eq!(lead.label, LeadLabel::Hot);
        assert_eq!(lead.converted_at, None);
    }

    #[test]
    fn notes_append_and_refresh_last_contact() {
        let mut lead = lead();
        let author = UserId("owner-1".to_string());
        lead.append_note(&author, "called, viewing on friday", later(1))
            .expect("note appended");
        lead.append_note(&author, "  viewing done  ", later(3))
            .expect("note appended");

        assert_eq!(lead.notes.len(), 2);
        assert_eq!(lead.notes[0].body, "called, viewing on friday");
        assert_eq!(lead.notes[1].body, "viewing done");
        assert_eq!(lead.last_contact_at, later(3));
    }

    #[test]
    fn blank_notes_are_rejected() {
        let mut lead = lead();
        let result = lead.append_note(&UserId("owner-1".to_string()), "   ", later(1));
        assert!(matches!(result, Err(MarketplaceError::Validation(_))));
        assert!(lead.notes.is_empty());
    }
}
