//! Listing status state machine.
//!
//! The transition table is the only source of truth for which status changes an owner may
//! request. Deal confirmation and cancellation move listings in and out of `rented` through
//! the workflow in [`super::service`], which applies the same invariants.

use chrono::{DateTime, Utc};

use super::domain::{Caller, Property, PropertyStatus};
use super::error::MarketplaceError;

/// Statuses reachable from `from` in a single step.
pub const fn allowed_transitions(from: PropertyStatus) -> &'static [PropertyStatus] {
    use PropertyStatus::*;
    match from {
        Available => &[InDiscussion, Archived],
        InDiscussion => &[Approved, Available, Archived],
        Approved => &[Rented, InDiscussion, Archived],
        Rented => &[],
        Archived => &[Available],
    }
}

pub fn can_transition(from: PropertyStatus, to: PropertyStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Validate and apply an owner-requested status change in place.
///
/// On error the property is left untouched.
pub fn transition(
    caller: &Caller,
    property: &mut Property,
    target: PropertyStatus,
    now: DateTime<Utc>,
) -> Result<(), MarketplaceError> {
    if !property.is_owned_by(&caller.user_id) {
        return Err(MarketplaceError::Forbidden(format!(
            "only the owner can change the status of property {}",
            property.id
        )));
    }

    let from = property.status;
    if !can_transition(from, target) {
        return Err(MarketplaceError::InvalidTransition { from, to: target });
    }

    if target == PropertyStatus::Rented && property.confirmed_tenant.is_none() {
        return Err(MarketplaceError::InvalidState(format!(
            "property {} has no confirmed tenant; confirm a deal to mark it rented",
            property.id
        )));
    }

    property.status = target;
    match target {
        PropertyStatus::Archived => {
            property.archived_at = Some(now);
            property.available = false;
        }
        PropertyStatus::Available => {
            property.archived_at = None;
            property.available = true;
        }
        PropertyStatus::Rented => {
            property.available = false;
        }
        PropertyStatus::InDiscussion | PropertyStatus::Approved => {}
    }
    property.updated_at = now;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::tests::common::{owner, property_with_status, timestamp};

    #[test]
    fn table_matches_documented_transitions() {
        use PropertyStatus::*;
        let expected = [
            (Available, vec![InDiscussion, Archived]),
            (InDiscussion, vec![Approved, Available, Archived]),
            (Approved, vec![Rented, InDiscussion, Archived]),
            (Rented, vec![]),
            (Archived, vec![Available]),
        ];
        for (from, targets) in expected {
            for to in PropertyStatus::ALL {
                assert_eq!(
                    can_transition(from, to),
                    targets.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn every_disallowed_transition_leaves_property_unchanged() {
        for from in PropertyStatus::ALL {
            for to in PropertyStatus::ALL {
                if can_transition(from, to) {
                    continue;
                }
                let mut property = property_with_status(from);
                let before = property.clone();
                let result = transition(&owner(), &mut property, to, timestamp());
                assert!(
                    matches!(result, Err(MarketplaceError::InvalidTransition { .. })),
                    "{from} -> {to} should be rejected, got {result:?}"
                );
                assert_eq!(property, before);
            }
        }
    }

    #[test]
    fn archiving_clears_availability_and_stamps_time() {
        let mut property = property_with_status(PropertyStatus::InDiscussion);
        transition(&owner(), &mut property, PropertyStatus::Archived, timestamp())
            .expect("archive allowed");
        assert_eq!(property.status, PropertyStatus::Archived);
        assert!(!property.available);
        assert_eq!(property.archived_at, Some(timestamp()));
    }

    #[test]
    fn reopening_an_archived_listing_restores_availability() {
        let mut property = property_with_status(PropertyStatus::Archived);
        property.archived_at = Some(timestamp());
        property.available = false;

        transition(&owner(), &mut property, PropertyStatus::Available, timestamp())
            .expect("reopen allowed");
        assert!(property.available);
        assert_eq!(property.archived_at, None);
    }

    #[test]
    fn non_owner_is_forbidden() {
        let mut property = property_with_status(PropertyStatus::Available);
        let stranger = Caller::owner("owner-someone-else");
        let result = transition(
            &stranger,
            &mut property,
            PropertyStatus::InDiscussion,
            timestamp(),
        );
        assert!(matches!(result, Err(MarketplaceError::Forbidden(_))));
        assert_eq!(property.status, PropertyStatus::Available);
    }

    #[test]
    fn manual_rent_without_tenant_is_rejected() {
        let mut property = property_with_status(PropertyStatus::Approved);
        let result = transition(&owner(), &mut property, PropertyStatus::Rented, timestamp());
        assert!(matches!(result, Err(MarketplaceError::InvalidState(_))));
        assert_eq!(property.status, PropertyStatus::Approved);
    }

    #[test]
    fn archived_to_rented_is_not_a_transition() {
        let mut property = property_with_status(PropertyStatus::Archived);
        match transition(&owner(), &mut property, PropertyStatus::Rented, timestamp()) {
            Err(MarketplaceError::InvalidTransition { from, to }) => {
                assert_eq!(from, PropertyStatus::Archived);
                assert_eq!(to, PropertyStatus::Rented);
            }
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }
}
