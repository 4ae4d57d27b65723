//! Reference store keeping every collection behind one mutex.
//!
//! A single lock makes [`WriteBatch`] application and receipt sequence allocation atomic
//! without any further coordination.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    DealReceipt, Lead, LeadId, LeadKey, Property, PropertyId, ReceiptStatus,
};
use super::receipts::ReceiptId;
use super::repository::{
    LeadFilter, MarketplaceStore, PropertyFilter, ReceiptFilter, RepositoryError, Visibility,
    WriteBatch,
};

#[derive(Debug, Default)]
struct StoreState {
    properties: HashMap<PropertyId, Property>,
    leads: HashMap<LeadId, Lead>,
    lead_index: HashMap<LeadKey, LeadId>,
    receipts: BTreeMap<ReceiptId, DealReceipt>,
    sequences: HashMap<i32, u32>,
}

impl StoreState {
    fn check_properties(&self, properties: &[Property]) -> Result<(), RepositoryError> {
        for property in properties {
            let stored = self
                .properties
                .get(&property.id)
                .ok_or_else(|| RepositoryError::NotFound {
                    entity: "property",
                    id: property.id.0.clone(),
                })?;
            if stored.version != property.version {
                return Err(RepositoryError::StaleWrite {
                    entity: "property",
                    id: property.id.0.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_leads(&self, leads: &[Lead]) -> Result<(), RepositoryError> {
        let mut seen = HashSet::new();
        for lead in leads {
            let key = lead.key();
            if !seen.insert(key.clone()) {
                return Err(RepositoryError::Conflict(format!(
                    "batch writes lead {} twice",
                    lead.id
                )));
            }
            if let Some(existing) = self.leads.get(&lead.id) {
                if existing.key() != key {
                    return Err(RepositoryError::Conflict(format!(
                        "lead {} cannot be moved to another owner, tenant, or property",
                        lead.id
                    )));
                }
            }
            if let Some(indexed) = self.lead_index.get(&key) {
                if indexed != &lead.id {
                    return Err(RepositoryError::Conflict(format!(
                        "a lead already exists for tenant {} on property {}",
                        key.tenant, key.property
                    )));
                }
            }
        }
        Ok(())
    }

    /// At most one confirmed receipt per property once the batch is applied.
    fn check_receipts(&self, receipts: &[DealReceipt]) -> Result<(), RepositoryError> {
        let incoming: HashMap<&ReceiptId, &DealReceipt> = receipts
            .iter()
            .map(|receipt| (&receipt.receipt_id, receipt))
            .collect();
        if incoming.len() != receipts.len() {
            return Err(RepositoryError::Conflict(
                "batch writes the same receipt twice".to_string(),
            ));
        }

        let touched: HashSet<&PropertyId> = receipts
            .iter()
            .filter(|receipt| receipt.status == ReceiptStatus::Confirmed)
            .map(|receipt| &receipt.property_id)
            .collect();

        for property in touched {
            let stored = self
                .receipts
                .values()
                .filter(|receipt| !incoming.contains_key(&receipt.receipt_id));
            let confirmed = stored
                .chain(incoming.values().copied())
                .filter(|receipt| {
                    &receipt.property_id == property && receipt.status == ReceiptStatus::Confirmed
                })
                .count();
            if confirmed > 1 {
                return Err(RepositoryError::Conflict(format!(
                    "property {property} already has a confirmed deal receipt"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryMarketplaceStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryMarketplaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl MarketplaceStore for InMemoryMarketplaceStore {
    fn insert_property(&self, property: Property) -> Result<Property, RepositoryError> {
        let mut state = self.state()?;
        if state.properties.contains_key(&property.id) {
            return Err(RepositoryError::Conflict(format!(
                "property {} already exists",
                property.id
            )));
        }
        state.properties.insert(property.id.clone(), property.clone());
        Ok(property)
    }

    fn fetch_property(
        &self,
        id: &PropertyId,
        visibility: Visibility,
    ) -> Result<Option<Property>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .properties
            .get(id)
            .filter(|property| visibility.admits(property))
            .cloned())
    }

    fn search_properties(&self, filter: &PropertyFilter) -> Result<Vec<Property>, RepositoryError> {
        let state = self.state()?;
        let mut matches: Vec<Property> = state
            .properties
            .values()
            .filter(|property| filter.matches(property))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(matches)
    }

    fn fetch_lead(&self, id: &LeadId) -> Result<Option<Lead>, RepositoryError> {
        Ok(self.state()?.leads.get(id).cloned())
    }

    fn find_lead(&self, key: &LeadKey) -> Result<Option<Lead>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .lead_index
            .get(key)
            .and_then(|id| state.leads.get(id))
            .cloned())
    }

    fn search_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, RepositoryError> {
        let state = self.state()?;
        let mut matches: Vec<Lead> = state
            .leads
            .values()
            .filter(|lead| filter.matches(lead))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.last_contact_at
                .cmp(&a.last_contact_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matches)
    }

    fn fetch_receipt(&self, id: &ReceiptId) -> Result<Option<DealReceipt>, RepositoryError> {
        Ok(self.state()?.receipts.get(id).cloned())
    }

    fn confirmed_receipt_for(
        &self,
        property: &PropertyId,
    ) -> Result<Option<DealReceipt>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .receipts
            .values()
            .find(|receipt| {
                &receipt.property_id == property && receipt.status == ReceiptStatus::Confirmed
            })
            .cloned())
    }

    fn search_receipts(
        &self,
        filter: &ReceiptFilter,
    ) -> Result<Vec<DealReceipt>, RepositoryError> {
        let state = self.state()?;
        let mut matches: Vec<DealReceipt> = state
            .receipts
            .values()
            .filter(|receipt| filter.matches(receipt))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.confirmed_at
                .cmp(&a.confirmed_at)
                .then_with(|| b.receipt_id.cmp(&a.receipt_id))
        });
        Ok(matches)
    }

    fn next_receipt_sequence(&self, year: i32) -> Result<u32, RepositoryError> {
        let mut state = self.state()?;
        let counter = state.sequences.entry(year).or_insert(0);
        *counter = counter.checked_add(1).ok_or_else(|| {
            RepositoryError::Unavailable(format!("receipt sequence exhausted for {year}"))
        })?;
        Ok(*counter)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.check_properties(batch.properties())?;
        state.check_leads(batch.leads())?;
        state.check_receipts(batch.receipts())?;

        let (properties, leads, receipts) = batch.into_parts();
        for mut property in properties {
            property.version += 1;
            state.properties.insert(property.id.clone(), property);
        }
        for lead in leads {
            state.lead_index.insert(lead.key(), lead.id.clone());
            state.leads.insert(lead.id.clone(), lead);
        }
        for receipt in receipts {
            state.receipts.insert(receipt.receipt_id.clone(), receipt);
        }
        Ok(())
    }
}
