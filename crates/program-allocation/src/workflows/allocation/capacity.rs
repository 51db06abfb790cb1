use std::collections::BTreeMap;

use super::domain::{Offering, OfferingId};

/// Remaining seats per offering for the duration of one allocation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapacityTracker {
    remaining: BTreeMap<OfferingId, u32>,
}

impl CapacityTracker {
    pub fn from_offerings(offerings: &[Offering]) -> Self {
        let remaining = offerings
            .iter()
            .map(|offering| (offering.id, offering.capacity))
            .collect();
        Self { remaining }
    }

    /// Seats left in `offering`. Unknown offerings have none.
    pub fn remaining(&self, offering: OfferingId) -> u32 {
        self.remaining.get(&offering).copied().unwrap_or(0)
    }

    /// Take one seat if any is left.
    pub fn try_claim(&mut self, offering: OfferingId) -> bool {
        match self.remaining.get_mut(&offering) {
            Some(seats) if *seats > 0 => {
                *seats -= 1;
                true
            }
            _ => false,
        }
    }

    pub fn into_remaining(self) -> BTreeMap<OfferingId, u32> {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn offering(id: u64, capacity: u32) -> Offering {
        Offering {
            id: OfferingId(id),
            name: format!("Program {id}"),
            category: "career".to_string(),
            capacity,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn claims_until_exhausted() {
        let mut tracker = CapacityTracker::from_offerings(&[offering(1, 2)]);
        assert!(tracker.try_claim(OfferingId(1)));
        assert!(tracker.try_claim(OfferingId(1)));
        assert!(!tracker.try_claim(OfferingId(1)));
        assert_eq!(tracker.remaining(OfferingId(1)), 0);
    }

    #[test]
    fn zero_capacity_and_unknown_offerings_never_claim() {
        let mut tracker = CapacityTracker::from_offerings(&[offering(1, 0)]);
        assert!(!tracker.try_claim(OfferingId(1)));
        assert!(!tracker.try_claim(OfferingId(99)));
        assert_eq!(tracker.into_remaining().get(&OfferingId(1)), Some(&0));
    }
}
