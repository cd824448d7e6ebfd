//! Location registry - last known record per client.
//!
//! Merge rule: a record replaces the stored one only when its observed time
//! is strictly greater. Applying the same set of updates in any order
//! leaves the same registry, which is what lets the herd converge.

use std::collections::HashMap;

use herd_protocol::AtLine;

/// A client's last known location as held by this node.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub client_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Client-supplied POSIX seconds, not receive time
    pub observed_time: f64,
    /// The AT line this node produced when it accepted the record
    pub formatted_line: String,
}

impl LocationRecord {
    /// Record for an AT line produced by this node.
    pub fn from_at(at: &AtLine) -> Self {
        let obs = &at.observation;
        Self {
            client_id: obs.client_id.clone(),
            latitude: obs.position.latitude,
            longitude: obs.position.longitude,
            observed_time: obs.time.seconds(),
            formatted_line: at.to_string(),
        }
    }
}

/// In-memory registry, one per node.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    records: HashMap<String, LocationRecord>,
}

impl LocationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare-and-update.
    ///
    /// Returns true if the record was stored, false if it was stale or a
    /// duplicate and the registry is unchanged.
    pub fn upsert(&mut self, record: LocationRecord) -> bool {
        match self.records.get_mut(&record.client_id) {
            Some(existing) if record.observed_time > existing.observed_time => {
                *existing = record;
                true
            }
            Some(_) => false,
            None => {
                self.records.insert(record.client_id.clone(), record);
                true
            }
        }
    }

    /// Last known record for a client.
    pub fn lookup(&self, client_id: &str) -> Option<&LocationRecord> {
        self.records.get(client_id)
    }

    /// Number of clients with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(client: &str, time: f64, line: &str) -> LocationRecord {
        LocationRecord {
            client_id: client.to_string(),
            latitude: 34.0,
            longitude: -118.0,
            observed_time: time,
            formatted_line: line.to_string(),
        }
    }

    #[test]
    fn first_record_is_applied() {
        let mut reg = LocationRegistry::new();
        assert!(reg.upsert(record("kiwi", 100.0, "a")));
        assert_eq!(reg.lookup("kiwi").unwrap().formatted_line, "a");
    }

    #[test]
    fn newer_record_replaces() {
        let mut reg = LocationRegistry::new();
        reg.upsert(record("kiwi", 100.0, "old"));
        assert!(reg.upsert(record("kiwi", 200.0, "new")));
        assert_eq!(reg.lookup("kiwi").unwrap().formatted_line, "new");
    }

    #[test]
    fn equal_time_is_not_applied() {
        let mut reg = LocationRegistry::new();
        reg.upsert(record("kiwi", 100.0, "first"));
        assert!(!reg.upsert(record("kiwi", 100.0, "second")));
        assert_eq!(reg.lookup("kiwi").unwrap().formatted_line, "first");
    }

    #[test]
    fn older_record_is_not_applied() {
        let mut reg = LocationRegistry::new();
        reg.upsert(record("kiwi", 200.0, "new"));
        assert!(!reg.upsert(record("kiwi", 100.0, "old")));
        assert_eq!(reg.lookup("kiwi").unwrap().observed_time, 200.0);
    }

    #[test]
    fn clients_are_independent() {
        let mut reg = LocationRegistry::new();
        reg.upsert(record("kiwi", 200.0, "k"));
        assert!(reg.upsert(record("lemon", 100.0, "l")));
        assert_eq!(reg.len(), 2);
        assert!(reg.lookup("mango").is_none());
    }

    proptest! {
        /// Any delivery order leaves the newest record in place.
        #[test]
        fn merge_is_order_independent(
            (times, shuffled) in proptest::collection::vec(0u32..50, 1..20)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
        ) {
            let mut in_order = LocationRegistry::new();
            let mut out_of_order = LocationRegistry::new();
            for &t in &times {
                in_order.upsert(record("kiwi", f64::from(t), &format!("t{t}")));
            }
            for &t in &shuffled {
                out_of_order.upsert(record("kiwi", f64::from(t), &format!("t{t}")));
            }

            let max = *times.iter().max().unwrap();
            prop_assert_eq!(in_order.lookup("kiwi").unwrap().observed_time, f64::from(max));
            prop_assert_eq!(in_order.lookup("kiwi"), out_of_order.lookup("kiwi"));
        }

        #[test]
        fn two_updates_either_order(t1 in 0u32..1000, t2 in 0u32..1000) {
            prop_assume!(t1 < t2);
            let a = record("kiwi", f64::from(t1), "t1");
            let b = record("kiwi", f64::from(t2), "t2");

            let mut forward = LocationRegistry::new();
            forward.upsert(a.clone());
            forward.upsert(b.clone());

            let mut backward = LocationRegistry::new();
            backward.upsert(b);
            backward.upsert(a);

            prop_assert_eq!(forward.lookup("kiwi").unwrap().formatted_line.as_str(), "t2");
            prop_assert_eq!(backward.lookup("kiwi").unwrap().formatted_line.as_str(), "t2");
        }
    }
}
