//! Per-rail daily-limit bookkeeping, serialized the same way
//! `payflow_audit::BatchAuditRegistry` serializes per-batch writers: one
//! `tokio::sync::Mutex` per rail name so concurrent lines never race the same
//! rail's `daily_limit_remaining` debit.

use std::collections::HashMap;
use std::sync::Arc;

use payflow_schemas::{Paise, RailConfig};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct RailRegistry {
    rails: Arc<Mutex<HashMap<String, RailConfig>>>,
}

impl RailRegistry {
    pub fn new(rails: Vec<RailConfig>) -> Self {
        let map = rails.into_iter().map(|r| (r.rail_name.clone(), r)).collect();
        Self {
            rails: Arc::new(Mutex::new(map)),
        }
    }

    pub async fn snapshot(&self) -> Vec<RailConfig> {
        self.rails.lock().await.values().cloned().collect()
    }

    pub async fn get(&self, rail_name: &str) -> Option<RailConfig> {
        self.rails.lock().await.get(rail_name).cloned()
    }

    /// Debit `amount` from `rail_name`'s remaining daily limit. Must only be
    /// called after a rail execution has been verified successful; a failed
    /// or in-flight attempt must never touch `daily_limit_remaining`.
    pub async fn debit(&self, rail_name: &str, amount: Paise) -> Result<(), String> {
        let mut rails = self.rails.lock().await;
        let rail = rails
            .get_mut(rail_name)
            .ok_or_else(|| format!("unknown rail {rail_name}"))?;
        if rail.daily_limit_remaining < amount {
            return Err(format!("insufficient daily limit remaining for {rail_name}"));
        }
        rail.daily_limit_remaining = rail.daily_limit_remaining - amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use payflow_schemas::{RailType, WorkingHours};

    fn rail(name: &str, remaining: f64) -> RailConfig {
        RailConfig {
            rail_name: name.to_string(),
            rail_type: RailType::Instant,
            min_amount: Paise::ZERO,
            max_amount: Paise::from_rupees(1_000_000.0),
            new_user_limit: Paise::from_rupees(10_000.0),
            working_hours: WorkingHours {
                start: NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                weekdays: vec![Weekday::Mon],
            },
            avg_eta_ms: 1000,
            cost_bps: 0,
            success_probability: 0.9,
            settlement_type: "INSTANT".to_string(),
            settlement_certainty: 0.9,
            daily_limit: Paise::from_rupees(remaining),
            daily_limit_remaining: Paise::from_rupees(remaining),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn debit_reduces_remaining() {
        let reg = RailRegistry::new(vec![rail("UPI", 100.0)]);
        reg.debit("UPI", Paise::from_rupees(40.0)).await.unwrap();
        let r = reg.get("UPI").await.unwrap();
        assert_eq!(r.daily_limit_remaining, Paise::from_rupees(60.0));
    }

    #[tokio::test]
    async fn debit_beyond_remaining_is_rejected() {
        let reg = RailRegistry::new(vec![rail("UPI", 10.0)]);
        let err = reg.debit("UPI", Paise::from_rupees(40.0)).await.unwrap_err();
        assert!(err.contains("insufficient"));
    }
}
