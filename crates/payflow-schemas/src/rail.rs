use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::money::Paise;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RailType {
    Instant,
    Realtime,
    Batch,
    Intrabank,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub weekdays: Vec<Weekday>,
}

impl WorkingHours {
    /// Admits the overnight case (`start > end`): a time is inside the
    /// window if it is `>= start` OR `<= end`.
    pub fn admits(&self, weekday: Weekday, time: NaiveTime) -> bool {
        if !self.weekdays.contains(&weekday) {
            return false;
        }
        if self.start <= self.end {
            time >= self.start && time <= self.end
        } else {
            time >= self.start || time <= self.end
        }
    }
}

/// Static + dynamic per-rail configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RailConfig {
    pub rail_name: String,
    pub rail_type: RailType,
    pub min_amount: Paise,
    pub max_amount: Paise,
    pub new_user_limit: Paise,
    pub working_hours: WorkingHours,
    pub avg_eta_ms: u32,
    pub cost_bps: u32,
    pub success_probability: f64,
    pub settlement_type: String,
    pub settlement_certainty: f64,
    pub daily_limit: Paise,
    pub daily_limit_remaining: Paise,
    pub is_active: bool,
}

/// Append-only; source for rolling statistics used by `critic_penalty_decay`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RailPerformance {
    pub rail_name: String,
    pub line_id: String,
    pub attempt_no: u32,
    pub actual_eta_ms: u32,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub initiated_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}
