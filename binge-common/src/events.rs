//! Behavioral event model
//!
//! Every user interaction that feeds recommendations or experiments is
//! recorded as a `BehaviorEvent`. Experiment-only events (variant views,
//! conversions) use a `content_id` of 0 and carry the experiment tags in
//! the contextual data bag.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the user did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorAction {
    Viewed,
    Completed,
    Clicked,
    Rated,
    Abandoned,
}

impl BehaviorAction {
    /// Stable database representation, matches the CHECK constraint on
    /// `behavior_events.action`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorAction::Viewed => "viewed",
            BehaviorAction::Completed => "completed",
            BehaviorAction::Clicked => "clicked",
            BehaviorAction::Rated => "rated",
            BehaviorAction::Abandoned => "abandoned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "viewed" => Some(BehaviorAction::Viewed),
            "completed" => Some(BehaviorAction::Completed),
            "clicked" => Some(BehaviorAction::Clicked),
            "rated" => Some(BehaviorAction::Rated),
            "abandoned" => Some(BehaviorAction::Abandoned),
            _ => None,
        }
    }
}

/// Coarse time-of-day bucket used for contextual tagging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Bucket an hour (0-23): night [0,6), morning [6,12),
    /// afternoon [12,18), evening [18,24).
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "night",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
        }
    }
}

/// Full weekday name, as recorded in the contextual data bag
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Contextual tags attached to a behavioral event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    /// Experiment this event belongs to, if any
    pub experiment: Option<String>,
    /// Variant the user was assigned to
    pub variant: Option<String>,
    /// Target metric for conversion events
    pub metric: Option<String>,
    pub device: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<TimeOfDay>,
    pub day_of_week: Option<String>,
}

/// A recorded user behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorEvent {
    pub guid: Uuid,
    pub user_id: String,
    /// Content the behavior refers to; 0 for experiment-only events
    pub content_id: i64,
    pub action: BehaviorAction,
    /// Numeric payload: star rating for `Rated`, metric value for
    /// experiment conversions
    pub rating: Option<f64>,
    pub context: EventContext,
    pub occurred_at: DateTime<Utc>,
}

impl BehaviorEvent {
    /// Variant-view event emitted when a user is first assigned to an
    /// experiment variant.
    pub fn experiment_view(
        user_id: &str,
        experiment: &str,
        variant: &str,
        device: Option<String>,
        location: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            user_id: user_id.to_string(),
            content_id: 0,
            action: BehaviorAction::Viewed,
            rating: None,
            context: EventContext {
                experiment: Some(experiment.to_string()),
                variant: Some(variant.to_string()),
                metric: None,
                device,
                location,
                time_of_day: Some(TimeOfDay::from_hour(at.hour())),
                day_of_week: Some(weekday_name(at.weekday()).to_string()),
            },
            occurred_at: at,
        }
    }

    /// Conversion event for a target metric, attributed to the user's
    /// assigned variant. The metric value travels in the rating field.
    pub fn experiment_conversion(
        user_id: &str,
        experiment: &str,
        variant: &str,
        metric: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            user_id: user_id.to_string(),
            content_id: 0,
            action: BehaviorAction::Completed,
            rating: Some(value),
            context: EventContext {
                experiment: Some(experiment.to_string()),
                variant: Some(variant.to_string()),
                metric: Some(metric.to_string()),
                device: None,
                location: None,
                time_of_day: Some(TimeOfDay::from_hour(at.hour())),
                day_of_week: Some(weekday_name(at.weekday()).to_string()),
            },
            occurred_at: at,
        }
    }
}
