//! Event model and its closed taxonomy
//!
//! `DurationType`, `EventCategory` and `Impact` are the only representation
//! used by the rest of the crate. Their string forms exist for JSON documents,
//! SQL columns and query strings; parsing anything outside the closed set is a
//! validation error.

use super::{deserialize_nullable, require_non_empty, validate_symbol};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_LEVEL: i32 = 1;
pub const MAX_LEVEL: i32 = 5;

/// Reject a level outside 1-5
pub fn validate_level(field: &str, level: i32) -> Result<()> {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            field, MIN_LEVEL, MAX_LEVEL, level
        )));
    }
    Ok(())
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!(
                        "invalid {} {:?}, expected one of: {}",
                        $label,
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

string_enum!(
    /// How long an event keeps affecting the stock
    DurationType, "duration_type" {
        Continuous => "continuous",
        Temporary => "temporary",
        Sudden => "sudden",
    }
);

string_enum!(
    /// What kind of news the event is
    EventCategory, "category" {
        Company => "company",
        Industry => "industry",
        Macroeconomic => "macroeconomic",
        MarketSentiment => "market_sentiment",
    }
);

string_enum!(
    /// Assessed direction of the event's effect on the stock
    Impact, "impact" {
        Positive => "positive",
        Negative => "negative",
        Neutral => "neutral",
    }
);

/// Event model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub level: i32,
    pub stock_symbol: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    pub duration_type: DurationType,
    pub category: EventCategory,
    /// `None` means "not assessed", distinct from `Neutral`
    pub impact: Option<Impact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Field-level and cross-field invariants of a stored event
    pub fn validate(&self) -> Result<()> {
        require_non_empty("title", &self.title)?;
        validate_level("level", self.level)?;
        validate_symbol(&self.stock_symbol)?;
        validate_time_span(self.start_time, self.end_time)
    }
}

fn validate_time_span(start_time: i64, end_time: Option<i64>) -> Result<()> {
    match end_time {
        Some(end) if end < start_time => Err(AppError::Validation(format!(
            "end_time ({}) must not be before start_time ({})",
            end, start_time
        ))),
        _ => Ok(()),
    }
}

/// Create request for an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventCreate {
    pub title: String,
    pub description: String,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub level: i32,
    pub stock_symbol: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    pub duration_type: DurationType,
    pub category: EventCategory,
    #[serde(default)]
    pub impact: Option<Impact>,
}

impl EventCreate {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("title", &self.title)?;
        validate_level("level", self.level)?;
        validate_symbol(&self.stock_symbol)?;
        validate_time_span(self.start_time, self.end_time)
    }

    /// Build the stored entity with a fresh id
    pub fn into_event(self, now: DateTime<Utc>) -> Event {
        Event {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            level: self.level,
            stock_symbol: self.stock_symbol,
            sources: self.sources,
            urls: self.urls,
            duration_type: self.duration_type,
            category: self.category,
            impact: self.impact,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update request for an event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub end_time: Option<Option<i64>>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub stock_symbol: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
    #[serde(default)]
    pub duration_type: Option<DurationType>,
    #[serde(default)]
    pub category: Option<EventCategory>,
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub impact: Option<Option<Impact>>,
}

impl EventUpdate {
    /// Checks that need no stored state; the merged event is checked again
    /// by [`EventUpdate::apply_to`].
    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            require_non_empty("title", title)?;
        }
        if let Some(level) = self.level {
            validate_level("level", level)?;
        }
        if let Some(symbol) = &self.stock_symbol {
            validate_symbol(symbol)?;
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time) {
            validate_time_span(start, end)?;
        }
        Ok(())
    }

    /// Merge supplied fields into a copy of `event`.
    ///
    /// Fails without touching `event` when the merged result breaks an
    /// invariant (e.g. a new `start_time` after the stored `end_time`).
    pub fn apply_to(&self, event: &Event, now: DateTime<Utc>) -> Result<Event> {
        let mut merged = event.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(description) = &self.description {
            merged.description = description.clone();
        }
        if let Some(start_time) = self.start_time {
            merged.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            merged.end_time = end_time;
        }
        if let Some(level) = self.level {
            merged.level = level;
        }
        if let Some(symbol) = &self.stock_symbol {
            merged.stock_symbol = symbol.clone();
        }
        if let Some(sources) = &self.sources {
            merged.sources = sources.clone();
        }
        if let Some(urls) = &self.urls {
            merged.urls = urls.clone();
        }
        if let Some(duration_type) = self.duration_type {
            merged.duration_type = duration_type;
        }
        if let Some(category) = self.category {
            merged.category = category;
        }
        if let Some(impact) = self.impact {
            merged.impact = impact;
        }
        merged.validate()?;
        merged.updated_at = now;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EventCreate {
        EventCreate {
            title: "X".to_string(),
            description: "Y".to_string(),
            start_time: 1000,
            end_time: None,
            level: 3,
            stock_symbol: "TST".to_string(),
            sources: vec![],
            urls: vec![],
            duration_type: DurationType::Sudden,
            category: EventCategory::Company,
            impact: None,
        }
    }

    #[test]
    fn test_enum_string_round_trip() {
        for d in DurationType::ALL {
            assert_eq!(d.as_str().parse::<DurationType>().unwrap(), *d);
        }
        assert_eq!(
            "market_sentiment".parse::<EventCategory>().unwrap(),
            EventCategory::MarketSentiment
        );
        assert!(matches!(
            "bullish".parse::<Impact>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_enum_rejected_in_json() {
        let body = r#"{"title":"X","description":"Y","start_time":1,"level":3,
            "stock_symbol":"TST","duration_type":"forever","category":"company"}"#;
        assert!(serde_json::from_str::<EventCreate>(body).is_err());
    }

    #[test]
    fn test_level_bounds() {
        let mut input = sample();
        for level in [0, 6, -1] {
            input.level = level;
            assert!(matches!(input.validate(), Err(AppError::Validation(_))));
        }
        input.level = 5;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_end_time_before_start_rejected() {
        let mut input = sample();
        input.end_time = Some(999);
        assert!(input.validate().is_err());
        input.end_time = Some(1000);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_into_event_sets_generated_fields() {
        let now = Utc::now();
        let event = sample().into_event(now);
        assert!(!event.id.is_empty());
        assert_eq!(event.created_at, now);
        assert_eq!(event.updated_at, now);
        assert_eq!(event.impact, None);
    }

    #[test]
    fn test_apply_update_merges_and_revalidates() {
        let created = Utc::now();
        let mut input = sample();
        input.end_time = Some(2000);
        input.impact = Some(Impact::Positive);
        let event = input.into_event(created);

        let update: EventUpdate = serde_json::from_str(r#"{"impact": null, "level": 4}"#).unwrap();
        let later = created + chrono::Duration::seconds(5);
        let merged = update.apply_to(&event, later).unwrap();
        assert_eq!(merged.impact, None);
        assert_eq!(merged.level, 4);
        assert_eq!(merged.end_time, Some(2000));
        assert_eq!(merged.updated_at, later);
        assert_eq!(merged.created_at, created);

        let bad = EventUpdate {
            start_time: Some(3000),
            ..Default::default()
        };
        assert!(matches!(
            bad.apply_to(&event, later),
            Err(AppError::Validation(_))
        ));
    }
}
