//! Calendar aggregate model.
//!
//! # Responsibility
//! - Define the calendar root and its four owned child collections.
//! - Define the write payload, where each child collection is optional.
//!
//! # Invariants
//! - Children have no lifecycle outside their calendar.
//! - `Month::order` and `Weekday::order` are dense, 1-based and derived from
//!   payload position by the writer.
//! - `WeekStructure::week_number` is persisted exactly as supplied.

use crate::model::principal::PrincipalId;
use crate::model::resource::{ResourceId, ValidationError};
use crate::policy::visibility::Ownable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Child row identifier. Regenerated on every full replace.
pub type ChildId = Uuid;

/// Scalar fields of a calendar root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub hours_per_day: i64,
    pub minutes_per_hour: i64,
    pub daylight_hours: f64,
    pub night_hours: f64,
    pub dawn_dusk_hours: f64,
    pub days_per_year: i64,
    #[serde(default)]
    pub has_leap_year: bool,
    #[serde(default)]
    pub leap_year_frequency: Option<i64>,
    #[serde(default)]
    pub leap_year_exceptions: Option<String>,
    #[serde(default)]
    pub leap_days_added: Option<i64>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub is_published: bool,
}

impl CalendarFields {
    /// Checks root invariants the schema would otherwise reject opaquely.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        for (field, value) in [
            ("hoursPerDay", self.hours_per_day),
            ("minutesPerHour", self.minutes_per_hour),
            ("daysPerYear", self.days_per_year),
        ] {
            if value <= 0 {
                return Err(ValidationError::NonPositive { field, value });
            }
        }
        Ok(())
    }
}

/// Calendar root row plus ownership metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calendar {
    pub id: ResourceId,
    pub owner_id: PrincipalId,
    #[serde(flatten)]
    pub fields: CalendarFields,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Ownable for Calendar {
    fn owner_id(&self) -> &str {
        self.owner_id.as_str()
    }

    fn is_free(&self) -> bool {
        self.fields.is_free
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weekday {
    pub id: ChildId,
    pub name: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStructure {
    pub id: ChildId,
    pub week_number: i64,
    pub days_in_week: i64,
    pub repeat_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Month {
    pub id: ChildId,
    pub name: String,
    pub order: i64,
    pub season_tag: Option<String>,
    pub week_structure: Vec<WeekStructure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: ChildId,
    pub name: String,
    pub start_day_of_year: i64,
    pub description: Option<String>,
    pub daylight_hours: Option<f64>,
    pub dawn_dusk_hours: Option<f64>,
    pub night_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Festival {
    pub id: ChildId,
    pub name: String,
    pub day_rule: String,
    pub description: Option<String>,
}

/// Fully assembled calendar tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAggregate {
    #[serde(flatten)]
    pub calendar: Calendar,
    pub weekdays: Vec<Weekday>,
    pub months: Vec<Month>,
    pub seasons: Vec<Season>,
    pub festivals: Vec<Festival>,
}

impl Ownable for CalendarAggregate {
    fn owner_id(&self) -> &str {
        self.calendar.owner_id()
    }

    fn is_free(&self) -> bool {
        self.calendar.is_free()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekdayInput {
    pub name: String,
    /// Accepted for wire compatibility; the writer derives order from position.
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekStructureInput {
    pub week_number: i64,
    pub days_in_week: i64,
    #[serde(default)]
    pub repeat_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthInput {
    pub name: String,
    /// Accepted for wire compatibility; the writer derives order from position.
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub season_tag: Option<String>,
    #[serde(default)]
    pub week_structure: Vec<WeekStructureInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInput {
    pub name: String,
    pub start_day_of_year: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub daylight_hours: Option<f64>,
    #[serde(default)]
    pub dawn_dusk_hours: Option<f64>,
    #[serde(default)]
    pub night_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FestivalInput {
    pub name: String,
    pub day_rule: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Create-or-replace payload.
///
/// A child collection left as `None` is untouched on replace (and empty on
/// create); `Some(vec![])` clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPayload {
    #[serde(flatten)]
    pub fields: CalendarFields,
    #[serde(default)]
    pub weekdays: Option<Vec<WeekdayInput>>,
    #[serde(default)]
    pub months: Option<Vec<MonthInput>>,
    #[serde(default)]
    pub seasons: Option<Vec<SeasonInput>>,
    #[serde(default)]
    pub festivals: Option<Vec<FestivalInput>>,
}

impl CalendarPayload {
    /// Validates root scalars and every child name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.fields.validate()?;

        let weekday_names = self.weekdays.iter().flatten().map(|day| day.name.as_str());
        let month_names = self.months.iter().flatten().map(|month| month.name.as_str());
        let season_names = self.seasons.iter().flatten().map(|season| season.name.as_str());
        if weekday_names
            .chain(month_names)
            .chain(season_names)
            .any(|name| name.trim().is_empty())
        {
            return Err(ValidationError::BlankField("name"));
        }

        for festival in self.festivals.iter().flatten() {
            if festival.name.trim().is_empty() {
                return Err(ValidationError::BlankField("name"));
            }
            if festival.day_rule.trim().is_empty() {
                return Err(ValidationError::BlankField("dayRule"));
            }
        }

        Ok(())
    }
}
