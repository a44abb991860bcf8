//! Calendar aggregate repository.
//!
//! # Responsibility
//! - Read the calendar root with its four child collections as one tree.
//! - Create or fully replace the tree inside a single transaction.
//!
//! # Invariants
//! - Every write runs in one `IMMEDIATE` transaction; any failure rolls back
//!   the root scalars and every child collection together.
//! - A child collection present in the payload is deleted and re-inserted in
//!   full; an absent one is left untouched.
//! - Month and weekday `order` is the 1-based payload position.
//! - Reads order weekdays/months by `order`, week structures by
//!   `week_number`, seasons/festivals by insertion position.

use crate::db::{ensure_connection_ready, NOW_MS_SQL};
use crate::model::calendar::{
    Calendar, CalendarAggregate, CalendarFields, CalendarPayload, Festival, FestivalInput, Month,
    MonthInput, Season, SeasonInput, WeekStructure, Weekday, WeekdayInput,
};
use crate::model::principal::Principal;
use crate::model::resource::{normalize_optional_text, ResourceId};
use crate::policy::visibility::{can_read, can_write, list_filter};
use crate::repo::{
    bool_to_int, parse_flag, parse_uuid, unmatched_write, RepoError, RepoResult,
};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const CALENDAR_TABLES: &[&str] = &[
    "calendars",
    "calendar_weekdays",
    "calendar_months",
    "calendar_week_structures",
    "calendar_seasons",
    "calendar_festivals",
];

const CALENDAR_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    description,
    hours_per_day,
    minutes_per_hour,
    daylight_hours,
    night_hours,
    dawn_dusk_hours,
    days_per_year,
    has_leap_year,
    leap_year_frequency,
    leap_year_exceptions,
    leap_days_added,
    is_free,
    is_published,
    created_at,
    updated_at
FROM calendars";

/// Repository interface for calendar aggregates.
pub trait CalendarRepository {
    /// Lists calendar roots visible to `principal`, ordered by name.
    fn list_calendars(&self, principal: &Principal) -> RepoResult<Vec<Calendar>>;
    /// Assembles one calendar tree visible to `principal`.
    fn read_aggregate(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> RepoResult<Option<CalendarAggregate>>;
    /// Inserts a new calendar tree owned by `principal`.
    fn create_aggregate(
        &self,
        principal: &Principal,
        payload: &CalendarPayload,
    ) -> RepoResult<CalendarAggregate>;
    /// Replaces root scalars and every child collection present in `payload`.
    fn replace_aggregate(
        &self,
        principal: &Principal,
        id: ResourceId,
        payload: &CalendarPayload,
    ) -> RepoResult<CalendarAggregate>;
    /// Deletes one calendar; children cascade.
    fn delete_calendar(&self, principal: &Principal, id: ResourceId) -> RepoResult<()>;
}

/// SQLite-backed calendar repository.
pub struct SqliteCalendarRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCalendarRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, CALENDAR_TABLES)?;
        Ok(Self { conn })
    }
}

impl CalendarRepository for SqliteCalendarRepository<'_> {
    fn list_calendars(&self, principal: &Principal) -> RepoResult<Vec<Calendar>> {
        let (clause, binds) = list_filter(principal).to_sql("");
        let mut stmt = self.conn.prepare(&format!(
            "{CALENDAR_SELECT_SQL}
             WHERE {clause}
             ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut calendars = Vec::new();
        while let Some(row) = rows.next()? {
            calendars.push(parse_calendar_row(row)?);
        }
        Ok(calendars)
    }

    fn read_aggregate(
        &self,
        principal: &Principal,
        id: ResourceId,
    ) -> RepoResult<Option<CalendarAggregate>> {
        let id_text = id.to_string();
        match load_root(self.conn, &id_text)? {
            Some(root) if can_read(principal, &root) => {
                Ok(Some(assemble_aggregate(self.conn, root)?))
            }
            _ => Ok(None),
        }
    }

    fn create_aggregate(
        &self,
        principal: &Principal,
        payload: &CalendarPayload,
    ) -> RepoResult<CalendarAggregate> {
        payload.validate()?;
        let id_text = Uuid::new_v4().to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_root(&tx, &id_text, principal.id.as_str(), &payload.fields)?;
        write_children(&tx, &id_text, payload)?;
        tx.commit()?;

        load_required_aggregate(self.conn, &id_text)
    }

    fn replace_aggregate(
        &self,
        principal: &Principal,
        id: ResourceId,
        payload: &CalendarPayload,
    ) -> RepoResult<CalendarAggregate> {
        payload.validate()?;
        let id_text = id.to_string();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let root = load_root(&tx, &id_text)?.ok_or_else(|| RepoError::NotFound(id_text.clone()))?;
        if !can_write(principal, &root) {
            return Err(RepoError::Forbidden(id_text));
        }

        update_root(&tx, &id_text, &payload.fields)?;
        write_children(&tx, &id_text, payload)?;
        tx.commit()?;

        load_required_aggregate(self.conn, &id_text)
    }

    fn delete_calendar(&self, principal: &Principal, id: ResourceId) -> RepoResult<()> {
        let id_text = id.to_string();
        let changed = self.conn.execute(
            "DELETE FROM calendars
             WHERE id = ?1
               AND (?2 = 1 OR owner_id = ?3);",
            params![
                id_text.as_str(),
                bool_to_int(principal.is_admin()),
                principal.id.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(unmatched_write(self.conn, "calendars", &id_text));
        }
        Ok(())
    }
}

fn insert_root(
    conn: &Connection,
    id: &str,
    owner_id: &str,
    fields: &CalendarFields,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO calendars (
            id,
            owner_id,
            name,
            description,
            hours_per_day,
            minutes_per_hour,
            daylight_hours,
            night_hours,
            dawn_dusk_hours,
            days_per_year,
            has_leap_year,
            leap_year_frequency,
            leap_year_exceptions,
            leap_days_added,
            is_free,
            is_published
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16);",
        params![
            id,
            owner_id,
            fields.name.trim(),
            normalize_optional_text(fields.description.as_deref()),
            fields.hours_per_day,
            fields.minutes_per_hour,
            fields.daylight_hours,
            fields.night_hours,
            fields.dawn_dusk_hours,
            fields.days_per_year,
            bool_to_int(fields.has_leap_year),
            fields.leap_year_frequency,
            normalize_optional_text(fields.leap_year_exceptions.as_deref()),
            fields.leap_days_added,
            bool_to_int(fields.is_free),
            bool_to_int(fields.is_published),
        ],
    )?;
    Ok(())
}

fn update_root(conn: &Connection, id: &str, fields: &CalendarFields) -> RepoResult<()> {
    conn.execute(
        &format!(
            "UPDATE calendars
             SET
                name = ?2,
                description = ?3,
                hours_per_day = ?4,
                minutes_per_hour = ?5,
                daylight_hours = ?6,
                night_hours = ?7,
                dawn_dusk_hours = ?8,
                days_per_year = ?9,
                has_leap_year = ?10,
                leap_year_frequency = ?11,
                leap_year_exceptions = ?12,
                leap_days_added = ?13,
                is_free = ?14,
                is_published = ?15,
                updated_at = {NOW_MS_SQL}
             WHERE id = ?1;"
        ),
        params![
            id,
            fields.name.trim(),
            normalize_optional_text(fields.description.as_deref()),
            fields.hours_per_day,
            fields.minutes_per_hour,
            fields.daylight_hours,
            fields.night_hours,
            fields.dawn_dusk_hours,
            fields.days_per_year,
            bool_to_int(fields.has_leap_year),
            fields.leap_year_frequency,
            normalize_optional_text(fields.leap_year_exceptions.as_deref()),
            fields.leap_days_added,
            bool_to_int(fields.is_free),
            bool_to_int(fields.is_published),
        ],
    )?;
    Ok(())
}

/// Replaces every child collection present in `payload`, festivals last.
fn write_children(conn: &Connection, calendar_id: &str, payload: &CalendarPayload) -> RepoResult<()> {
    if let Some(weekdays) = &payload.weekdays {
        replace_weekdays(conn, calendar_id, weekdays)?;
    }
    if let Some(months) = &payload.months {
        replace_months(conn, calendar_id, months)?;
    }
    if let Some(seasons) = &payload.seasons {
        replace_seasons(conn, calendar_id, seasons)?;
    }
    if let Some(festivals) = &payload.festivals {
        replace_festivals(conn, calendar_id, festivals)?;
    }
    Ok(())
}

fn replace_weekdays(
    conn: &Connection,
    calendar_id: &str,
    weekdays: &[WeekdayInput],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM calendar_weekdays WHERE calendar_id = ?1;",
        [calendar_id],
    )?;
    for (position, weekday) in (1_i64..).zip(weekdays) {
        conn.execute(
            "INSERT INTO calendar_weekdays (id, calendar_id, name, sort_order)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                Uuid::new_v4().to_string(),
                calendar_id,
                weekday.name.trim(),
                position,
            ],
        )?;
    }
    Ok(())
}

fn replace_months(conn: &Connection, calendar_id: &str, months: &[MonthInput]) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM calendar_week_structures
         WHERE month_id IN (SELECT id FROM calendar_months WHERE calendar_id = ?1);",
        [calendar_id],
    )?;
    conn.execute(
        "DELETE FROM calendar_months WHERE calendar_id = ?1;",
        [calendar_id],
    )?;

    for (position, month) in (1_i64..).zip(months) {
        let month_id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO calendar_months (id, calendar_id, name, sort_order, season_tag)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                month_id.as_str(),
                calendar_id,
                month.name.trim(),
                position,
                normalize_optional_text(month.season_tag.as_deref()),
            ],
        )?;

        for week in &month.week_structure {
            conn.execute(
                "INSERT INTO calendar_week_structures (
                    id,
                    month_id,
                    week_number,
                    days_in_week,
                    repeat_pattern
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    Uuid::new_v4().to_string(),
                    month_id.as_str(),
                    week.week_number,
                    week.days_in_week,
                    week.repeat_pattern.as_str(),
                ],
            )?;
        }
    }
    Ok(())
}

fn replace_seasons(
    conn: &Connection,
    calendar_id: &str,
    seasons: &[SeasonInput],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM calendar_seasons WHERE calendar_id = ?1;",
        [calendar_id],
    )?;
    for (position, season) in (1_i64..).zip(seasons) {
        conn.execute(
            "INSERT INTO calendar_seasons (
                id,
                calendar_id,
                name,
                start_day_of_year,
                description,
                daylight_hours,
                dawn_dusk_hours,
                night_hours,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                Uuid::new_v4().to_string(),
                calendar_id,
                season.name.trim(),
                season.start_day_of_year,
                normalize_optional_text(season.description.as_deref()),
                season.daylight_hours,
                season.dawn_dusk_hours,
                season.night_hours,
                position,
            ],
        )?;
    }
    Ok(())
}

fn replace_festivals(
    conn: &Connection,
    calendar_id: &str,
    festivals: &[FestivalInput],
) -> RepoResult<()> {
    conn.execute(
        "DELETE FROM calendar_festivals WHERE calendar_id = ?1;",
        [calendar_id],
    )?;
    for (position, festival) in (1_i64..).zip(festivals) {
        conn.execute(
            "INSERT INTO calendar_festivals (
                id,
                calendar_id,
                name,
                day_rule,
                description,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                Uuid::new_v4().to_string(),
                calendar_id,
                festival.name.trim(),
                festival.day_rule.trim(),
                normalize_optional_text(festival.description.as_deref()),
                position,
            ],
        )?;
    }
    Ok(())
}

fn load_required_aggregate(conn: &Connection, id: &str) -> RepoResult<CalendarAggregate> {
    let root = load_root(conn, id)?.ok_or_else(|| RepoError::NotFound(id.to_string()))?;
    assemble_aggregate(conn, root)
}

fn load_root(conn: &Connection, id: &str) -> RepoResult<Option<Calendar>> {
    let mut stmt = conn.prepare(&format!("{CALENDAR_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_calendar_row(row)?));
    }
    Ok(None)
}

fn assemble_aggregate(conn: &Connection, calendar: Calendar) -> RepoResult<CalendarAggregate> {
    let id = calendar.id.to_string();
    Ok(CalendarAggregate {
        weekdays: load_weekdays(conn, &id)?,
        months: load_months(conn, &id)?,
        seasons: load_seasons(conn, &id)?,
        festivals: load_festivals(conn, &id)?,
        calendar,
    })
}

fn load_weekdays(conn: &Connection, calendar_id: &str) -> RepoResult<Vec<Weekday>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, sort_order
         FROM calendar_weekdays
         WHERE calendar_id = ?1
         ORDER BY sort_order ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([calendar_id])?;
    let mut weekdays = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        weekdays.push(Weekday {
            id: parse_uuid(&id, "calendar_weekdays.id")?,
            name: row.get("name")?,
            order: row.get("sort_order")?,
        });
    }
    Ok(weekdays)
}

fn load_months(conn: &Connection, calendar_id: &str) -> RepoResult<Vec<Month>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, sort_order, season_tag
         FROM calendar_months
         WHERE calendar_id = ?1
         ORDER BY sort_order ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([calendar_id])?;
    let mut months = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        months.push(Month {
            id: parse_uuid(&id_text, "calendar_months.id")?,
            name: row.get("name")?,
            order: row.get("sort_order")?,
            season_tag: row.get("season_tag")?,
            week_structure: load_week_structures(conn, &id_text)?,
        });
    }
    Ok(months)
}

fn load_week_structures(conn: &Connection, month_id: &str) -> RepoResult<Vec<WeekStructure>> {
    let mut stmt = conn.prepare(
        "SELECT id, week_number, days_in_week, repeat_pattern
         FROM calendar_week_structures
         WHERE month_id = ?1
         ORDER BY week_number ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query([month_id])?;
    let mut weeks = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        weeks.push(WeekStructure {
            id: parse_uuid(&id, "calendar_week_structures.id")?,
            week_number: row.get("week_number")?,
            days_in_week: row.get("days_in_week")?,
            repeat_pattern: row.get("repeat_pattern")?,
        });
    }
    Ok(weeks)
}

fn load_seasons(conn: &Connection, calendar_id: &str) -> RepoResult<Vec<Season>> {
    let mut stmt = conn.prepare(
        "SELECT
            id,
            name,
            start_day_of_year,
            description,
            daylight_hours,
            dawn_dusk_hours,
            night_hours
         FROM calendar_seasons
         WHERE calendar_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([calendar_id])?;
    let mut seasons = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        seasons.push(Season {
            id: parse_uuid(&id, "calendar_seasons.id")?,
            name: row.get("name")?,
            start_day_of_year: row.get("start_day_of_year")?,
            description: row.get("description")?,
            daylight_hours: row.get("daylight_hours")?,
            dawn_dusk_hours: row.get("dawn_dusk_hours")?,
            night_hours: row.get("night_hours")?,
        });
    }
    Ok(seasons)
}

fn load_festivals(conn: &Connection, calendar_id: &str) -> RepoResult<Vec<Festival>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, day_rule, description
         FROM calendar_festivals
         WHERE calendar_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([calendar_id])?;
    let mut festivals = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get("id")?;
        festivals.push(Festival {
            id: parse_uuid(&id, "calendar_festivals.id")?,
            name: row.get("name")?,
            day_rule: row.get("day_rule")?,
            description: row.get("description")?,
        });
    }
    Ok(festivals)
}

fn parse_calendar_row(row: &Row<'_>) -> RepoResult<Calendar> {
    let id: String = row.get("id")?;
    Ok(Calendar {
        id: parse_uuid(&id, "calendars.id")?,
        owner_id: row.get("owner_id")?,
        fields: CalendarFields {
            name: row.get("name")?,
            description: row.get("description")?,
            hours_per_day: row.get("hours_per_day")?,
            minutes_per_hour: row.get("minutes_per_hour")?,
            daylight_hours: row.get("daylight_hours")?,
            night_hours: row.get("night_hours")?,
            dawn_dusk_hours: row.get("dawn_dusk_hours")?,
            days_per_year: row.get("days_per_year")?,
            has_leap_year: parse_flag(row.get("has_leap_year")?, "calendars.has_leap_year")?,
            leap_year_frequency: row.get("leap_year_frequency")?,
            leap_year_exceptions: row.get("leap_year_exceptions")?,
            leap_days_added: row.get("leap_days_added")?,
            is_free: parse_flag(row.get("is_free")?, "calendars.is_free")?,
            is_published: parse_flag(row.get("is_published")?, "calendars.is_published")?,
        },
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
