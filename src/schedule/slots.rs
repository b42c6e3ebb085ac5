use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{
    macros::{format_description, time},
    Date, Time, Weekday,
};

use super::repo_types::{Appointment, AppointmentStatus};
use crate::errors::ApiError;

pub const DEFAULT_SLOT_MINUTES: i64 = 60;
const MINUTES_PER_DAY: i64 = 24 * 60;

const DAY_KEYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    #[default]
    Continuous,
    Split,
}

impl ScheduleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleMode::Continuous => "continuous",
            ScheduleMode::Split => "split",
        }
    }
}

/// Opening hours for one weekday. The second interval only counts in
/// split mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start: Time,
    pub end: Time,
    pub second_start: Option<Time>,
    pub second_end: Option<Time>,
}

impl DaySchedule {
    fn working(enabled: bool) -> Self {
        Self {
            enabled,
            start: time!(09:00),
            end: time!(18:00),
            second_start: None,
            second_end: None,
        }
    }
}

/// A nutritionist's weekly availability, indexed Monday first.
///
/// Stored and exchanged as a flat JSON object (`monday_start_hour`,
/// `monday_enabled`, ..., `schedule_mode`, `slot_duration_minutes`).
/// Missing keys fall back to the defaults: 09:00-18:00, weekdays open,
/// weekends closed, hourly slots, continuous mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct WeeklySchedule {
    pub mode: ScheduleMode,
    pub slot_duration_minutes: i64,
    pub days: [DaySchedule; 7],
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        let mut days = [DaySchedule::working(true); 7];
        days[5].enabled = false;
        days[6].enabled = false;
        Self {
            mode: ScheduleMode::Continuous,
            slot_duration_minutes: DEFAULT_SLOT_MINUTES,
            days,
        }
    }
}

fn parse_time(key: &str, raw: &str) -> Result<Time, ApiError> {
    let raw = raw.trim();
    Time::parse(raw, format_description!("[hour]:[minute]"))
        .or_else(|_| Time::parse(raw, format_description!("[hour]:[minute]:[second]")))
        .map_err(|_| ApiError::invalid_input(format!("{key}: expected HH:MM, got {raw:?}")))
}

fn format_time(t: Time) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

/// Absent and `null` are the same thing on the wire.
fn field<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn time_field(map: &Map<String, Value>, key: &str) -> Result<Option<Time>, ApiError> {
    match field(map, key) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => parse_time(key, s).map(Some),
        Some(other) => Err(ApiError::invalid_input(format!(
            "{key}: expected HH:MM string, got {other}"
        ))),
    }
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Result<Option<bool>, ApiError> {
    match field(map, key) {
        None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(ApiError::invalid_input(format!(
            "{key}: expected boolean, got {other}"
        ))),
    }
}

impl WeeklySchedule {
    pub fn from_flat(map: &Map<String, Value>) -> Result<Self, ApiError> {
        let mut schedule = Self::default();

        if let Some(v) = field(map, "schedule_mode") {
            schedule.mode = match v.as_str().map(|s| s.trim().to_lowercase()).as_deref() {
                Some("continuous") => ScheduleMode::Continuous,
                Some("split") => ScheduleMode::Split,
                _ => {
                    return Err(ApiError::invalid_schedule(format!(
                        "schedule_mode must be continuous or split, got {v}"
                    )))
                }
            };
        }

        if let Some(v) = field(map, "slot_duration_minutes") {
            schedule.slot_duration_minutes = v
                .as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
                .ok_or_else(|| {
                    ApiError::invalid_input(format!("slot_duration_minutes: expected integer, got {v}"))
                })?;
        }

        for (day, key) in schedule.days.iter_mut().zip(DAY_KEYS) {
            if let Some(enabled) = bool_field(map, &format!("{key}_enabled"))? {
                day.enabled = enabled;
            }
            if let Some(t) = time_field(map, &format!("{key}_start_hour"))? {
                day.start = t;
            }
            if let Some(t) = time_field(map, &format!("{key}_end_hour"))? {
                day.end = t;
            }
            day.second_start = time_field(map, &format!("{key}_second_start_hour"))?;
            day.second_end = time_field(map, &format!("{key}_second_end_hour"))?;
        }

        Ok(schedule)
    }

    pub fn to_flat(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("schedule_mode".into(), self.mode.as_str().into());
        map.insert("slot_duration_minutes".into(), self.slot_duration_minutes.into());
        for (day, key) in self.days.iter().zip(DAY_KEYS) {
            map.insert(format!("{key}_enabled"), day.enabled.into());
            map.insert(format!("{key}_start_hour"), format_time(day.start).into());
            map.insert(format!("{key}_end_hour"), format_time(day.end).into());
            map.insert(
                format!("{key}_second_start_hour"),
                day.second_start.map(format_time).into(),
            );
            map.insert(
                format!("{key}_second_end_hour"),
                day.second_end.map(format_time).into(),
            );
        }
        map
    }

    /// Save-time checks. Resolution assumes a schedule that passed these.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.slot_duration_minutes <= 0 {
            return Err(ApiError::invalid_schedule(
                "slot_duration_minutes must be positive",
            ));
        }
        if self.slot_duration_minutes > MINUTES_PER_DAY {
            return Err(ApiError::invalid_schedule(
                "slot_duration_minutes must fit within a day",
            ));
        }

        for (day, key) in self.days.iter().zip(DAY_KEYS) {
            if !day.enabled {
                continue;
            }
            if day.start >= day.end {
                return Err(ApiError::invalid_schedule(format!(
                    "{key}: start_hour must be before end_hour"
                )));
            }
            if self.mode != ScheduleMode::Split {
                continue;
            }
            let (Some(second_start), Some(second_end)) = (day.second_start, day.second_end) else {
                return Err(ApiError::invalid_schedule(format!(
                    "{key}: split mode needs second_start_hour and second_end_hour"
                )));
            };
            if second_start >= second_end {
                return Err(ApiError::invalid_schedule(format!(
                    "{key}: second_start_hour must be before second_end_hour"
                )));
            }
            if day.end > second_start {
                return Err(ApiError::invalid_schedule(format!(
                    "{key}: second interval must start after the first one ends"
                )));
            }
        }
        Ok(())
    }

    pub fn day(&self, weekday: Weekday) -> &DaySchedule {
        &self.days[weekday.number_days_from_monday() as usize]
    }

    /// Open intervals for a weekday in minutes since midnight.
    fn intervals(&self, weekday: Weekday) -> Vec<(i64, i64)> {
        let day = self.day(weekday);
        if !day.enabled {
            return Vec::new();
        }
        let mut out = vec![(minutes(day.start), minutes(day.end))];
        if self.mode == ScheduleMode::Split {
            if let (Some(s), Some(e)) = (day.second_start, day.second_end) {
                out.push((minutes(s), minutes(e)));
            }
        }
        out
    }
}

impl TryFrom<Map<String, Value>> for WeeklySchedule {
    type Error = ApiError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::from_flat(&map)
    }
}

impl From<WeeklySchedule> for Map<String, Value> {
    fn from(s: WeeklySchedule) -> Self {
        s.to_flat()
    }
}

fn minutes(t: Time) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

fn from_minutes(m: i64) -> Option<Time> {
    if !(0..MINUTES_PER_DAY).contains(&m) {
        return None;
    }
    Time::from_hms((m / 60) as u8, (m % 60) as u8, 0).ok()
}

/// Bookable slot start times for `date`, in chronological order.
///
/// Candidates step through each open interval at the slot duration and
/// must finish by the interval end. A candidate is dropped when it
/// overlaps a booked appointment on the same date; both occupy
/// `[start, start + duration)`.
pub fn resolve_available_slots(
    schedule: &WeeklySchedule,
    appointments: &[Appointment],
    date: Date,
) -> Vec<Time> {
    let step = schedule.slot_duration_minutes;
    if step <= 0 {
        return Vec::new();
    }

    let busy: Vec<(i64, i64)> = appointments
        .iter()
        .filter(|a| a.date == date && a.status != AppointmentStatus::Cancelled)
        .map(|a| {
            let start = minutes(a.start_time);
            (start, start + i64::from(a.duration_minutes.max(0)))
        })
        .collect();

    let mut slots: Vec<i64> = Vec::new();
    for (open, close) in schedule.intervals(date.weekday()) {
        let mut candidate = open;
        while candidate + step <= close {
            let end = candidate + step;
            if !busy.iter().any(|&(bs, be)| candidate < be && bs < end) {
                slots.push(candidate);
            }
            candidate += step;
        }
    }
    slots.sort_unstable();
    slots.dedup();
    slots.into_iter().filter_map(from_minutes).collect()
}
