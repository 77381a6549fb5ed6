//! Preventive maintenance schedules: derive a due status from the next due date.

use chrono::{Days, NaiveDate};
use serde_json::Value;

use crate::render::{Cell, Tone, parse_date};
use crate::row::value_text;

pub const DEFAULT_DUE_SOON_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue,
    DueSoon,
    OnSchedule,
    Unscheduled,
}

impl DueStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DueStatus::Overdue => "Overdue",
            DueStatus::DueSoon => "Due Soon",
            DueStatus::OnSchedule => "On Schedule",
            DueStatus::Unscheduled => "Unscheduled",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            DueStatus::Overdue => Tone::Negative,
            DueStatus::DueSoon => Tone::Warning,
            DueStatus::OnSchedule => Tone::Positive,
            DueStatus::Unscheduled => Tone::Neutral,
        }
    }
}

/// Overdue before `today`, due soon up to and including `today + due_soon_days`.
pub fn due_status(next_due: Option<NaiveDate>, today: NaiveDate, due_soon_days: i64) -> DueStatus {
    let Some(next_due) = next_due else {
        return DueStatus::Unscheduled;
    };
    if next_due < today {
        return DueStatus::Overdue;
    }
    let horizon = today
        .checked_add_days(Days::new(due_soon_days.max(0) as u64))
        .unwrap_or(NaiveDate::MAX);
    if next_due <= horizon {
        DueStatus::DueSoon
    } else {
        DueStatus::OnSchedule
    }
}

pub fn due_status_of(value: &Value, today: NaiveDate, due_soon_days: i64) -> DueStatus {
    due_status(parse_date(&value_text(value)), today, due_soon_days)
}

pub fn due_status_cell(value: &Value, today: NaiveDate, due_soon_days: i64) -> Cell {
    let status = due_status_of(value, today, due_soon_days);
    Cell::badge(status.label(), status.tone())
}
