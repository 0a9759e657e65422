use crate::domain::timer::MAX_TIMER_MINUTES;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum QuickInputError {
    #[error("Enter what you worked on")]
    EmptyTask,
    #[error("Duration must be a whole number of minutes")]
    NotANumber,
    #[error("Duration must be greater than zero")]
    ZeroDuration,
    #[error("Duration must be at most {max} minutes")]
    DurationTooLong { max: u32 },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct FocusSubmission {
    pub task_content: String,
    pub duration_minutes: u32,
}

pub fn parse_duration_minutes(raw: &str) -> Result<u32, QuickInputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(QuickInputError::ZeroDuration);
    }
    raw.parse::<u32>().map_err(|_| QuickInputError::NotANumber)
}

pub fn validate_focus_input(task: &str, duration_minutes: u32) -> Result<FocusSubmission, QuickInputError> {
    let task = task.trim();
    if task.is_empty() {
        return Err(QuickInputError::EmptyTask);
    }
    if duration_minutes == 0 {
        return Err(QuickInputError::ZeroDuration);
    }
    if duration_minutes > MAX_TIMER_MINUTES {
        return Err(QuickInputError::DurationTooLong { max: MAX_TIMER_MINUTES });
    }
    Ok(FocusSubmission {
        task_content: task.to_string(),
        duration_minutes,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct LifeSubmission {
    pub sleep_hours: f64,
    pub screen_time: u32,
    pub mood: u8,
}

pub const MAX_SLEEP_HALF_HOURS: u8 = 24;
pub const MAX_SCREEN_MINUTES: u32 = 600;
pub const SCREEN_STEP_MINUTES: u32 = 10;
pub const MIN_MOOD: u8 = 1;
pub const MAX_MOOD: u8 = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifeField {
    Sleep,
    ScreenTime,
    Mood,
}

impl LifeField {
    pub const ALL: [LifeField; 3] = [LifeField::Sleep, LifeField::ScreenTime, LifeField::Mood];

    pub fn label(self) -> &'static str {
        match self {
            Self::Sleep => "Sleep",
            Self::ScreenTime => "Screen time",
            Self::Mood => "Mood",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Sleep => Self::ScreenTime,
            Self::ScreenTime => Self::Mood,
            Self::Mood => Self::Sleep,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Sleep => Self::Mood,
            Self::ScreenTime => Self::Sleep,
            Self::Mood => Self::ScreenTime,
        }
    }
}

/// Slider-style life form. Sleep is kept in half-hour steps so every value
/// is exactly representable.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LifeForm {
    sleep_half_hours: u8,
    screen_time: u32,
    mood: u8,
}

impl Default for LifeForm {
    fn default() -> Self {
        Self {
            sleep_half_hours: 14,
            screen_time: 60,
            mood: 3,
        }
    }
}

impl LifeForm {
    pub fn sleep_hours(&self) -> f64 {
        f64::from(self.sleep_half_hours) / 2.0
    }

    pub fn screen_time(&self) -> u32 {
        self.screen_time
    }

    pub fn mood(&self) -> u8 {
        self.mood
    }

    /// Moves `field` by `steps` slider steps, clamping at the bounds.
    pub fn adjust(&mut self, field: LifeField, steps: i32) {
        match field {
            LifeField::Sleep => {
                let next = i32::from(self.sleep_half_hours) + steps;
                self.sleep_half_hours = next.clamp(0, i32::from(MAX_SLEEP_HALF_HOURS)) as u8;
            }
            LifeField::ScreenTime => {
                let step = SCREEN_STEP_MINUTES as i64;
                let next = i64::from(self.screen_time) + i64::from(steps) * step;
                self.screen_time = next.clamp(0, i64::from(MAX_SCREEN_MINUTES)) as u32;
            }
            LifeField::Mood => {
                let next = i32::from(self.mood) + steps;
                self.mood = next.clamp(i32::from(MIN_MOOD), i32::from(MAX_MOOD)) as u8;
            }
        }
    }

    pub fn value_text(&self, field: LifeField) -> String {
        match field {
            LifeField::Sleep => format!("{:.1} h", self.sleep_hours()),
            LifeField::ScreenTime => format!("{} min", self.screen_time),
            LifeField::Mood => format!("{} / {MAX_MOOD}", self.mood),
        }
    }

    pub fn submission(&self) -> LifeSubmission {
        LifeSubmission {
            sleep_hours: self.sleep_hours(),
            screen_time: self.screen_time,
            mood: self.mood,
        }
    }

    /// Builds a form from raw values, rejecting anything a slider could not produce.
    pub fn from_values(sleep_hours: f64, screen_time: u32, mood: u8) -> Result<Self, LifeInputError> {
        let half_hours = sleep_hours * 2.0;
        if !(0.0..=f64::from(MAX_SLEEP_HALF_HOURS)).contains(&half_hours) || half_hours.fract() != 0.0 {
            return Err(LifeInputError::Sleep(sleep_hours));
        }
        if screen_time > MAX_SCREEN_MINUTES {
            return Err(LifeInputError::ScreenTime(screen_time));
        }
        if !(MIN_MOOD..=MAX_MOOD).contains(&mood) {
            return Err(LifeInputError::Mood(mood));
        }
        Ok(Self {
            sleep_half_hours: half_hours as u8,
            screen_time,
            mood,
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LifeInputError {
    #[error("sleep must be between 0 and 12 hours in half-hour steps (got {0})")]
    Sleep(f64),
    #[error("screen time must be between 0 and {MAX_SCREEN_MINUTES} minutes (got {0})")]
    ScreenTime(u32),
    #[error("mood must be between {MIN_MOOD} and {MAX_MOOD} (got {0})")]
    Mood(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_input_requires_task_and_positive_duration() {
        assert_eq!(validate_focus_input("   ", 25), Err(QuickInputError::EmptyTask));
        assert_eq!(validate_focus_input("Write", 0), Err(QuickInputError::ZeroDuration));
        assert_eq!(
            validate_focus_input("Write", 181),
            Err(QuickInputError::DurationTooLong { max: 180 })
        );
        assert_eq!(
            validate_focus_input("  Write report ", 45),
            Ok(FocusSubmission {
                task_content: "Write report".to_string(),
                duration_minutes: 45
            })
        );
    }

    #[test]
    fn duration_text_parsing() {
        assert_eq!(parse_duration_minutes(" 30 "), Ok(30));
        assert_eq!(parse_duration_minutes(""), Err(QuickInputError::ZeroDuration));
        assert_eq!(parse_duration_minutes("-5"), Err(QuickInputError::NotANumber));
        assert_eq!(parse_duration_minutes("abc"), Err(QuickInputError::NotANumber));
    }

    #[test]
    fn life_form_clamps_at_bounds() {
        let mut form = LifeForm::default();
        form.adjust(LifeField::Sleep, 100);
        assert_eq!(form.sleep_hours(), 12.0);
        form.adjust(LifeField::Sleep, -1);
        assert_eq!(form.sleep_hours(), 11.5);
        form.adjust(LifeField::Sleep, -100);
        assert_eq!(form.sleep_hours(), 0.0);

        form.adjust(LifeField::ScreenTime, 1000);
        assert_eq!(form.screen_time(), 600);
        form.adjust(LifeField::ScreenTime, -1);
        assert_eq!(form.screen_time(), 590);

        form.adjust(LifeField::Mood, -10);
        assert_eq!(form.mood(), 1);
        form.adjust(LifeField::Mood, 10);
        assert_eq!(form.mood(), 5);
    }

    #[test]
    fn life_form_from_values_rejects_off_step_values() {
        assert!(LifeForm::from_values(7.5, 120, 3).is_ok());
        assert_eq!(LifeForm::from_values(7.25, 120, 3), Err(LifeInputError::Sleep(7.25)));
        assert_eq!(LifeForm::from_values(13.0, 120, 3), Err(LifeInputError::Sleep(13.0)));
        assert_eq!(LifeForm::from_values(7.0, 601, 3), Err(LifeInputError::ScreenTime(601)));
        assert_eq!(LifeForm::from_values(7.0, 60, 0), Err(LifeInputError::Mood(0)));
    }

    #[test]
    fn submission_serializes_backend_field_names() {
        let form = LifeForm::default();
        let json = serde_json::to_value(form.submission()).expect("serialize");
        assert_eq!(json["sleep_hours"], 7.0);
        assert_eq!(json["screen_time"], 60);
        assert_eq!(json["mood"], 3);
    }
}
