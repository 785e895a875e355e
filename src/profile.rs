use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

pub const GENDER_OPTIONS: &[&str] = &["Male", "Female", "Other"];
pub const ACTIVITY_LEVEL_OPTIONS: &[&str] = &["Low", "Moderate", "High"];

pub const AGE_RANGE: RangeInclusive<i64> = 1..=18;
pub const HEIGHT_CM_RANGE: RangeInclusive<f64> = 50.0..=220.0;
pub const WEIGHT_KG_RANGE: RangeInclusive<f64> = 10.0..=150.0;
pub const SLEEP_HOURS_RANGE: RangeInclusive<f64> = 0.0..=14.0;
pub const SCREEN_TIME_HOURS_RANGE: RangeInclusive<f64> = 0.0..=24.0;

/// Everything the planner knows about a child for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildHealthProfile {
    #[serde(default)]
    pub name: Option<String>,
    pub age: i64,
    pub gender: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub sleep_hours: f64,
    pub screen_time_hours: f64,
    pub physical_activity_level: String,
    pub eating_habits: String,
    pub mood: String,
    #[serde(default)]
    pub symptoms: Option<String>,
}

impl ChildHealthProfile {
    /// The profile the sample binary generates a plan for.
    pub fn sample() -> Self {
        Self {
            name: Some("Aarav".to_string()),
            age: 10,
            gender: "Male".to_string(),
            height_cm: 138.0,
            weight_kg: 42.0,
            sleep_hours: 7.0,
            screen_time_hours: 4.0,
            physical_activity_level: "Low".to_string(),
            eating_habits: "Prefers junk food, low vegetables".to_string(),
            mood: "Often tired".to_string(),
            symptoms: Some("Occasional headaches".to_string()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Please enter the child's name.")]
    MissingName,
    #[error("Please fill in eating habits and mood.")]
    MissingHabitsOrMood,
    #[error("{field} must be a number, got {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: String,
        max: String,
    },
    #[error("{value:?} is not a valid choice for {field}")]
    UnknownOption { field: &'static str, value: String },
}

/// Raw profile form submission. Every field arrives as text so a bad value
/// can be reported and echoed back instead of rejected by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub height_cm: String,
    pub weight_kg: String,
    pub sleep_hours: String,
    pub screen_time_hours: String,
    pub physical_activity_level: String,
    pub eating_habits: String,
    pub mood: String,
    pub symptoms: String,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            age: "10".to_string(),
            gender: GENDER_OPTIONS[0].to_string(),
            height_cm: "138.0".to_string(),
            weight_kg: "42.0".to_string(),
            sleep_hours: "7.0".to_string(),
            screen_time_hours: "4.0".to_string(),
            physical_activity_level: ACTIVITY_LEVEL_OPTIONS[0].to_string(),
            eating_habits: String::new(),
            mood: String::new(),
            symptoms: String::new(),
        }
    }
}

impl ProfileForm {
    /// Checks the submission the same way the form does and builds the
    /// profile. Required text is checked first, then numbers, then choices.
    pub fn validate(&self) -> Result<ChildHealthProfile, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let eating_habits = self.eating_habits.trim();
        let mood = self.mood.trim();
        if eating_habits.is_empty() || mood.is_empty() {
            return Err(ValidationError::MissingHabitsOrMood);
        }

        let age = parse_in_range("Age", &self.age, &AGE_RANGE)?;
        let height_cm =
            parse_in_range("Height (cm)", &self.height_cm, &HEIGHT_CM_RANGE)?;
        let weight_kg =
            parse_in_range("Weight (kg)", &self.weight_kg, &WEIGHT_KG_RANGE)?;
        let sleep_hours = parse_in_range(
            "Sleep (hours/night)",
            &self.sleep_hours,
            &SLEEP_HOURS_RANGE,
        )?;
        let screen_time_hours = parse_in_range(
            "Screen time (hours/day)",
            &self.screen_time_hours,
            &SCREEN_TIME_HOURS_RANGE,
        )?;

        let gender = choose("Gender", &self.gender, GENDER_OPTIONS)?;
        let physical_activity_level = choose(
            "Physical activity",
            &self.physical_activity_level,
            ACTIVITY_LEVEL_OPTIONS,
        )?;

        let symptoms = self.symptoms.trim();

        Ok(ChildHealthProfile {
            name: Some(name.to_string()),
            age,
            gender,
            height_cm,
            weight_kg,
            sleep_hours,
            screen_time_hours,
            physical_activity_level,
            eating_habits: eating_habits.to_string(),
            mood: mood.to_string(),
            symptoms: (!symptoms.is_empty()).then(|| symptoms.to_string()),
        })
    }
}

fn parse_in_range<T>(
    field: &'static str,
    raw: &str,
    range: &RangeInclusive<T>,
) -> Result<T, ValidationError>
where
    T: FromStr + PartialOrd + ToString,
{
    let value: T = raw.trim().parse().map_err(|_| {
        ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        }
    })?;
    if !range.contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            min: range.start().to_string(),
            max: range.end().to_string(),
        });
    }
    Ok(value)
}

fn choose(
    field: &'static str,
    raw: &str,
    options: &[&str],
) -> Result<String, ValidationError> {
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw.trim()))
        .map(|option| option.to_string())
        .ok_or_else(|| ValidationError::UnknownOption {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filled_form() -> ProfileForm {
        ProfileForm {
            name: "Aarav".to_string(),
            eating_habits: "Prefers junk food, low vegetables".to_string(),
            mood: "Often tired".to_string(),
            symptoms: "Occasional headaches".to_string(),
            ..ProfileForm::default()
        }
    }

    #[test]
    fn test_validate_filled_form() {
        let profile = filled_form().validate().unwrap();
        assert_eq!(profile, ChildHealthProfile::sample());
    }

    #[test]
    fn test_blank_name_is_rejected_first() {
        let form = ProfileForm {
            name: "   ".to_string(),
            mood: String::new(),
            ..filled_form()
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingName));
    }

    #[test]
    fn test_blank_habits_or_mood_is_rejected() {
        let form = ProfileForm {
            eating_habits: String::new(),
            ..filled_form()
        };
        assert_eq!(form.validate(), Err(ValidationError::MissingHabitsOrMood));

        let form = ProfileForm {
            mood: " ".to_string(),
            ..filled_form()
        };
        assert_eq!(
            form.validate().unwrap_err().to_string(),
            "Please fill in eating habits and mood."
        );
    }

    #[test]
    fn test_blank_symptoms_become_none() {
        let form = ProfileForm {
            symptoms: "  ".to_string(),
            ..filled_form()
        };
        assert_eq!(form.validate().unwrap().symptoms, None);
    }

    #[test]
    fn test_numbers_are_parsed_and_range_checked() {
        let form = ProfileForm {
            sleep_hours: " 8.5 ".to_string(),
            ..filled_form()
        };
        assert_eq!(form.validate().unwrap().sleep_hours, 8.5);

        let form = ProfileForm {
            age: "19".to_string(),
            ..filled_form()
        };
        assert_eq!(
            form.validate(),
            Err(ValidationError::OutOfRange {
                field: "Age",
                min: "1".to_string(),
                max: "18".to_string(),
            })
        );

        let form = ProfileForm {
            weight_kg: "heavy".to_string(),
            ..filled_form()
        };
        assert!(matches!(
            form.validate(),
            Err(ValidationError::NotANumber {
                field: "Weight (kg)",
                ..
            })
        ));
    }

    #[test]
    fn test_options_are_normalized() {
        let form = ProfileForm {
            gender: "female".to_string(),
            physical_activity_level: "HIGH".to_string(),
            ..filled_form()
        };
        let profile = form.validate().unwrap();
        assert_eq!(profile.gender, "Female");
        assert_eq!(profile.physical_activity_level, "High");

        let form = ProfileForm {
            physical_activity_level: "Extreme".to_string(),
            ..filled_form()
        };
        assert!(matches!(
            form.validate(),
            Err(ValidationError::UnknownOption { .. })
        ));
    }

    #[test]
    fn test_profile_accepts_missing_optional_fields_in_json() {
        let profile: ChildHealthProfile = serde_json::from_str(
            r#"{
                "age": 8,
                "gender": "Other",
                "height_cm": 125.5,
                "weight_kg": 26,
                "sleep_hours": 9,
                "screen_time_hours": 1.5,
                "physical_activity_level": "High",
                "eating_habits": "Balanced",
                "mood": "Cheerful"
            }"#,
        )
        .unwrap();
        assert_eq!(profile.name, None);
        assert_eq!(profile.symptoms, None);
        assert_eq!(profile.weight_kg, 26.0);
    }
}
