use crate::profile::ChildHealthProfile;

pub const HEALTH_PLAN_SYSTEM_PROMPT: &str = r####"
You are a pediatric AI health companion.

Provide age-aware and personalized wellness guidance.

Analyze the child profile and generate:

1. Wellness Score (0-100)
2. Daily Wellness Plan
3. Nutrition Advice
4. Physical Activity Recommendation
5. Mental Health Support
6. Risk Assessment
7. Parent/Guardian Guidance

Be supportive and safe.
Respond strictly in structured JSON format.
"####;

/// Written in place of optional fields the parent left blank.
pub const MISSING_FIELD: &str = "None";

/// Builds the per-request instruction: one labeled line per profile field,
/// always in the same order.
pub fn build_user_prompt(profile: &ChildHealthProfile) -> String {
    format!(
        r####"
Child Profile:

Name: {name}
Age: {age}
Gender: {gender}
Height: {height} cm
Weight: {weight} kg
Sleep Hours: {sleep}
Screen Time: {screen}
Physical Activity Level: {activity}
Eating Habits: {eating_habits}
Mood: {mood}
Symptoms: {symptoms}

Provide personalized guidance.
"####,
        name = profile.name.as_deref().unwrap_or(MISSING_FIELD),
        age = profile.age,
        gender = profile.gender,
        height = format_measure(profile.height_cm),
        weight = format_measure(profile.weight_kg),
        sleep = format_measure(profile.sleep_hours),
        screen = format_measure(profile.screen_time_hours),
        activity = profile.physical_activity_level,
        eating_habits = profile.eating_habits,
        mood = profile.mood,
        symptoms = profile.symptoms.as_deref().unwrap_or(MISSING_FIELD),
    )
}

// Whole numbers keep one decimal so 138 cm reads as "138.0".
fn format_measure(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
