use serde_json::Value;

/// Turns a response key into a display label.
///
/// Handles camelCase (`dailyWellnessPlan` -> `Daily Wellness Plan`),
/// snake_case (`risk_assessment` -> `Risk Assessment`) and keys that are
/// already space separated. A run of capitals is treated as one word and an
/// all-caps word is kept as-is, so `BMI` stays `BMI` and `BMIScore` becomes
/// `BMI Score`.
pub fn format_key(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = key.chars().collect();
    let mut spaced = String::with_capacity(key.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower =
                chars.get(i + 1).is_some_and(|next| next.is_lowercase());
            if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                spaced.push(' ');
            }
        }
        spaced.push(c);
    }

    title_case(&spaced.replace('_', " "))
}

// A word is a maximal run of letters; everything else passes through.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    for c in text.chars() {
        if c.is_alphabetic() {
            word.push(c);
        } else {
            push_title_word(&mut out, &word);
            word.clear();
            out.push(c);
        }
    }
    push_title_word(&mut out, &word);
    out
}

fn push_title_word(out: &mut String, word: &str) {
    let is_acronym =
        word.chars().count() > 1 && word.chars().all(char::is_uppercase);
    if is_acronym {
        out.push_str(word);
        return;
    }

    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.extend(chars.flat_map(char::to_lowercase));
    }
}

/// Renders a JSON value of unknown shape as markdown.
///
/// Mappings become `**Heading**` blocks for nested values and
/// `- **Label:** value` bullets for scalars, sequences become `- item`
/// bullets. Key order follows the document. `level` tracks nesting depth and
/// does not affect the output yet.
#[allow(clippy::only_used_in_recursion)]
pub fn render_value(value: &Value, level: usize) -> String {
    match value {
        Value::Null => String::new(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) | Value::Array(_) => {
                    render_value(item, level + 1)
                }
                scalar => format!("- {}", scalar_text(scalar)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => {
            let mut lines = Vec::with_capacity(map.len() * 2);
            for (key, nested) in map {
                let title = format_key(key);
                match nested {
                    Value::Object(_) | Value::Array(_) => {
                        lines.push(format!("\n**{}**\n", title));
                        lines.push(render_value(nested, level + 1));
                    }
                    scalar => lines.push(format!(
                        "- **{}:** {}",
                        title,
                        scalar_text(scalar)
                    )),
                }
            }
            lines.join("\n").trim().to_string()
        }
        Value::Bool(flag) => flag.to_string(),
    }
}

// Scalars inside bullets are written untrimmed; null reads as "None", the
// same spelling the prompt uses for missing fields.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
