// Prompts for skill suggestion.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

pub fn suggest_skills_prompt(text: &str) -> String {
    format!(
        "A handyman worker described their experience below. \
         List the concrete trade skills it shows, as short noun phrases \
         (for example \"Pipe Fitting\", \"Drywall Repair\"). \
         Do not invent skills the text does not support.\n\n\
         Respond with: {{\"suggested_skills\": [\"...\"]}}\n\n\
         Experience:\n{text}"
    )
}
