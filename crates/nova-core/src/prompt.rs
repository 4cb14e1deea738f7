//! Prompt template fed to the generator when no canned answer matches.

/// Persona plus the five style directives.
pub const SYSTEM_MESSAGE: &str = "You are a professional HR Assistant. Your responses should be:
1. Clear and concise
2. Professional and helpful
3. Based on standard HR practices
4. Empathetic and supportive
5. Include specific steps when applicable";

/// Marks the start of a question turn. Generated text is cut at its first
/// recurrence so invented follow-up turns are dropped.
pub const QUESTION_MARKER: &str = "Question:";

/// Cue the model is expected to continue.
pub const RESPONSE_CUE: &str = "Response:";

const INSTRUCTION: &str = "Please provide a professional HR response. Focus on being helpful and specific. \
If you need more information to provide a complete answer, ask for clarification.";

/// Render the full generation prompt for `question`.
pub fn build_prompt(question: &str) -> String {
    format!("{SYSTEM_MESSAGE}\n\n{QUESTION_MARKER} {question}\n\n{INSTRUCTION}\n\n{RESPONSE_CUE}")
}
