//! Post-processing applied to raw generator output.

use crate::prompt::{QUESTION_MARKER, RESPONSE_CUE};

/// Generated answers shorter than this (in characters) are discarded.
pub const MIN_ANSWER_CHARS: usize = 10;

/// Substituted for empty or too-short generations.
pub const CLARIFICATION_MESSAGE: &str = "I apologize, but I couldn't generate a relevant answer. \
Could you please rephrase your question or provide more details?";

/// Appended to answers that don't already point the user at HR.
pub const CONTACT_CLOSING: &str = " If you need any clarification or have additional questions, \
please don't hesitate to contact the HR department.";

/// Lower-case phrases that count as already inviting further contact.
pub const CONTACT_PHRASES: [&str; 4] = [
    "contact hr",
    "reach out",
    "let me know",
    "contact the hr department",
];

const TERMINAL_PUNCTUATION: [char; 3] = ['.', '!', '?'];

/// Reduce the decoded sequence to the model's answer: drop the echoed
/// prompt, anything from the first invented `Question:` turn onwards, and
/// anything up to the last `Response:` cue.
pub fn extract_answer(raw: &str, prompt: &str) -> String {
    let stripped = if prompt.is_empty() {
        raw.to_owned()
    } else {
        raw.replace(prompt, "")
    };
    let before_next_turn = stripped
        .trim()
        .split(QUESTION_MARKER)
        .next()
        .unwrap_or_default()
        .trim();
    before_next_turn
        .rsplit(RESPONSE_CUE)
        .next()
        .unwrap_or_default()
        .trim()
        .to_owned()
}

/// Validate, punctuate and enrich an extracted answer. Degenerate output is
/// replaced by [`CLARIFICATION_MESSAGE`] verbatim.
pub fn finalize(answer: String) -> String {
    if answer.chars().count() < MIN_ANSWER_CHARS {
        return CLARIFICATION_MESSAGE.to_owned();
    }
    ensure_contact_closing(ensure_terminal_punctuation(answer))
}

pub fn ensure_terminal_punctuation(mut answer: String) -> String {
    if !answer.ends_with(TERMINAL_PUNCTUATION) {
        answer.push('.');
    }
    answer
}

pub fn ensure_contact_closing(mut answer: String) -> String {
    if !mentions_contact(&answer) {
        answer.push_str(CONTACT_CLOSING);
    }
    answer
}

fn mentions_contact(answer: &str) -> bool {
    let lower = answer.to_lowercase();
    CONTACT_PHRASES.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::prompt::build_prompt;

    #[test]
    fn echoed_prompt_is_removed() {
        let prompt = build_prompt("Can I carry over vacation days?");
        let raw = format!("{prompt} Up to five days carry over each year.");
        assert_eq!(
            extract_answer(&raw, &prompt),
            "Up to five days carry over each year."
        );
    }

    #[test]
    fn invented_follow_up_turns_are_cut() {
        let raw = "Speak with payroll first.\n\nQuestion: what else?\nResponse: nothing";
        assert_eq!(extract_answer(raw, "unrelated"), "Speak with payroll first.");
    }

    #[test]
    fn text_after_last_response_cue_is_kept() {
        let raw = "junk Response: more junk Response:   The answer.  ";
        assert_eq!(extract_answer(raw, ""), "The answer.");
    }

    #[test]
    fn short_output_becomes_clarification() {
        assert_eq!(finalize("Yes".into()), CLARIFICATION_MESSAGE);
        assert_eq!(finalize(String::new()), CLARIFICATION_MESSAGE);
    }

    #[test]
    fn nine_chars_is_too_short_ten_is_enough() {
        assert_eq!(finalize("123456789".into()), CLARIFICATION_MESSAGE);
        assert!(finalize("1234567890".into()).starts_with("1234567890."));
    }

    #[test]
    fn missing_punctuation_gets_a_period() {
        assert_eq!(ensure_terminal_punctuation("Ask your manager".into()), "Ask your manager.");
        assert_eq!(ensure_terminal_punctuation("Really?".into()), "Really?");
        assert_eq!(ensure_terminal_punctuation("Great!".into()), "Great!");
    }

    #[test]
    fn closing_added_only_once() {
        let once = ensure_contact_closing("Ask your manager.".into());
        assert!(once.ends_with(CONTACT_CLOSING));
        let twice = ensure_contact_closing(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn existing_contact_phrase_suppresses_closing() {
        for answer in [
            "Please Contact HR for details.",
            "Feel free to reach out to payroll.",
            "Let me know if that helps!",
        ] {
            assert_eq!(ensure_contact_closing(answer.into()), answer);
        }
    }
}
