// Instruction template filled for every execution

/// Marker preceding the fetched content in a composed prompt
pub const CONTENT_LABEL: &str = "\nContent:\n";

/// Fill the fixed template: specialization preamble, user prompt, then content
pub fn compose(task: &str, user_prompt: &str, content: &str) -> String {
    format!(
        "You are an AI assistant specialized in {}. {}{}{}",
        task, user_prompt, CONTENT_LABEL, content
    )
}

/// Content segment of a composed prompt
pub fn content_segment(prompt: &str) -> Option<&str> {
    prompt
        .find(CONTENT_LABEL)
        .map(|idx| &prompt[idx + CONTENT_LABEL.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_template_in_order() {
        let prompt = compose("summarising news", "Give me three bullets.", "Body text");
        assert_eq!(
            prompt,
            "You are an AI assistant specialized in summarising news. Give me three bullets.\nContent:\nBody text"
        );
    }

    #[test]
    fn content_segment_is_everything_after_the_label() {
        let prompt = compose("task", "prompt", "line one\nline two");
        assert_eq!(content_segment(&prompt), Some("line one\nline two"));
    }
}
