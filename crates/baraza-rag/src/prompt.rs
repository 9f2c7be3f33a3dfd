//! Prompt assembly for context-grounded answers.

/// Separator placed between retrieved passages.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Fills the answer template with the retrieved passages and the question.
pub fn build_prompt<S: AsRef<str>>(passages: &[S], question: &str) -> String {
    let context = passages
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<&str>>()
        .join(CONTEXT_SEPARATOR);
    format!(
        "\nAnswer the question based only on the following context:\n\n\
         {context}\n\n---\n\n\
         Answer the question based on the above context: {question}\n"
    )
}
