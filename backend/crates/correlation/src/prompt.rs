use std::borrow::Cow;
use std::fmt::Write;

use ctxwatch_db::anomaly::models::Severity;
use ctxwatch_db::context::models::ContextSignal;

/// Cut `text` to at most `budget` characters, appending "..." when anything
/// was dropped. Counts chars, not bytes.
pub fn truncate_chars(text: &str, budget: usize) -> Cow<'_, str> {
    match text.char_indices().nth(budget) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => Cow::Owned(format!("{}...", &text[..byte_idx])),
    }
}

fn push_signal(out: &mut String, label: &str, signal: &ContextSignal, budget: usize) {
    let _ = write!(out, "{label}: {}.", truncate_chars(&signal.name, budget));
    if let Some(desc) = signal.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = write!(out, " {}", truncate_chars(desc.trim(), budget));
    }
    out.push('\n');
}

/// Build the classification prompt. Each context item's text is bounded by
/// `char_budget`, so request size grows linearly with the number of items.
pub fn build_prompt(
    event_name: &str,
    deviation_pct: f64,
    severity: Severity,
    campaigns: &[ContextSignal],
    news: &[ContextSignal],
    char_budget: usize,
) -> String {
    let mut context = String::new();
    for campaign in campaigns {
        push_signal(&mut context, "Campaign", campaign, char_budget);
    }
    for item in news {
        push_signal(&mut context, "News", item, char_budget);
    }
    if context.is_empty() {
        context.push_str("(none)\n");
    }

    format!(
        "Return ONLY valid JSON.\n\
         No markdown.\n\
         No explanations.\n\
         \n\
         Format:\n\
         {{\"decision\":\"INFLUENCED\"}}\n\
         OR\n\
         {{\"decision\":\"NOT_INFLUENCED\"}}\n\
         \n\
         Event: {event_name}\n\
         Deviation: {deviation_pct:.2} percent\n\
         Severity: {severity}\n\
         \n\
         Context:\n\
         {context}\n\
         Does this context plausibly explain the anomaly?\n"
    )
}
