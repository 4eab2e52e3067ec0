use crate::types::UserSteps;

/// Build the embedding input for a bug.
///
/// Produces `"{title} {description} {steps} {step1} {step2}"` with an empty
/// string for every absent part. No trimming or case folding is applied, so
/// equal inputs always give byte-identical output.
pub fn normalize(
    title: &str,
    description: &str,
    steps: Option<&str>,
    user_steps: Option<&UserSteps>,
) -> String {
    let steps = steps.unwrap_or_default();
    let step1 = user_steps
        .and_then(|u| u.step1.as_deref())
        .unwrap_or_default();
    let step2 = user_steps
        .and_then(|u| u.step2.as_deref())
        .unwrap_or_default();
    format!("{title} {description} {steps} {step1} {step2}")
}
