use uuid::Uuid;

/// Trim a user supplied name. Case is kept as typed.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// Comparison key for names: trimmed, then full Unicode case fold
/// (`ß` folds to `ss`, final sigma to `σ`).
pub fn name_key(name: &str) -> String {
    caseless::default_case_fold_str(name.trim())
}

/// Check whether `candidate` collides with an existing name, ignoring
/// the entity `skip_id` (the one being renamed).
pub fn name_taken<'a>(
    existing: impl IntoIterator<Item = (Uuid, &'a str)>,
    candidate: &str,
    skip_id: Option<Uuid>,
) -> bool {
    let candidate_key = name_key(candidate);
    existing
        .into_iter()
        .filter(|(id, _)| Some(*id) != skip_id)
        .any(|(_, name)| name_key(name) == candidate_key)
}
