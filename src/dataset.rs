//! Dataset tokens
//!
//! A dataset is a hierarchical scope for stored records, written as backslash-delimited
//! levels with a leading backslash (`\level1\level2`). The root dataset is a single
//! backslash. Inputs may omit the leading separator.

use crate::error::ContextError;

/// Level separator
pub const SEPARATOR: char = '\\';

/// Root dataset consists of a single separator
pub fn root() -> String {
    SEPARATOR.to_string()
}

/// Split a dataset token into validated levels; the root dataset has no levels
pub fn to_levels(dataset: &str) -> Result<Vec<String>, ContextError> {
    if dataset.is_empty() || dataset == root() {
        return Ok(Vec::new());
    }
    let trimmed = dataset.strip_prefix(SEPARATOR).unwrap_or(dataset);
    trimmed
        .split(SEPARATOR)
        .map(|level| validate_level(level, dataset).map(str::to_string))
        .collect()
}

/// Combine datasets in order, each of which may contain several levels
pub fn combine<S: AsRef<str>>(datasets: &[S]) -> Result<String, ContextError> {
    let mut levels = Vec::new();
    for dataset in datasets {
        levels.extend(to_levels(dataset.as_ref())?);
    }
    Ok(from_levels(&levels))
}

/// Normalize a dataset token to its canonical form with a leading separator
pub fn normalize(dataset: &str) -> Result<String, ContextError> {
    Ok(from_levels(&to_levels(dataset)?))
}

/// The dataset itself followed by each of its ancestors, ending with root
pub fn to_lookup_list(dataset: &str) -> Result<Vec<String>, ContextError> {
    let levels = to_levels(dataset)?;
    Ok((0..=levels.len())
        .rev()
        .map(|depth| from_levels(&levels[..depth]))
        .collect())
}

fn from_levels<S: AsRef<str>>(levels: &[S]) -> String {
    let mut result = root();
    let joined = levels
        .iter()
        .map(|l| l.as_ref())
        .collect::<Vec<_>>()
        .join(&SEPARATOR.to_string());
    result.push_str(&joined);
    result
}

fn validate_level<'a>(level: &'a str, dataset: &str) -> Result<&'a str, ContextError> {
    if level.is_empty() {
        return Err(ContextError::Dataset(format!(
            "Dataset '{}' has an empty level (leading, trailing or repeated separator)",
            dataset
        )));
    }
    if level.starts_with(' ') || level.ends_with(' ') {
        return Err(ContextError::Dataset(format!(
            "Dataset level '{}' has a leading or trailing space",
            level
        )));
    }
    if level.chars().any(char::is_control) {
        return Err(ContextError::Dataset(format!(
            "Dataset level {:?} contains a control character",
            level
        )));
    }
    Ok(level)
}
