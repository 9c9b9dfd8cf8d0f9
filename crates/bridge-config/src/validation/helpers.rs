//! Shared validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error unless `value` is an absolute http(s) URL.
pub(crate) fn validate_url(errors: &mut Vec<String>, name: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(format!(
            "{name} = {value:?} has unsupported scheme {:?}",
            url.scheme()
        )),
        Err(e) => errors.push(format!("{name} = {value:?} is not a valid URL: {e}")),
    }
}
