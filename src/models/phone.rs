/// Canonical form of a buyer phone number.
///
/// Buyers are keyed by phone, so the same number must always land on the same
/// cart, bargains and orders. Nigerian international numbers (`+234...`) are
/// folded into their local `0...` form.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("+234") {
        Some(rest) => format!("0{rest}"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_international_prefix() {
        assert_eq!(normalize_phone("+2348161234567"), "08161234567");
    }

    #[test]
    fn trims_local_numbers() {
        assert_eq!(normalize_phone("  08161234567 "), "08161234567");
    }
}
