pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Correlation ids travel on the wire and are echoed back verbatim by the
/// wallet, so they are full UUIDs rather than short tokens.
pub fn new_correlation_id() -> String {
    new_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn correlation_id_is_uuid() {
        let cid = new_correlation_id();
        assert_eq!(cid.len(), 36);
        assert!(uuid::Uuid::parse_str(&cid).is_ok());
    }

    #[test]
    fn correlation_ids_do_not_repeat() {
        use std::collections::HashSet;
        let ids: HashSet<String> = (0..256).map(|_| new_correlation_id()).collect();
        assert_eq!(ids.len(), 256);
    }
}
