//! Handle naming and node validation tests
mod common;
use common::*;
use lessonflow::error::ValidationError;
use lessonflow::schema::{
    defines_source_handle, normalize_handle, port_for_source_handle, source_handles, validate_node,
};

#[cfg(test)]
mod schema_tests {
    use super::*;

    #[test]
    fn test_handles_follow_port_ids() {
        let node = choice("c1", &[("o1", "A"), ("o-2", "B")]);
        assert_eq!(
            source_handles(&node),
            vec!["choice-out-o1".to_string(), "choice-out-o-2".to_string()]
        );
        assert_eq!(source_handles(&quiz("q")), vec!["correct", "incorrect"]);
    }

    #[test]
    fn test_port_lookup_accepts_dashes_in_port_ids() {
        let node = choice("c1", &[("o1", "A"), ("o-2", "B")]);
        let port = port_for_source_handle(&node, "choice-out-o-2").unwrap();
        assert_eq!(port.text, "B");
        assert!(port_for_source_handle(&node, "activity-out-o1").is_none());
        assert!(!defines_source_handle(&node, "choice-out-o3"));
    }

    #[test]
    fn test_blank_handles_normalize_to_none() {
        assert_eq!(normalize_handle(Some("  ")), None);
        assert_eq!(normalize_handle(Some("x")), Some("x"));
        assert_eq!(normalize_handle(None), None);
    }

    #[test]
    fn test_blank_label_fails_validation() {
        let mut node = narration("n");
        validate_node(&node).unwrap();

        node.label = " \t".to_string();
        match validate_node(&node).unwrap_err() {
            ValidationError::MissingField { record, field } => {
                assert_eq!(record, "node 'n'");
                assert_eq!(field, "label");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
