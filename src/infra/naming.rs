// ============================================================
// Layer 6: Naming-Rule Conversion
// ============================================================
// Model and dataset classes are registered under UpperCamelCase
// names while file and directory names use under_score_rule.
//
//   "CAW"            → "c_a_w"
//   "UpperCamelCase" → "upper_camel_case"

use crate::domain::error::{PipelineError, Result};

/// Convert a name between naming conventions.
///
/// Only `upper_camel_case` → `under_score_rule` is supported; any other
/// rule pair fails with `NotImplemented`. The input is assumed to follow
/// `origin_rule` and is not checked.
///
/// ```
/// use tgl_pipeline::infra::naming::trans_naming_rule;
///
/// let name = trans_naming_rule("UpperCamelCase", "upper_camel_case", "under_score_rule").unwrap();
/// assert_eq!(name, "upper_camel_case");
/// ```
pub fn trans_naming_rule(origin: &str, origin_rule: &str, target_rule: &str) -> Result<String> {
    match (origin_rule, target_rule) {
        ("upper_camel_case", "under_score_rule") => Ok(camel_to_underscore(origin)),
        _ => Err(PipelineError::NotImplemented(format!(
            "naming rule conversion '{origin_rule}' -> '{target_rule}'; only \
             upper_camel_case -> under_score_rule is supported"
        ))),
    }
}

fn camel_to_underscore(origin: &str) -> String {
    let mut target = String::with_capacity(origin.len() + 4);
    for (i, c) in origin.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            target.push('_');
        }
        target.extend(c.to_lowercase());
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_camel_to_underscore() {
        let out = trans_naming_rule("UpperCamelCase", "upper_camel_case", "under_score_rule");
        assert_eq!(out.unwrap(), "upper_camel_case");
    }

    #[test]
    fn test_evaluator_class_name() {
        let out = trans_naming_rule("LinkPredictionEvaluator", "upper_camel_case", "under_score_rule");
        assert_eq!(out.unwrap(), "link_prediction_evaluator");
    }

    #[test]
    fn test_consecutive_capitals_each_get_separator() {
        let out = trans_naming_rule("CAW", "upper_camel_case", "under_score_rule");
        assert_eq!(out.unwrap(), "c_a_w");
    }

    #[test]
    fn test_empty_name() {
        let out = trans_naming_rule("", "upper_camel_case", "under_score_rule");
        assert_eq!(out.unwrap(), "");
    }

    #[test]
    fn test_unsupported_pair() {
        let err = trans_naming_rule("upper_camel_case", "under_score_rule", "upper_camel_case")
            .unwrap_err();
        assert!(matches!(err, PipelineError::NotImplemented(_)));
    }
}
