//! Candidate validation
//!
//! Compile the candidate and its accepted dependencies into one isolated
//! module set, render every non-skipped example, and diff canonically.
//! Acceptance requires zero diff and zero captured warnings; compilation
//! failures are their own report partition and short-circuit rendering.

use crate::canonical::{canonicalize, canonicalize_all};
use crate::compile::compile;
use crate::diff::{diff_nodes, DiffEntry};
use crate::modules::ModuleSet;
use crate::render::{render, RuntimeWarning};
use reweave_extract::Example;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A component proposed by the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Proposed component name.
    pub name: String,
    /// What the component does, in the oracle's words.
    pub description: String,
    /// The proposed template source.
    pub source_text: String,
}

/// An already-accepted dependency, as handed to the sandbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencySource {
    /// Accepted component name.
    pub name: String,
    /// Accepted description.
    pub description: String,
    /// Accepted template source.
    pub source_text: String,
}

/// Warnings captured while evaluating one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleWarnings {
    /// Index into the validated example list.
    pub example: usize,
    /// Everything captured during that evaluation.
    pub warnings: Vec<RuntimeWarning>,
}

/// Canonical diff entries for one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleDiff {
    /// Index into the validated example list.
    pub example: usize,
    /// Non-empty diff against the expected output.
    pub entries: Vec<DiffEntry>,
}

/// Structured validation feedback; on rejection this becomes the next
/// oracle turn's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Candidate or dependency compilation failures.
    pub compilation_errors: Vec<String>,
    /// Warnings captured during example evaluation.
    pub runtime_warnings: Vec<ExampleWarnings>,
    /// Per-example semantic diffs.
    pub mismatches: Vec<ExampleDiff>,
}

impl ValidationReport {
    /// Whether nothing blocked acceptance.
    pub fn is_clean(&self) -> bool {
        self.compilation_errors.is_empty()
            && self.runtime_warnings.is_empty()
            && self.mismatches.is_empty()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} compile error(s), {} example(s) with warnings, {} example(s) with diffs",
            self.compilation_errors.len(),
            self.runtime_warnings.len(),
            self.mismatches.len()
        )
    }
}

/// Result of one validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationOutcome {
    /// Zero diff and zero warnings on every non-skipped example.
    pub accepted: bool,
    /// The structured feedback, empty on acceptance.
    pub report: ValidationReport,
}

/// Validate `candidate` against `examples`, skipping the indices in `skip`
/// (examples the oracle declared unsatisfiable for this attempt).
pub fn validate(
    candidate: &Candidate,
    dependencies: &[DependencySource],
    examples: &[Example],
    skip: &HashSet<usize>,
) -> ValidationOutcome {
    let mut report = ValidationReport::default();
    let mut modules = ModuleSet::new();

    for dependency in dependencies {
        match compile(&dependency.name, &dependency.source_text) {
            Ok(template) => {
                if let Err(err) = modules.insert(template) {
                    report.compilation_errors.push(err.to_string());
                }
            }
            Err(err) => report
                .compilation_errors
                .push(format!("dependency {}: {err}", dependency.name)),
        }
    }

    let template = match compile(&candidate.name, &candidate.source_text) {
        Ok(template) => {
            if let Err(err) = modules.link(&template) {
                report.compilation_errors.push(err.to_string());
            }
            Some(template)
        }
        Err(err) => {
            report.compilation_errors.push(err.to_string());
            None
        }
    };

    let (Some(template), true) = (template, report.compilation_errors.is_empty()) else {
        tracing::debug!(candidate = %candidate.name, "candidate failed to compile");
        return ValidationOutcome {
            accepted: false,
            report,
        };
    };

    for (index, example) in examples.iter().enumerate() {
        if skip.contains(&index) {
            continue;
        }
        let output = render(&template, &example.usage.props, &modules);
        if !output.warnings.is_empty() {
            report.runtime_warnings.push(ExampleWarnings {
                example: index,
                warnings: output.warnings,
            });
        }

        let expected: Vec<_> = canonicalize(&example.expected).into_iter().collect();
        let actual = canonicalize_all(&output.nodes);
        let entries = diff_nodes(&expected, &actual);
        if !entries.is_empty() {
            report.mismatches.push(ExampleDiff {
                example: index,
                entries,
            });
        }
    }

    let accepted = report.is_clean();
    tracing::debug!(
        candidate = %candidate.name,
        accepted,
        summary = %report.summary(),
        "validated candidate"
    );
    ValidationOutcome { accepted, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reweave_extract::UsageExpression;
    use reweave_model::{
        InstanceId, MarkupElement, MarkupNode, PropPath, PropValue, Props,
    };

    fn example(props: Props, expected: MarkupNode) -> Example {
        Example {
            usage: UsageExpression::new("Test", props),
            expected,
            instances: vec![InstanceId::new()],
        }
    }

    fn candidate(source: &str) -> Candidate {
        Candidate {
            name: "Test".to_string(),
            description: "test".to_string(),
            source_text: source.to_string(),
        }
    }

    #[test]
    fn accepts_matching_candidate() {
        let expected = MarkupNode::Element(
            MarkupElement::new("span")
                .with_attr("class", "badge")
                .with_child(MarkupNode::text("New")),
        );
        let outcome = validate(
            &candidate("<span class=\"badge\">{label}</span>"),
            &[],
            &[example(
                Props::new().with("label", PropValue::text("New")),
                expected,
            )],
            &HashSet::new(),
        );
        assert!(outcome.accepted, "report: {:?}", outcome.report);
    }

    #[test]
    fn rejects_semantic_mismatch_with_diff() {
        let expected = MarkupNode::Element(
            MarkupElement::new("span").with_child(MarkupNode::text("New")),
        );
        let outcome = validate(
            &candidate("<b>{label}</b>"),
            &[],
            &[example(
                Props::new().with("label", PropValue::text("New")),
                expected,
            )],
            &HashSet::new(),
        );
        assert!(!outcome.accepted);
        assert!(outcome.report.compilation_errors.is_empty());
        assert_eq!(outcome.report.mismatches.len(), 1);
    }

    #[test]
    fn compile_failure_reported_as_its_own_kind() {
        let outcome = validate(
            &candidate("<div>{broken</div>"),
            &[],
            &[],
            &HashSet::new(),
        );
        assert!(!outcome.accepted);
        assert!(!outcome.report.compilation_errors.is_empty());
        assert!(outcome.report.mismatches.is_empty());
    }

    #[test]
    fn unresolved_dependency_is_compile_error() {
        let outcome = validate(
            &candidate("<div><Ghost/></div>"),
            &[],
            &[],
            &HashSet::new(),
        );
        assert!(!outcome.accepted);
        assert!(outcome.report.compilation_errors[0].contains("Ghost"));
    }

    #[test]
    fn warnings_block_acceptance() {
        let expected = MarkupNode::Element(MarkupElement::new("span"));
        let outcome = validate(
            &candidate("<span>{missing}</span>"),
            &[],
            &[example(Props::new(), expected)],
            &HashSet::new(),
        );
        assert!(!outcome.accepted);
        assert_eq!(outcome.report.runtime_warnings.len(), 1);
    }

    #[test]
    fn skipped_examples_do_not_gate() {
        let bad = example(
            Props::new(),
            MarkupNode::Element(MarkupElement::new("nope")),
        );
        let good = example(
            Props::new().with("label", PropValue::text("x")),
            MarkupNode::Element(
                MarkupElement::new("span").with_child(MarkupNode::text("x")),
            ),
        );
        let outcome = validate(
            &candidate("<span>{label}</span>"),
            &[],
            &[bad, good],
            &HashSet::from([0]),
        );
        assert!(outcome.accepted, "report: {:?}", outcome.report);
    }

    #[test]
    fn placeholder_roundtrip_accepted() {
        let path: PropPath = "content".parse().unwrap();
        let expected = MarkupNode::Element(
            MarkupElement::new("div")
                .with_attr("class", "card")
                .with_child(MarkupNode::Placeholder { path: path.clone() }),
        );
        let outcome = validate(
            &candidate("<div class=\"card\">{content}</div>"),
            &[],
            &[example(
                Props::new().with("content", PropValue::Placeholder { path }),
                expected,
            )],
            &HashSet::new(),
        );
        assert!(outcome.accepted, "report: {:?}", outcome.report);
    }

    #[test]
    fn dependency_reference_props_compared() {
        let expected = MarkupNode::Element(
            MarkupElement::new("div").with_child(MarkupNode::Reference {
                name: "Badge".to_string(),
                props: Props::new().with("label", PropValue::text("New")),
            }),
        );
        let dependency = DependencySource {
            name: "Badge".to_string(),
            description: "badge".to_string(),
            source_text: "<span class=\"badge\">{label}</span>".to_string(),
        };

        let ok = validate(
            &candidate("<div><Badge label={label}/></div>"),
            &[dependency.clone()],
            &[example(
                Props::new().with("label", PropValue::text("New")),
                expected.clone(),
            )],
            &HashSet::new(),
        );
        assert!(ok.accepted, "report: {:?}", ok.report);

        // Wrong literal prop value surfaces as a reference mismatch.
        let wrong = validate(
            &candidate("<div><Badge label=\"Old\"/></div>"),
            &[dependency],
            &[example(
                Props::new().with("label", PropValue::text("New")),
                expected,
            )],
            &HashSet::new(),
        );
        assert!(!wrong.accepted);
        assert_eq!(wrong.report.mismatches.len(), 1);
    }
}
