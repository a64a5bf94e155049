use crate::usage::UsageExpression;
use reweave_graph::ComponentGraph;
use reweave_model::{InstanceId, MarkupNode, PropPath, PropValue, TypeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Extraction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Cap on deduplicated examples per type, first-seen order.
    pub max_examples: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { max_examples: 8 }
    }
}

/// One verifiable input/output pair for a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// The invocation to evaluate.
    pub usage: UsageExpression,
    /// The markup the invocation must reproduce.
    pub expected: MarkupNode,
    /// Instances collapsed into this example by deduplication.
    pub instances: Vec<InstanceId>,
}

/// A caller-supplied region that could not be placed, or an instance whose
/// rendered output was not found. Degrades quality, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedRegion {
    /// Embedded element with no correlated markup region.
    Uncorrelated {
        /// Carrier whose example degrades.
        instance: InstanceId,
        /// Prop path the element sits at.
        path: PropPath,
    },
    /// The instance produced no markup in this observation.
    NotRendered {
        /// The instance without rendered output.
        instance: InstanceId,
    },
}

/// What extraction had to gloss over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractReport {
    /// Regions left unplaced, per instance.
    pub unplaced: Vec<UnplacedRegion>,
    /// Instances dropped by the example cap.
    pub truncated: usize,
}

/// All examples extracted for one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleSet {
    /// Type the examples exercise.
    pub type_id: TypeId,
    /// Invocation label used in usage expressions (observed name when known).
    pub component: String,
    /// Deduplicated examples, first-seen order.
    pub examples: Vec<Example>,
    /// Degradations observed while extracting.
    pub report: ExtractReport,
}

impl ExampleSet {
    /// Whether no example could be extracted.
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Every instance covered by any example.
    pub fn instances(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.examples.iter().flat_map(|e| e.instances.iter().copied())
    }
}

/// Build the example set for `type_id`.
///
/// `accepted` maps already-accepted dependency types to their registry
/// names; regions rendered by those types collapse into opaque references.
pub fn extract(
    graph: &ComponentGraph,
    type_id: TypeId,
    accepted: &BTreeMap<TypeId, String>,
    config: &ExtractConfig,
) -> ExampleSet {
    let snapshot = graph.snapshot();
    let component = component_label(graph, type_id);

    let mut report = ExtractReport::default();
    let mut examples: Vec<Example> = Vec::new();
    let mut seen: HashMap<blake3::Hash, usize> = HashMap::new();

    for &instance_id in graph.instances_of(type_id) {
        let Some(instance) = snapshot.instance(instance_id) else {
            continue;
        };
        let Some(subtree) = snapshot.markup.find_instance(instance_id) else {
            report.unplaced.push(UnplacedRegion::NotRendered {
                instance: instance_id,
            });
            continue;
        };

        let mut props = instance.props.clone();
        let mut expected = subtree.clone();

        // Caller-supplied regions become placeholders in both copies. Paths
        // arrive in walk order, so an outer placeholder swallows nested ones.
        let mut placed: Vec<PropPath> = Vec::new();
        for correlation in graph.correlations(instance_id) {
            if placed.iter().any(|p| correlation.path.starts_with(p)) {
                continue;
            }
            let placeholder = PropValue::Placeholder {
                path: correlation.path.clone(),
            };
            if props.replace_at(&correlation.path, placeholder).is_err() {
                continue;
            }
            expected.replace_instance(
                correlation.matched,
                &MarkupNode::Placeholder {
                    path: correlation.path.clone(),
                },
            );
            placed.push(correlation.path.clone());
        }

        // Elements that never rendered still become placeholders on the prop
        // side; the missing markup region is reported.
        for unplaced in graph.uncorrelated() {
            if unplaced.carrier != instance_id {
                continue;
            }
            if placed.iter().any(|p| unplaced.path.starts_with(p)) {
                continue;
            }
            let placeholder = PropValue::Placeholder {
                path: unplaced.path.clone(),
            };
            if props.replace_at(&unplaced.path, placeholder).is_ok() {
                placed.push(unplaced.path.clone());
                report.unplaced.push(UnplacedRegion::Uncorrelated {
                    instance: instance_id,
                    path: unplaced.path.clone(),
                });
            }
        }

        // Deeper instances of accepted types appear as composition, not raw
        // markup. Pre-order: collapsing an outer region drops its interior.
        for &descendant in graph.descendants(instance_id) {
            let Some(descendant_instance) = snapshot.instance(descendant) else {
                continue;
            };
            let Some(name) = accepted.get(&descendant_instance.type_id) else {
                continue;
            };
            expected.replace_instance(
                descendant,
                &MarkupNode::Reference {
                    name: name.clone(),
                    props: descendant_instance.props.clone(),
                },
            );
        }

        expected.strip_instances();

        let usage = UsageExpression::new(component.clone(), props);
        let example = Example {
            usage,
            expected,
            instances: vec![instance_id],
        };

        match fingerprint(&example) {
            Some(hash) => match seen.get(&hash) {
                Some(&idx) => examples[idx].instances.push(instance_id),
                None => {
                    if examples.len() < config.max_examples {
                        seen.insert(hash, examples.len());
                        examples.push(example);
                    } else {
                        report.truncated += 1;
                    }
                }
            },
            None => {
                // Unserializable props (non-finite numbers): keep the
                // example if room remains, skipping deduplication.
                if examples.len() < config.max_examples {
                    examples.push(example);
                } else {
                    report.truncated += 1;
                }
            }
        }
    }

    tracing::debug!(
        %type_id,
        component = %component,
        examples = examples.len(),
        truncated = report.truncated,
        "extracted examples"
    );

    ExampleSet {
        type_id,
        component,
        examples,
        report,
    }
}

fn component_label(graph: &ComponentGraph, type_id: TypeId) -> String {
    graph
        .snapshot()
        .component_type(type_id)
        .and_then(|t| t.observed_name().map(str::to_string))
        .unwrap_or_else(|| format!("Component{}", short_id(type_id)))
}

fn short_id(type_id: TypeId) -> String {
    type_id.0.simple().to_string()[..8].to_string()
}

fn fingerprint(example: &Example) -> Option<blake3::Hash> {
    let usage = example.usage.canonical_json().ok()?;
    let expected = serde_json::to_vec(&example.expected).ok()?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(usage.as_bytes());
    hasher.update(&[0]);
    hasher.update(&expected);
    Some(hasher.finalize())
}
