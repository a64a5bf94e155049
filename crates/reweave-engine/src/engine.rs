//! The run loop
//!
//! Repeatedly scans for ready types (deepest subtree first), dispatches up
//! to the configured number of attempt loops, and commits each completion
//! before re-scanning, since completions unblock new candidates. All
//! mutable state lives on this loop; in-flight tasks hold owned inputs and
//! a shared reference to the oracle, nothing else.

use crate::attempt::{run_attempts, AttemptInput, AttemptVerdict, FailureReason};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::registry::Registry;
use crate::report::{AcceptedComponent, BlockedType, FailedType, RunReport};
use crate::sink::OutputSink;
use crate::state::{validate_transition, TypeState};
use crate::status::StatusArena;
use futures::stream::{FuturesUnordered, StreamExt};
use reweave_extract::{extract, Example, ExtractConfig, UnplacedRegion};
use reweave_graph::ComponentGraph;
use reweave_model::{NodeStatus, RegistryItem, Snapshot, TypeId};
use reweave_oracle::{DependencySignature, RewriteOracle};
use reweave_sandbox::{compile, DependencySource};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// The dependency-aware rewrite engine.
pub struct RewriteEngine<O, S> {
    oracle: O,
    sink: S,
    config: EngineConfig,
}

impl<O: RewriteOracle, S: OutputSink> RewriteEngine<O, S> {
    /// An engine over the given oracle and output sink.
    pub fn new(oracle: O, sink: S, config: EngineConfig) -> Self {
        Self {
            oracle,
            sink,
            config,
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The output sink accepted sources are persisted through.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The oracle the engine dispatches to.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Rewrite every source-backed type the snapshot contains.
    ///
    /// Completes with a partial result rather than failing the run when
    /// individual types fail; only malformed snapshots and cache/sink I/O
    /// abort.
    pub async fn run(&self, snapshot: Arc<Snapshot>) -> Result<RunReport, EngineError> {
        let graph = ComponentGraph::build(snapshot)?;
        tracing::info!(
            types = graph.source_types().len(),
            instances = graph.instance_count(),
            "rewrite run starting"
        );

        let mut states: HashMap<TypeId, TypeState> = graph
            .source_types()
            .iter()
            .map(|t| (*t, TypeState::Unscheduled))
            .collect();
        let mut statuses = StatusArena::new(&graph);
        let mut registry = Registry::new();
        let mut examples_by_type: HashMap<TypeId, Vec<Example>> = HashMap::new();

        let mut report = RunReport {
            ambiguities: graph.ambiguities().to_vec(),
            ..Default::default()
        };

        let extract_config = ExtractConfig {
            max_examples: self.config.max_examples_per_type,
        };

        let mut tasks = FuturesUnordered::new();

        loop {
            while tasks.len() < self.config.max_in_flight {
                let Some(type_id) = next_ready(&graph, &states, &statuses) else {
                    break;
                };
                let current = states[&type_id];
                validate_transition(current, TypeState::InFlight)?;
                states.insert(type_id, TypeState::InFlight);

                let input = self.build_input(&graph, &registry, type_id, &extract_config, &mut report);
                examples_by_type.insert(type_id, input.examples.clone());
                tracing::info!(
                    type_id = %type_id,
                    label = input.name_hint.as_deref().unwrap_or("?"),
                    examples = input.examples.len(),
                    "dispatching rewrite"
                );

                let oracle: &O = &self.oracle;
                let timeout = self.config.task_timeout();
                let max_attempts = self.config.max_attempts;
                tasks.push(async move {
                    let verdict =
                        match tokio::time::timeout(timeout, run_attempts(oracle, &input, max_attempts))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Ok(AttemptVerdict::Failed {
                                reason: FailureReason::TimedOut,
                                last_report: None,
                            }),
                        };
                    (input.type_id, verdict)
                });
            }

            let Some((type_id, verdict)) = tasks.next().await else {
                break;
            };
            let verdict = verdict?;
            self.commit(
                &graph,
                type_id,
                verdict,
                &mut states,
                &mut statuses,
                &mut registry,
                &mut examples_by_type,
                &mut report,
            )?;
        }

        for (&type_id, &state) in &states {
            if state == TypeState::Unscheduled {
                report.blocked.push(BlockedType {
                    type_id,
                    label: type_label(&graph, type_id),
                });
            }
        }
        report.blocked.sort_by(|a, b| a.label.cmp(&b.label));
        report.statuses = statuses.iter().collect();

        tracing::info!(summary = %report, "rewrite run finished");
        Ok(report)
    }

    fn build_input(
        &self,
        graph: &ComponentGraph,
        registry: &Registry,
        type_id: TypeId,
        extract_config: &ExtractConfig,
        report: &mut RunReport,
    ) -> AttemptInput {
        let set = extract(graph, type_id, &registry.names_by_type(), extract_config);
        for unplaced in &set.report.unplaced {
            let note = match unplaced {
                UnplacedRegion::Uncorrelated { instance, path } => format!(
                    "{}: caller-supplied region at `{path}` of instance {instance} left unplaced",
                    set.component
                ),
                UnplacedRegion::NotRendered { instance } => {
                    format!("{}: instance {instance} produced no markup", set.component)
                }
            };
            report.notes.push(note);
        }
        if set.report.truncated > 0 {
            report.notes.push(format!(
                "{}: {} instance(s) beyond the example cap",
                set.component, set.report.truncated
            ));
        }

        let snapshot = graph.snapshot();
        let mut dependency_signatures = Vec::new();
        let mut dependency_sources = Vec::new();
        for dep in graph.internal_deps(type_id) {
            let Some(item) = registry.get(*dep) else {
                continue;
            };
            let public_signature = compile(&item.name, &item.source_text)
                .map(|t| t.public_signature())
                .unwrap_or_else(|_| "()".to_string());
            dependency_signatures.push(DependencySignature {
                name: item.name.clone(),
                public_signature,
                description: item.description.clone(),
            });
            dependency_sources.push(DependencySource {
                name: item.name.clone(),
                description: item.description.clone(),
                source_text: item.source_text.clone(),
            });
        }

        let component_type = snapshot.component_type(type_id);
        let legacy_source = component_type
            .and_then(|t| t.code_id())
            .and_then(|code_id| snapshot.code(code_id))
            .map(|code| code.source.clone())
            .unwrap_or_default();
        let name_hint = component_type.and_then(|t| t.observed_name().map(str::to_string));

        AttemptInput {
            type_id,
            legacy_source,
            name_hint,
            dependency_signatures,
            dependency_sources,
            examples: set.examples,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        graph: &ComponentGraph,
        type_id: TypeId,
        verdict: AttemptVerdict,
        states: &mut HashMap<TypeId, TypeState>,
        statuses: &mut StatusArena,
        registry: &mut Registry,
        examples_by_type: &mut HashMap<TypeId, Vec<Example>>,
        report: &mut RunReport,
    ) -> Result<(), EngineError> {
        let examples = examples_by_type.remove(&type_id).unwrap_or_default();
        match verdict {
            AttemptVerdict::Accepted { candidate, skipped } => {
                validate_transition(states[&type_id], TypeState::Accepted)?;

                let name = registry.unique_name(&candidate.name);
                let item = RegistryItem {
                    type_id,
                    name: name.clone(),
                    description: candidate.description,
                    source_text: candidate.source_text,
                    output_directory: self.config.output_directory.clone(),
                };
                self.sink.write_text(&item.output_path(), &item.source_text)?;

                let skipped_instances: HashSet<_> = skipped
                    .iter()
                    .filter_map(|i| examples.get(*i))
                    .flat_map(|e| e.instances.iter().copied())
                    .collect();
                for &instance in graph.instances_of(type_id) {
                    let status = if skipped_instances.contains(&instance) {
                        NodeStatus::Skipped
                    } else {
                        NodeStatus::Valid
                    };
                    statuses.set(instance, status);
                }

                tracing::info!(type_id = %type_id, name = %name, "type accepted");
                report.accepted.push(AcceptedComponent {
                    type_id,
                    name,
                    path: item.output_path(),
                });
                registry.insert(item);
                states.insert(type_id, TypeState::Accepted);
            }
            AttemptVerdict::Failed { reason, last_report } => {
                validate_transition(states[&type_id], TypeState::Failed)?;

                for &instance in graph.instances_of(type_id) {
                    statuses.set(instance, NodeStatus::Invalid);
                }
                let label = type_label(graph, type_id);
                tracing::warn!(type_id = %type_id, label = %label, %reason, "type failed");
                report.failed.push(FailedType {
                    type_id,
                    label,
                    reason,
                    last_report: last_report.map(|r| r.summary()),
                });
                states.insert(type_id, TypeState::Failed);
            }
        }
        Ok(())
    }
}

/// Deepest-subtree-first scan over unscheduled types whose gating
/// descendants are all resolved. First-seen order breaks depth ties.
fn next_ready(
    graph: &ComponentGraph,
    states: &HashMap<TypeId, TypeState>,
    statuses: &StatusArena,
) -> Option<TypeId> {
    let mut best: Option<(usize, TypeId)> = None;
    for &type_id in graph.source_types() {
        if states.get(&type_id) != Some(&TypeState::Unscheduled) {
            continue;
        }
        let ready = graph.instances_of(type_id).iter().all(|&instance| {
            graph
                .blocking_descendants(instance)
                .iter()
                .all(|&descendant| statuses.is_resolved_ok(descendant))
        });
        if !ready {
            continue;
        }
        let depth = graph.schedule_depth(type_id);
        if best.map_or(true, |(best_depth, _)| depth > best_depth) {
            best = Some((depth, type_id));
        }
    }
    best.map(|(_, type_id)| type_id)
}

fn type_label(graph: &ComponentGraph, type_id: TypeId) -> String {
    graph
        .snapshot()
        .component_type(type_id)
        .and_then(|t| t.observed_name().map(str::to_string))
        .unwrap_or_else(|| type_id.to_string())
}
