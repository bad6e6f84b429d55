//! Four-column projection of a snapshot

use serde::Serialize;
use ztsan_types::{Node, Stage, Status};

use crate::snapshot::Snapshot;

/// Aggregate counts by node status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub active: usize,
    pub blocked: usize,
    /// Everything that is neither active nor blocked, including unknown status
    pub other: usize,
}

/// Nodes partitioned by pipeline stage
///
/// Built fresh from each snapshot; carries nothing over between polls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineView {
    /// Indexed by [`Stage::index`]; backend order preserved within a bucket
    buckets: [Vec<Node>; 4],
    pub counts: StatusCounts,
    /// Nodes whose stage was absent or unknown; counted but not rendered
    pub unstaged: usize,
}

impl PipelineView {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::from_nodes(&snapshot.nodes)
    }

    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut view = Self::default();

        for node in nodes {
            view.counts.total += 1;
            match node.status() {
                Some(Status::Active) => view.counts.active += 1,
                Some(Status::Blocked) => view.counts.blocked += 1,
                _ => view.counts.other += 1,
            }

            match node.stage() {
                Some(stage) => view.buckets[stage.index()].push(node.clone()),
                None => {
                    tracing::trace!(id = node.id.as_deref().unwrap_or("-"), "node without a known stage");
                    view.unstaged += 1;
                }
            }
        }

        view
    }

    pub fn bucket(&self, stage: Stage) -> &[Node] {
        &self.buckets[stage.index()]
    }

    /// Buckets in pipeline order
    pub fn columns(&self) -> impl Iterator<Item = (Stage, &[Node])> {
        Stage::PIPELINE
            .iter()
            .map(move |stage| (*stage, self.bucket(*stage)))
    }

    /// Node at `row` of the `stage` column
    pub fn node_at(&self, stage: Stage, row: usize) -> Option<&Node> {
        self.bucket(stage).get(row)
    }

    pub fn rendered(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.total == 0
    }
}
