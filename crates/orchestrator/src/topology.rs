//! Static saga topology.

use bus::{Topic, Topics};
use domain::StageName;

/// One participant stage in the saga.
///
/// A stage owns two topics: commands arrive on its `*-success` topic
/// and compensation commands on its `*-fail` topic. Outcomes do not
/// flow through the stage descriptor; every participant reports back on
/// the shared orchestrator inbox.
#[derive(Debug, Clone)]
pub struct Stage {
    name: StageName,
    order_index: usize,
    command_topic: Topic,
    rollback_topic: Topic,
}

impl Stage {
    /// Creates a stage descriptor.
    pub fn new(
        name: StageName,
        order_index: usize,
        command_topic: Topic,
        rollback_topic: Topic,
    ) -> Self {
        Self {
            name,
            order_index,
            command_topic,
            rollback_topic,
        }
    }

    /// The stage name.
    pub fn name(&self) -> StageName {
        self.name
    }

    /// Position in the forward execution order.
    pub fn order_index(&self) -> usize {
        self.order_index
    }

    /// Topic on which the participant receives forward commands.
    pub fn command_topic(&self) -> &Topic {
        &self.command_topic
    }

    /// Topic on which the participant receives compensation commands.
    pub fn rollback_topic(&self) -> &Topic {
        &self.rollback_topic
    }
}

/// The fixed, ordered list of stages a saga walks through.
///
/// Built once at startup from the topic configuration; read-only
/// afterwards. Adding a participant means adding one entry here.
#[derive(Debug, Clone)]
pub struct SagaTopology {
    stages: Vec<Stage>,
}

impl SagaTopology {
    /// Creates a topology from stage descriptors, ordering them by
    /// `order_index`.
    pub fn new(mut stages: Vec<Stage>) -> Self {
        stages.sort_by_key(Stage::order_index);
        Self { stages }
    }

    /// The standard order-fulfillment pipeline:
    /// product validation, then payment, then inventory.
    pub fn standard(topics: &Topics) -> Self {
        Self::new(vec![
            Stage::new(
                StageName::ProductValidation,
                0,
                topics.product_validation_success.clone(),
                topics.product_validation_fail.clone(),
            ),
            Stage::new(
                StageName::Payment,
                1,
                topics.payment_success.clone(),
                topics.payment_fail.clone(),
            ),
            Stage::new(
                StageName::Inventory,
                2,
                topics.inventory_success.clone(),
                topics.inventory_fail.clone(),
            ),
        ])
    }

    /// The first stage of the pipeline, if any.
    pub fn first(&self) -> Option<&Stage> {
        self.stages.first()
    }

    /// Looks up a stage by name.
    pub fn stage(&self, name: StageName) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.name == name)
    }

    /// The stage after `current`; `None` when `current` is the last
    /// stage (or not part of the topology).
    pub fn next_stage(&self, current: StageName) -> Option<&Stage> {
        let position = self.position(current)?;
        self.stages.get(position + 1)
    }

    /// All stages before `current`, in descending order. This is the
    /// compensation walk order: the most recently completed stage rolls
    /// back first.
    pub fn previous_stages(&self, current: StageName) -> Vec<&Stage> {
        match self.position(current) {
            Some(position) => self.stages[..position].iter().rev().collect(),
            None => Vec::new(),
        }
    }

    /// All stages in forward order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the topology has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn position(&self, name: StageName) -> Option<usize> {
        self.stages.iter().position(|stage| stage.name == name)
    }
}
