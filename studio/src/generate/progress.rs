//! Weighted progress checkpoints for streaming generation runs.
//!
//! One full ladder run walks five stages whose weights sum to 100, so a
//! subscriber can drive a progress bar without knowing which rung finally
//! produced the result.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Stages of one generation run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Analyze,
    Plan,
    Generate,
    Validate,
    Optimize,
}

impl GenerationStage {
    pub const ALL: [GenerationStage; 5] = [
        GenerationStage::Analyze,
        GenerationStage::Plan,
        GenerationStage::Generate,
        GenerationStage::Validate,
        GenerationStage::Optimize,
    ];

    /// Share of the whole run this stage accounts for, in percent.
    pub fn weight(&self) -> u8 {
        match self {
            GenerationStage::Analyze => 10,
            GenerationStage::Plan => 15,
            GenerationStage::Generate => 50,
            GenerationStage::Validate => 15,
            GenerationStage::Optimize => 10,
        }
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Analyze => write!(f, "analyze"),
            GenerationStage::Plan => write!(f, "plan"),
            GenerationStage::Generate => write!(f, "generate"),
            GenerationStage::Validate => write!(f, "validate"),
            GenerationStage::Optimize => write!(f, "optimize"),
        }
    }
}

/// One checkpoint emitted to a streaming subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: GenerationStage,
    /// Cumulative completion after this stage, 0..=100.
    pub completed: u8,
    pub detail: String,
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressUpdate>;
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressUpdate>;

/// Accumulates stage weights and forwards checkpoints to a subscriber, if
/// one is attached. A disabled tracker swallows checkpoints.
#[derive(Debug)]
pub struct ProgressTracker {
    completed: u8,
    tx: Option<ProgressSender>,
}

impl ProgressTracker {
    pub fn streaming(tx: ProgressSender) -> Self {
        Self {
            completed: 0,
            tx: Some(tx),
        }
    }

    pub fn disabled() -> Self {
        Self {
            completed: 0,
            tx: None,
        }
    }

    /// Mark a stage complete. Send failures mean the subscriber hung up,
    /// which is not this side's problem.
    pub fn checkpoint(&mut self, stage: GenerationStage, detail: impl Into<String>) {
        self.completed = self.completed.saturating_add(stage.weight()).min(100);
        if let Some(ref tx) = self.tx {
            let _ = tx.send(ProgressUpdate {
                stage,
                completed: self.completed,
                detail: detail.into(),
            });
        }
    }

    pub fn completed(&self) -> u8 {
        self.completed
    }
}
