// ============================================================
// Layer 3: Learning Task
// ============================================================

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::PipelineError;

/// The learning task a run is configured for (`task` config key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    LinkPrediction,
    NodeClassification,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::LinkPrediction     => "link_prediction",
            Task::NodeClassification => "node_classification",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Task {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "link_prediction"     => Ok(Task::LinkPrediction),
            "node_classification" => Ok(Task::NodeClassification),
            other                 => Err(PipelineError::not_found("task", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_tasks() {
        assert_eq!("link_prediction".parse::<Task>().unwrap(), Task::LinkPrediction);
        assert_eq!(
            "node_classification".parse::<Task>().unwrap(),
            Task::NodeClassification
        );
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        let err = "graph_generation".parse::<Task>().unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { kind: "task", .. }));
    }
}
