use crate::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Reserved step kind for canvas annotations.
///
/// Comment steps are never dispatched to a step executor; the engine marks
/// them skipped and moves on.
pub const COMMENT_KIND: &str = "Comment";

/// Conventional port name meaning "all of the producer's results"
pub const PORT_OUTPUT: &str = "output";

/// Conventional port name meaning "the consumer's whole input record"
pub const PORT_INPUT: &str = "input";

/// Value object: Flow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

/// Value object: Step ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub String);

/// Value object: Run ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Represents a parsed flow graph as exported by the canvas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// ID of the flow
    pub id: FlowId,

    /// Human-readable name of the flow
    pub name: String,

    /// The steps in this flow, in declaration order
    pub steps: Vec<Step>,

    /// Directed edges between step ports
    pub edges: Vec<Edge>,

    /// Variables declared for this flow
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Represents a single step in a flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// ID of the step, unique within the flow
    pub id: StepId,

    /// Discriminator selecting the step executor behavior
    pub kind: String,

    /// Display name, used only for messages
    #[serde(default)]
    pub label: String,

    /// Opaque configuration interpreted only by the step executor
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

impl Step {
    /// Whether this step is a comment annotation that never executes
    #[inline]
    pub fn is_comment(&self) -> bool {
        self.kind == COMMENT_KIND
    }
}

/// Directed edge between a source step port and a target step port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// ID of the producing step
    pub source: StepId,

    /// Named output slot on the producer
    #[serde(default = "default_output_port")]
    pub source_port: String,

    /// ID of the consuming step
    pub target: StepId,

    /// Named input slot on the consumer
    #[serde(default = "default_input_port")]
    pub target_port: String,
}

fn default_output_port() -> String {
    PORT_OUTPUT.to_string()
}

fn default_input_port() -> String {
    PORT_INPUT.to_string()
}

impl Edge {
    /// Whether this edge uses the generic whole-record convention rather
    /// than a named port pair
    #[inline]
    pub fn uses_default_ports(&self) -> bool {
        self.source_port == PORT_OUTPUT || self.target_port == PORT_INPUT
    }
}

/// A run variable declaration with an optional default value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// Name of the variable
    pub name: String,

    /// Declared default value, seeded into the context at run start
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl Flow {
    /// Look up a step by ID
    pub fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }

    /// Distinct direct dependencies of a step: the source IDs of all edges
    /// targeting it, in edge declaration order.
    pub fn dependencies_of(&self, id: &StepId) -> Vec<StepId> {
        let mut deps = Vec::new();
        for edge in self.edges.iter().filter(|e| &e.target == id) {
            if !deps.contains(&edge.source) {
                deps.push(edge.source.clone());
            }
        }
        deps
    }

    /// Validate the flow graph
    ///
    /// Checks step ID uniqueness and that every edge endpoint references a
    /// step present in the flow. Cycle detection happens separately when the
    /// execution order is computed.
    pub fn validate(&self) -> Result<(), EngineError> {
        // Check for ID uniqueness
        let mut step_ids = std::collections::HashSet::new();
        for step in &self.steps {
            if !step_ids.insert(&step.id) {
                return Err(EngineError::Validation(format!(
                    "Duplicate step ID: {}",
                    step.id
                )));
            }
        }

        // Check edge endpoint references
        for edge in &self.edges {
            if !step_ids.contains(&edge.source) {
                return Err(EngineError::Validation(format!(
                    "Edge references non-existent source step: {}",
                    edge.source
                )));
            }
            if !step_ids.contains(&edge.target) {
                return Err(EngineError::Validation(format!(
                    "Edge references non-existent target step: {}",
                    edge.target
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(id: &str, kind: &str) -> Step {
        Step {
            id: StepId(id.to_string()),
            kind: kind.to_string(),
            label: id.to_string(),
            config: HashMap::new(),
        }
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: StepId(source.to_string()),
            source_port: PORT_OUTPUT.to_string(),
            target: StepId(target.to_string()),
            target_port: PORT_INPUT.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_flow() {
        let flow = Flow {
            id: FlowId("flow1".to_string()),
            name: "Account setup".to_string(),
            steps: vec![step("keys", "GenerateKeys"), step("fund", "Faucet")],
            edges: vec![edge("keys", "fund")],
            variables: vec![],
        };

        assert!(flow.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_step_ids() {
        let flow = Flow {
            id: FlowId("flow1".to_string()),
            name: "dup".to_string(),
            steps: vec![step("keys", "GenerateKeys"), step("keys", "Faucet")],
            edges: vec![],
            variables: vec![],
        };

        let err = flow.validate().unwrap_err();
        match err {
            EngineError::Validation(msg) => assert!(msg.contains("Duplicate step ID")),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_validate_rejects_dangling_edge() {
        let flow = Flow {
            id: FlowId("flow1".to_string()),
            name: "dangling".to_string(),
            steps: vec![step("keys", "GenerateKeys")],
            edges: vec![edge("keys", "missing")],
            variables: vec![],
        };

        let err = flow.validate().unwrap_err();
        match err {
            EngineError::Validation(msg) => {
                assert!(msg.contains("non-existent target step: missing"))
            }
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_dependencies_are_distinct_and_ordered() {
        let flow = Flow {
            id: FlowId("flow1".to_string()),
            name: "deps".to_string(),
            steps: vec![
                step("a", "GenerateKeys"),
                step("b", "Faucet"),
                step("c", "AddCredits"),
            ],
            edges: vec![
                Edge {
                    source: StepId("b".to_string()),
                    source_port: "tx_hash".to_string(),
                    target: StepId("c".to_string()),
                    target_port: "funding_tx".to_string(),
                },
                edge("a", "c"),
                edge("b", "c"),
            ],
            variables: vec![],
        };

        let deps = flow.dependencies_of(&StepId("c".to_string()));
        assert_eq!(
            deps,
            vec![StepId("b".to_string()), StepId("a".to_string())]
        );
    }

    #[test]
    fn test_comment_kind_detection() {
        let comment = step("note", COMMENT_KIND);
        let faucet = step("fund", "Faucet");

        assert!(comment.is_comment());
        assert!(!faucet.is_comment());
    }

    #[test]
    fn test_edge_port_defaults_on_deserialize() {
        let edge: Edge = serde_json::from_value(json!({
            "source": "a",
            "target": "b"
        }))
        .unwrap();

        assert_eq!(edge.source_port, PORT_OUTPUT);
        assert_eq!(edge.target_port, PORT_INPUT);
        assert!(edge.uses_default_ports());
    }

    #[test]
    fn test_named_port_edge_is_not_generic() {
        let edge = Edge {
            source: StepId("a".to_string()),
            source_port: "tx_hash".to_string(),
            target: StepId("b".to_string()),
            target_port: "funding_tx".to_string(),
        };

        assert!(!edge.uses_default_ports());
    }

    #[test]
    fn test_flow_round_trips_through_json() {
        let flow = Flow {
            id: FlowId("flow1".to_string()),
            name: "roundtrip".to_string(),
            steps: vec![step("keys", "GenerateKeys")],
            edges: vec![],
            variables: vec![Variable {
                name: "network".to_string(),
                default: Some(json!("testnet")),
            }],
        };

        let serialized = serde_json::to_string(&flow).unwrap();
        let deserialized: Flow = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.id, flow.id);
        assert_eq!(deserialized.steps.len(), 1);
        assert_eq!(deserialized.variables[0].name, "network");
    }
}
