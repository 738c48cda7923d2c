use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A workflow document in the shape the n8n creation API accepts.
///
/// `active` is left in `extra`: the relay coerces it on the raw document
/// and strips it before submission.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Workflow {
    pub name: String,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(rename = "typeVersion")]
    pub type_version: f64,
    pub position: [f64; 2],
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a connection fan-out: `{"node": "...", "type": "main", "index": 0}`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConnectionTarget {
    pub node: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workflow {
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.name.as_str())
    }

    /// Every target listed under `connections.<source>.<channel>[i][j]`,
    /// paired with its source key. Entries that do not look like a target
    /// record are skipped.
    pub fn connection_targets(&self) -> Vec<(&str, ConnectionTarget)> {
        let mut targets = Vec::new();
        for (source, channels) in &self.connections {
            let Some(channels) = channels.as_object() else {
                continue;
            };
            for outputs in channels.values() {
                let Some(outputs) = outputs.as_array() else {
                    continue;
                };
                for group in outputs.iter().filter_map(Value::as_array) {
                    for entry in group {
                        if let Ok(target) = serde_json::from_value(entry.clone()) {
                            targets.push((source.as_str(), target));
                        }
                    }
                }
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_workflow_roundtrips_unknown_fields() {
        let doc = json!({
            "name": "W",
            "nodes": [{
                "name": "A",
                "type": "t",
                "typeVersion": 1,
                "position": [0, 0],
                "parameters": {},
                "disabled": true
            }],
            "connections": {},
            "settings": {},
            "active": "yes",
            "tags": ["x"]
        });
        let workflow: Workflow = serde_json::from_value(doc).unwrap();
        assert_eq!(workflow.extra["tags"], json!(["x"]));
        assert_eq!(workflow.nodes[0].extra["disabled"], json!(true));

        let back = serde_json::to_value(&workflow).unwrap();
        assert_eq!(back["nodes"][0]["typeVersion"], json!(1.0));
        assert_eq!(back["active"], json!("yes"));
    }

    #[test]
    fn test_connection_targets() {
        let workflow: Workflow = serde_json::from_value(json!({
            "name": "W",
            "nodes": [],
            "connections": {
                "A": {"main": [[{"node": "B", "type": "main", "index": 0}], []]},
                "C": {"main": "garbage"}
            }
        }))
        .unwrap();

        let targets = workflow.connection_targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0, "A");
        assert_eq!(targets[0].1.node, "B");
        assert_eq!(targets[0].1.extra["type"], "main");
    }
}
