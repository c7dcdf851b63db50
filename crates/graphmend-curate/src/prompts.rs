//! Prompt construction.
//!
//! Prompts are fixed instruction templates: the entity/relation vocabulary
//! is enumerated explicitly, the response schema is spelled out, and the
//! model is told to answer with JSON only. Parsing stays defensive anyway.

use graphmend_model::{Edge, Node};
use serde_json::json;

/// Conventional entity vocabulary. Open: unknown types coming back from the
/// model are kept as-is, this list just anchors the prompt.
pub const ENTITY_TYPES: &[&str] = &[
    "Person",
    "Organization",
    "Skill",
    "Technology",
    "Concept",
    "Location",
    "Project",
    "Education",
    "Role",
];

/// Conventional relation vocabulary.
pub const RELATION_TYPES: &[&str] = &[
    "WORKS_AT",
    "WORKED_AT",
    "STUDIED_AT",
    "HAS_SKILL",
    "HAS_ROLE",
    "USES",
    "PART_OF",
    "LOCATED_IN",
    "MANAGES",
    "CONTRIBUTED_TO",
    "RELATED_TO",
];

fn extraction_instructions() -> String {
    format!(
        r#"You are a knowledge-graph extraction engine.
Extract entities and relations from the document.

Entity types: {entity_types}.
Relation types: {relation_types}.

Only extract what is clearly stated, not implied. Respond with JSON only,
no prose, in exactly this shape:

{{
  "entities": [
    {{"name": "...", "type": "...", "description": "..."}}
  ],
  "relations": [
    {{"source": "<entity name>", "target": "<entity name>", "relation_type": "...", "description": "..."}}
  ]
}}

"description" fields are optional. "source" and "target" must repeat entity
names from the "entities" list verbatim."#,
        entity_types = ENTITY_TYPES.join(", "),
        relation_types = RELATION_TYPES.join(", "),
    )
}

/// Prompt for extracting from plain text.
pub fn extraction_prompt(text: &str) -> String {
    format!("{}\n\nDocument:\n\n{}", extraction_instructions(), text)
}

/// Prompt for extracting from an attached binary document.
pub fn file_extraction_prompt() -> String {
    format!(
        "{}\n\nThe document is attached to this message.",
        extraction_instructions()
    )
}

/// Tier-2 analysis prompt over a bounded slice of the graph.
pub fn analysis_prompt(nodes: &[&Node], edges: &[&Edge]) -> String {
    let node_lines: Vec<_> = nodes
        .iter()
        .map(|n| {
            json!({
                "id": n.id,
                "type": n.kind,
                "label": n.label,
                "description": n.description,
            })
        })
        .collect();
    let edge_lines: Vec<_> = edges
        .iter()
        .map(|e| json!({"source": e.source, "target": e.target, "type": e.kind}))
        .collect();

    format!(
        r#"You are auditing a knowledge graph for quality problems.

Nodes:
{nodes}

Edges:
{edges}

Identify, using only the node ids shown above:
- duplicate nodes that refer to the same real-world entity,
- relations that are clearly missing between existing nodes,
- nodes whose type is wrong for what their label describes,
- node labels with naming inconsistencies (casing, abbreviations).

Respond with JSON only, in exactly this shape:

{{
  "duplicates": [
    {{"nodeIds": ["id1", "id2"], "suggestedName": "...", "reason": "..."}}
  ],
  "missingRelations": [
    {{"sourceId": "...", "targetId": "...", "relationType": "...", "reason": "..."}}
  ],
  "miscategorized": [
    {{"nodeId": "...", "suggestedType": "...", "reason": "..."}}
  ],
  "naming": [
    {{"nodeId": "...", "suggestedName": "...", "reason": "..."}}
  ]
}}

Omit empty arrays rather than inventing findings. Never reference node ids
that are not listed above."#,
        nodes = serde_json::to_string_pretty(&node_lines).unwrap_or_default(),
        edges = serde_json::to_string_pretty(&edge_lines).unwrap_or_default(),
    )
}

/// Description-generation prompt for a single node and its 1-hop
/// neighborhood.
pub fn description_prompt(node: &Node, neighborhood: &[String]) -> String {
    let context = if neighborhood.is_empty() {
        "It has no recorded relations.".to_string()
    } else {
        format!("Its relations:\n- {}", neighborhood.join("\n- "))
    };
    format!(
        r#"Write a one-to-two sentence description for a knowledge-graph entity.

Entity: "{label}" (type: {kind}).
{context}

Respond with the description text only, without quotes or preamble."#,
        label = node.label,
        kind = node.kind,
    )
}
