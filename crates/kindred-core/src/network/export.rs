//! Labeled-tree export of a persona's memory network, and the partial
//! import path back into memories.
//!
//! Tree shape:
//!
//! ```text
//! persona:<id>
//! ├── type:<memory_type>
//! │   └── <memory id>      content, style { color, opacity = decay, size = importance }
//! └── shared
//!     └── <shared id>      content
//! ```
//!
//! Import only reads memory leaves under `type:` groups. Imported memories
//! get fresh ids and no embedding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kindred_types::memory::{Memory, MemoryOwner, MemoryType, SharedMemory};
use kindred_types::network::{ImportResult, NetworkNode, NodeStyle};
use uuid::Uuid;

use crate::aging::decay::DecayPolicy;

const TYPE_PREFIX: &str = "type:";
const SHARED_GROUP_ID: &str = "shared";
const LABEL_CHARS: usize = 40;
const MAX_CONTENT_CHARS: usize = 10_000;
const DEFAULT_IMPORT_IMPORTANCE: f32 = 0.5;

fn color_for(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::Personal => "#4a90d9",
        MemoryType::Preference => "#f5a623",
        MemoryType::Experience => "#7ed321",
        MemoryType::Relationship => "#d0021b",
        MemoryType::Knowledge => "#9013fe",
        MemoryType::EmotionalState => "#e91e63",
        MemoryType::SharedExperience => "#50e3c2",
    }
}

fn short_label(text: &str) -> String {
    if text.chars().count() <= LABEL_CHARS {
        return text.to_string();
    }
    let mut label: String = text.chars().take(LABEL_CHARS).collect();
    label.push_str("...");
    label
}

fn group_label(memory_type: MemoryType) -> String {
    let raw = memory_type.to_string().replace('_', " ");
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => raw,
    }
}

/// Build the export tree for one persona.
pub fn export_tree(
    persona_id: Uuid,
    persona_label: &str,
    memories: &[Memory],
    shared: &[SharedMemory],
    policy: &DecayPolicy,
    now: DateTime<Utc>,
) -> NetworkNode {
    let mut groups: BTreeMap<String, (MemoryType, Vec<NetworkNode>)> = BTreeMap::new();
    for memory in memories {
        let decay = policy.decay_factor(&memory.signals(), now);
        let node = NetworkNode {
            id: memory.id.to_string(),
            label: short_label(memory.display_content()),
            content: Some(memory.original_content.clone()),
            children: Vec::new(),
            style: Some(NodeStyle {
                color: Some(color_for(memory.memory_type).to_string()),
                opacity: Some(decay),
                size: Some(memory.importance_score),
            }),
        };
        groups
            .entry(memory.memory_type.to_string())
            .or_insert_with(|| (memory.memory_type, Vec::new()))
            .1
            .push(node);
    }

    let mut children: Vec<NetworkNode> = groups
        .into_iter()
        .map(|(key, (memory_type, leaves))| NetworkNode {
            id: format!("{TYPE_PREFIX}{key}"),
            label: group_label(memory_type),
            content: None,
            children: leaves,
            style: Some(NodeStyle {
                color: Some(color_for(memory_type).to_string()),
                ..Default::default()
            }),
        })
        .collect();

    if !shared.is_empty() {
        children.push(NetworkNode {
            id: SHARED_GROUP_ID.to_string(),
            label: "Shared with me".to_string(),
            content: None,
            children: shared
                .iter()
                .map(|s| NetworkNode {
                    id: s.id.to_string(),
                    label: short_label(&s.content),
                    content: Some(s.content.clone()),
                    children: Vec::new(),
                    style: Some(NodeStyle {
                        color: Some(color_for(MemoryType::SharedExperience).to_string()),
                        size: Some(s.importance_score),
                        ..Default::default()
                    }),
                })
                .collect(),
            style: None,
        });
    }

    NetworkNode {
        id: format!("persona:{persona_id}"),
        label: persona_label.to_string(),
        content: None,
        children,
        style: None,
    }
}

/// Convert an exported tree back into memories owned by `owner`.
///
/// Any error rejects the whole import: the returned list is empty and
/// `success` is false. Warnings never block.
pub fn import_tree(
    root: &NetworkNode,
    owner: MemoryOwner,
    now: DateTime<Utc>,
) -> (Vec<Memory>, ImportResult) {
    let mut result = ImportResult::default();
    let mut memories = Vec::new();

    if root.children.is_empty() {
        result.warnings.push(format!("node '{}' has no children; nothing to import", root.id));
    }

    for group in &root.children {
        if group.id == SHARED_GROUP_ID {
            result.skipped += group.children.len();
            if !group.children.is_empty() {
                result.warnings.push(format!(
                    "{} shared memories skipped; shared copies are not imported",
                    group.children.len()
                ));
            }
            continue;
        }

        let Some(type_name) = group.id.strip_prefix(TYPE_PREFIX) else {
            result.skipped += 1;
            result
                .warnings
                .push(format!("node '{}' is not a memory type group; skipped", group.id));
            continue;
        };
        let memory_type: MemoryType = match type_name.parse() {
            Ok(t) => t,
            Err(e) => {
                result.errors.push(format!("group '{}': {e}", group.id));
                continue;
            }
        };

        for leaf in &group.children {
            match import_leaf(leaf, memory_type, owner, now, &mut result.warnings) {
                Ok(memory) => memories.push(memory),
                Err(message) => result.errors.push(message),
            }
        }
    }

    if result.errors.is_empty() {
        result.imported = memories.len();
        result.success = true;
    } else {
        result.skipped += memories.len();
        memories.clear();
        result.success = false;
    }

    (memories, result)
}

fn import_leaf(
    leaf: &NetworkNode,
    memory_type: MemoryType,
    owner: MemoryOwner,
    now: DateTime<Utc>,
    warnings: &mut Vec<String>,
) -> Result<Memory, String> {
    let content = leaf
        .content
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| format!("node '{}' has no content", leaf.id))?;
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(format!(
            "node '{}' content exceeds {MAX_CONTENT_CHARS} characters",
            leaf.id
        ));
    }
    if !leaf.children.is_empty() {
        warnings.push(format!("node '{}' has nested children; they were ignored", leaf.id));
    }

    let importance = match leaf.style.as_ref().and_then(|s| s.size) {
        Some(size) if size.is_finite() && (0.0..=1.0).contains(&size) => size,
        Some(size) if size.is_finite() => {
            warnings.push(format!(
                "node '{}' importance {size} out of range; clamped",
                leaf.id
            ));
            size.clamp(0.0, 1.0)
        }
        Some(_) => return Err(format!("node '{}' has a non-numeric importance", leaf.id)),
        None => {
            warnings.push(format!(
                "node '{}' has no importance; defaulted to {DEFAULT_IMPORT_IMPORTANCE}",
                leaf.id
            ));
            DEFAULT_IMPORT_IMPORTANCE
        }
    };

    Ok(Memory::new(owner, content, memory_type, importance, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn owner() -> MemoryOwner {
        MemoryOwner::new(Uuid::now_v7(), Uuid::now_v7())
    }

    fn leaf(id: &str, content: Option<&str>, size: Option<f32>) -> NetworkNode {
        NetworkNode {
            id: id.to_string(),
            label: id.to_string(),
            content: content.map(str::to_string),
            children: Vec::new(),
            style: Some(NodeStyle {
                size,
                ..Default::default()
            }),
        }
    }

    fn group(id: &str, children: Vec<NetworkNode>) -> NetworkNode {
        NetworkNode {
            id: id.to_string(),
            label: id.to_string(),
            content: None,
            children,
            style: None,
        }
    }

    #[test]
    fn test_export_groups_by_type_and_styles_by_decay() {
        let owner = owner();
        let now = Utc::now();
        let memories = vec![
            Memory::new(owner, "User's name is Alice", MemoryType::Personal, 0.95, now),
            Memory::new(owner, "User loves reading books", MemoryType::Preference, 0.8, now),
            Memory::new(owner, "User works as a teacher", MemoryType::Personal, 0.9, now),
        ];
        let shared = vec![SharedMemory {
            id: Uuid::now_v7(),
            original_memory_id: Uuid::now_v7(),
            origin_persona_id: Uuid::now_v7(),
            user_id: owner.user_id,
            content: "User ran a marathon".to_string(),
            memory_type: MemoryType::Experience,
            tags: vec![],
            importance_score: 0.9,
            emotional_impact: 0.8,
            access_permissions: BTreeMap::new(),
            shared_with_companions: vec![owner.persona_id],
            created_at: now,
            last_referenced: now,
        }];

        let tree = export_tree(owner.persona_id, "Nova", &memories, &shared, &DecayPolicy::default(), now);
        assert_eq!(tree.label, "Nova");
        assert_eq!(tree.children.len(), 3);

        let personal = tree.children.iter().find(|c| c.id == "type:personal").unwrap();
        assert_eq!(personal.label, "Personal");
        assert_eq!(personal.children.len(), 2);
        let style = personal.children[0].style.as_ref().unwrap();
        assert_eq!(style.opacity, Some(1.0));

        let json = serde_json::to_string(&tree).unwrap();
        let parsed: NetworkNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tree);
    }

    #[test]
    fn test_export_then_import_restores_memories() {
        let source = owner();
        let target = owner();
        let now = Utc::now();
        let memories = vec![
            Memory::new(source, "User's name is Alice", MemoryType::Personal, 0.95, now),
            Memory::new(source, "User feels calm", MemoryType::EmotionalState, 0.7, now),
        ];
        let tree = export_tree(source.persona_id, "Nova", &memories, &[], &DecayPolicy::default(), now);

        let (imported, result) = import_tree(&tree, target, now);
        assert!(result.success, "{result:?}");
        assert_eq!(result.imported, 2);
        assert!(result.errors.is_empty());
        assert!(imported.iter().all(|m| m.persona_id == target.persona_id && m.embedding.is_none()));
        assert!(imported.iter().any(|m| m.memory_type == MemoryType::EmotionalState
            && (m.importance_score - 0.7).abs() < 1e-6));
    }

    #[test]
    fn test_import_rejects_whole_tree_on_error() {
        let root = group(
            "persona:x",
            vec![
                group("type:personal", vec![leaf("a", Some("User's name is Bo"), Some(0.9))]),
                group("type:preference", vec![leaf("b", None, Some(0.5))]),
            ],
        );
        let (imported, result) = import_tree(&root, owner(), Utc::now());
        assert!(!result.success);
        assert!(imported.is_empty());
        assert_eq!(result.imported, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("no content"));
    }

    #[test]
    fn test_import_unknown_type_is_an_error() {
        let root = group("persona:x", vec![group("type:dream", vec![leaf("a", Some("x y"), None)])]);
        let (_, result) = import_tree(&root, owner(), Utc::now());
        assert!(!result.success);
        assert!(result.errors[0].contains("invalid memory type"));
    }

    #[test]
    fn test_import_warnings_do_not_block() {
        let root = group(
            "persona:x",
            vec![
                group("type:knowledge", vec![
                    leaf("a", Some("Paris is in France"), None),
                    leaf("b", Some("Water boils at 100C"), Some(3.0)),
                ]),
                group("shared", vec![leaf("s", Some("copied"), Some(0.5))]),
                group("misc", vec![]),
            ],
        );
        let (imported, result) = import_tree(&root, owner(), Utc::now());
        assert!(result.success);
        assert_eq!(imported.len(), 2);
        assert_eq!(imported[1].importance_score, 1.0);
        assert_eq!(imported[0].importance_score, DEFAULT_IMPORT_IMPORTANCE);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.warnings.len(), 4);
    }
}
