//! Persona relationship graph.
//!
//! Uses a `petgraph` undirected graph as an arena: node weights are persona
//! ids, edge weights are relationship snapshots, and a side index maps ids to
//! node indices. Built fresh from the relationship store for each decision,
//! so it never holds back-pointers that could drift from persisted records.

use std::collections::HashMap;

use kindred_types::network::PersonaRelationship;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use uuid::Uuid;

#[derive(Debug, Default, Clone)]
pub struct PersonaGraph {
    graph: UnGraph<Uuid, PersonaRelationship>,
    index: HashMap<Uuid, NodeIndex>,
}

impl PersonaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_relationships(relationships: impl IntoIterator<Item = PersonaRelationship>) -> Self {
        let mut graph = Self::new();
        for relationship in relationships {
            graph.insert(relationship);
        }
        graph
    }

    fn node(&mut self, persona: Uuid) -> NodeIndex {
        if let Some(idx) = self.index.get(&persona) {
            return *idx;
        }
        let idx = self.graph.add_node(persona);
        self.index.insert(persona, idx);
        idx
    }

    /// Add or replace the edge for a relationship's pair.
    pub fn insert(&mut self, relationship: PersonaRelationship) {
        let a = self.node(relationship.persona_a);
        let b = self.node(relationship.persona_b);
        match self.graph.find_edge(a, b) {
            Some(edge) => self.graph[edge] = relationship,
            None => {
                self.graph.add_edge(a, b, relationship);
            }
        }
    }

    pub fn persona_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relationship(&self, a: &Uuid, b: &Uuid) -> Option<&PersonaRelationship> {
        let (ia, ib) = (self.index.get(a)?, self.index.get(b)?);
        let edge = self.graph.find_edge(*ia, *ib)?;
        self.graph.edge_weight(edge)
    }

    /// Relationships touching `persona`, paired with the other persona.
    pub fn neighbors<'a>(
        &'a self,
        persona: &Uuid,
    ) -> impl Iterator<Item = (Uuid, &'a PersonaRelationship)> + 'a {
        let idx = self.index.get(persona).copied();
        idx.into_iter().flat_map(move |idx| {
            self.graph.edges(idx).map(move |edge| {
                let other = if edge.source() == idx {
                    edge.target()
                } else {
                    edge.source()
                };
                (self.graph[other], edge.weight())
            })
        })
    }

    /// Candidates meeting both sharing thresholds with `from`, in input order.
    pub fn eligible_recipients(
        &self,
        from: &Uuid,
        candidates: &[Uuid],
        min_strength: f32,
        min_trust: f32,
    ) -> Vec<Uuid> {
        let mut eligible: Vec<Uuid> = Vec::new();
        for candidate in candidates {
            if candidate == from || eligible.contains(candidate) {
                continue;
            }
            let Some(rel) = self.relationship(from, candidate) else {
                continue;
            };
            if rel.relationship_strength >= min_strength && rel.trust_level >= min_trust {
                eligible.push(*candidate);
            }
        }
        eligible
    }

    /// Personas whose relationship with `persona` is strictly stronger than
    /// `min_strength`.
    pub fn connected(&self, persona: &Uuid, min_strength: f32) -> Vec<Uuid> {
        let mut out: Vec<Uuid> = self
            .neighbors(persona)
            .filter(|(_, rel)| rel.relationship_strength > min_strength)
            .map(|(other, _)| other)
            .collect();
        out.sort();
        out
    }

    pub fn strong_connections(&self, persona: &Uuid) -> Vec<Uuid> {
        self.connected(persona, 0.8)
    }
}
