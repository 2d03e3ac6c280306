//! Collects the members of route relations across the reader passes.
//!
//! Relations of interest are registered in the first pass. The second pass
//! offers every node, way and relation; wanted objects are kept until all
//! relations referencing them are complete.

use anyhow::Result;
use hashbrown::HashMap;
use osmi_ptv2::models::{MemberObject, MemberType, Node, ObjectId, Relation, Way};

struct PendingRelation {
    relation: Relation,
    /// Members not seen yet.
    pending: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub registered: usize,
    pub completed: usize,
    /// Completed with at least one member missing from the input.
    pub incomplete: usize,
}

#[derive(Default)]
pub struct RelationAssembler {
    slots: Vec<Option<PendingRelation>>,
    wanted: HashMap<(MemberType, ObjectId), Vec<usize>>,
    nodes: HashMap<ObjectId, Node>,
    ways: HashMap<ObjectId, Way>,
    relations: HashMap<ObjectId, Relation>,
    stats: AssemblerStats,
}

impl RelationAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start collecting the members of `relation`.
    ///
    /// A relation without members is complete right away.
    pub fn register<F>(&mut self, relation: Relation, mut on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        self.stats.registered += 1;
        if relation.members.is_empty() {
            self.stats.completed += 1;
            return on_complete(&relation, &[]);
        }

        let slot = self.slots.len();
        for member in &relation.members {
            self.wanted.entry((member.member_type, member.id)).or_default().push(slot);
        }
        self.slots.push(Some(PendingRelation {
            pending: relation.members.len(),
            relation,
        }));
        Ok(())
    }

    /// Number of relations still waiting for members.
    pub fn pending_relations(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn add_node<F>(&mut self, node: Node, on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        let key = (MemberType::Node, node.id);
        if !self.wanted.contains_key(&key) {
            return Ok(());
        }
        self.nodes.insert(node.id, node);
        self.member_arrived(key, on_complete)
    }

    /// Ways must have their node locations resolved already.
    pub fn add_way<F>(&mut self, way: Way, on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        let key = (MemberType::Way, way.id);
        if !self.wanted.contains_key(&key) {
            return Ok(());
        }
        self.ways.insert(way.id, way);
        self.member_arrived(key, on_complete)
    }

    pub fn add_relation<F>(&mut self, relation: Relation, on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        let key = (MemberType::Relation, relation.id);
        if !self.wanted.contains_key(&key) {
            return Ok(());
        }
        self.relations.insert(relation.id, relation);
        self.member_arrived(key, on_complete)
    }

    /// Complete every relation still waiting, with the members that never
    /// showed up as [`MemberObject::Missing`].
    pub fn flush_incomplete<F>(&mut self, mut on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        for slot in 0..self.slots.len() {
            if self.slots[slot].is_some() {
                self.complete(slot, &mut on_complete)?;
            }
        }
        self.slots.clear();
        Ok(())
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    fn member_arrived<F>(&mut self, key: (MemberType, ObjectId), mut on_complete: F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        let Some(slots) = self.wanted.get(&key).cloned() else {
            return Ok(());
        };
        for slot in slots {
            let done = match self.slots.get_mut(slot) {
                Some(Some(pending)) => {
                    pending.pending = pending.pending.saturating_sub(1);
                    pending.pending == 0
                }
                _ => false,
            };
            if done {
                self.complete(slot, &mut on_complete)?;
            }
        }
        Ok(())
    }

    fn complete<F>(&mut self, slot: usize, on_complete: &mut F) -> Result<()>
    where
        F: FnMut(&Relation, &[MemberObject<'_>]) -> Result<()>,
    {
        let Some(PendingRelation { relation, .. }) = self.slots.get_mut(slot).and_then(Option::take) else {
            return Ok(());
        };

        let (result, missing) = {
            let members: Vec<MemberObject<'_>> = relation
                .members
                .iter()
                .map(|m| self.lookup(m.member_type, m.id))
                .collect();
            let missing = members.iter().any(MemberObject::is_missing);
            (on_complete(&relation, &members), missing)
        };

        self.stats.completed += 1;
        if missing {
            self.stats.incomplete += 1;
        }
        self.release(slot, &relation);
        result
    }

    fn lookup(&self, member_type: MemberType, id: ObjectId) -> MemberObject<'_> {
        let found = match member_type {
            MemberType::Node => self.nodes.get(&id).map(MemberObject::Node),
            MemberType::Way => self.ways.get(&id).map(MemberObject::Way),
            MemberType::Relation => self.relations.get(&id).map(MemberObject::Relation),
        };
        found.unwrap_or(MemberObject::Missing)
    }

    /// Forget the relation in `slot` and drop member objects nobody else
    /// waits for.
    fn release(&mut self, slot: usize, relation: &Relation) {
        for member in &relation.members {
            let key = (member.member_type, member.id);
            let Some(slots) = self.wanted.get_mut(&key) else {
                continue;
            };
            slots.retain(|&s| s != slot);
            if slots.is_empty() {
                self.wanted.remove(&key);
                match member.member_type {
                    MemberType::Node => {
                        self.nodes.remove(&member.id);
                    }
                    MemberType::Way => {
                        self.ways.remove(&member.id);
                    }
                    MemberType::Relation => {
                        self.relations.remove(&member.id);
                    }
                }
            }
        }
    }
}
