//! OSM PBF input: element conversion, node location index and the pass
//! reader.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use geo::Coord;
use hashbrown::HashMap;
use indicatif::{ProgressBar, ProgressStyle};
use osmi_ptv2::models::{MemberType, Node, NodeRef, ObjectId, Relation, RelationMember, Tags, Way};
use osmpbf::{Element, ElementReader, RelMemberType};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::options::IndexType;

// ============================================================================
// Input source
// ============================================================================

/// Where the OSM data comes from.
///
/// Standard input can only be read once, so it is kept in memory for the
/// later passes.
pub enum InputSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl InputSource {
    /// Open a file, or standard input for `-` or no path at all.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if p.as_os_str() != "-" => {
                if !p.exists() {
                    anyhow::bail!("Input file does not exist: {}", p.display());
                }
                Ok(InputSource::File(p.to_path_buf()))
            }
            _ => {
                let mut buffer = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buffer)
                    .context("Failed to read OSM data from standard input")?;
                log::debug!("read {} bytes from standard input", buffer.len());
                Ok(InputSource::Memory(buffer))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Memory(_) => "<stdin>".to_string(),
        }
    }

    fn for_each_element<F: FnMut(Element<'_>)>(&self, f: F) -> Result<()> {
        match self {
            InputSource::File(path) => ElementReader::from_path(path)
                .with_context(|| format!("Failed to open PBF file: {}", path.display()))?
                .for_each(f)
                .with_context(|| format!("Failed to read PBF file: {}", path.display())),
            InputSource::Memory(bytes) => ElementReader::new(Cursor::new(bytes.as_slice()))
                .for_each(f)
                .context("Failed to read PBF data from standard input"),
        }
    }
}

// ============================================================================
// Element conversion
// ============================================================================

/// An OSM object converted into the validator's model.
///
/// Way node locations are not set here. They are filled in from the
/// [`LocationIndex`] during the second pass.
pub enum OsmObject {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

/// Which object types a pass wants to see.
#[derive(Clone, Copy, Debug)]
pub struct ObjectFilter {
    pub nodes: bool,
    pub ways: bool,
    pub relations: bool,
}

impl ObjectFilter {
    pub const ALL: Self = Self {
        nodes: true,
        ways: true,
        relations: true,
    };
    pub const RELATIONS: Self = Self {
        nodes: false,
        ways: false,
        relations: true,
    };
    pub const NODES_AND_WAYS: Self = Self {
        nodes: true,
        ways: true,
        relations: false,
    };
}

fn collect_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.collect()
}

fn timestamp(millis: Option<i64>) -> Option<DateTime<Utc>> {
    millis.and_then(DateTime::from_timestamp_millis)
}

fn convert_member_type(member_type: RelMemberType) -> MemberType {
    match member_type {
        RelMemberType::Node => MemberType::Node,
        RelMemberType::Way => MemberType::Way,
        RelMemberType::Relation => MemberType::Relation,
    }
}

/// Convert a PBF element, or `None` if the filter rejects its type.
pub fn convert_element(element: Element<'_>, filter: ObjectFilter) -> Option<OsmObject> {
    match element {
        Element::Node(node) if filter.nodes => Some(OsmObject::Node(Node {
            id: node.id(),
            location: Some(Coord {
                x: node.lon(),
                y: node.lat(),
            }),
            tags: collect_tags(node.tags()),
            timestamp: timestamp(node.info().milli_timestamp()),
        })),
        Element::DenseNode(node) if filter.nodes => Some(OsmObject::Node(Node {
            id: node.id(),
            location: Some(Coord {
                x: node.lon(),
                y: node.lat(),
            }),
            tags: collect_tags(node.tags()),
            timestamp: timestamp(node.info().map(|info| info.milli_timestamp())),
        })),
        Element::Way(way) if filter.ways => Some(OsmObject::Way(Way {
            id: way.id(),
            nodes: way.refs().map(|id| NodeRef::new(id, None)).collect(),
            tags: collect_tags(way.tags()),
            timestamp: timestamp(way.info().milli_timestamp()),
        })),
        Element::Relation(rel) if filter.relations => {
            let members = rel
                .members()
                .map(|m| {
                    let role = m.role().unwrap_or_default();
                    RelationMember::new(convert_member_type(m.member_type), m.member_id, role)
                })
                .collect();
            Some(OsmObject::Relation(Relation {
                id: rel.id(),
                tags: collect_tags(rel.tags()),
                members,
                timestamp: timestamp(rel.info().milli_timestamp()),
            }))
        }
        _ => None,
    }
}

// ============================================================================
// Location index
// ============================================================================

/// Node ID to coordinate mapping
pub enum LocationIndex {
    /// Append-only vector searched by binary search. Sorted on demand if
    /// the input was not ordered by node id.
    SparseMemArray {
        entries: Vec<(ObjectId, Coord<f64>)>,
        sorted: bool,
    },
    Hash(HashMap<ObjectId, Coord<f64>>),
}

impl LocationIndex {
    pub fn new(index_type: IndexType) -> Self {
        match index_type {
            IndexType::SparseMemArray => LocationIndex::SparseMemArray {
                entries: Vec::new(),
                sorted: true,
            },
            IndexType::Hash => LocationIndex::Hash(HashMap::new()),
        }
    }

    pub fn set(&mut self, id: ObjectId, location: Coord<f64>) {
        match self {
            LocationIndex::SparseMemArray { entries, sorted } => {
                if entries.last().is_some_and(|&(last, _)| last >= id) {
                    *sorted = false;
                }
                entries.push((id, location));
            }
            LocationIndex::Hash(map) => {
                map.insert(id, location);
            }
        }
    }

    pub fn get(&mut self, id: ObjectId) -> Option<Coord<f64>> {
        match self {
            LocationIndex::SparseMemArray { entries, sorted } => {
                if !*sorted {
                    // Later duplicates win, like in the hash index.
                    entries.reverse();
                    entries.sort_by_key(|&(id, _)| id);
                    entries.dedup_by_key(|&mut (id, _)| id);
                    *sorted = true;
                }
                entries
                    .binary_search_by_key(&id, |&(id, _)| id)
                    .ok()
                    .map(|i| entries[i].1)
            }
            LocationIndex::Hash(map) => map.get(&id).copied(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            LocationIndex::SparseMemArray { entries, .. } => entries.len(),
            LocationIndex::Hash(map) => map.len(),
        }
    }

    /// Fill in the node locations of a way. Returns the number of nodes
    /// whose location is unknown.
    pub fn resolve(&mut self, way: &mut Way) -> usize {
        let mut missing = 0;
        for node in &mut way.nodes {
            node.location = self.get(node.id);
            if node.location.is_none() {
                missing += 1;
            }
        }
        missing
    }
}

// ============================================================================
// Pass reader
// ============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct PassStats {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
}

/// Read all objects of the input once and hand those matching `filter` to
/// `handle`.
///
/// The first error returned by `handle` stops the processing of further
/// objects and is returned once the file has been read.
pub fn read_pass<F>(source: &InputSource, filter: ObjectFilter, label: &str, mut handle: F) -> Result<PassStats>
where
    F: FnMut(OsmObject) -> Result<()>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("{}...", label));

    let mut stats = PassStats::default();
    let mut failure: Option<anyhow::Error> = None;

    source.for_each_element(|element| {
        if failure.is_some() {
            return;
        }
        let Some(object) = convert_element(element, filter) else {
            return;
        };
        match &object {
            OsmObject::Node(_) => {
                stats.nodes += 1;
                if stats.nodes % 1_000_000 == 0 {
                    pb.set_message(format!("{}: {} nodes...", label, stats.nodes));
                }
            }
            OsmObject::Way(_) => {
                stats.ways += 1;
                if stats.ways % 100_000 == 0 {
                    pb.set_message(format!("{}: {} nodes, {} ways...", label, stats.nodes, stats.ways));
                }
            }
            OsmObject::Relation(_) => stats.relations += 1,
        }
        if let Err(err) = handle(object) {
            failure = Some(err);
        }
    })?;

    pb.finish_with_message(format!(
        "{}: {} nodes, {} ways, {} relations",
        label, stats.nodes, stats.ways, stats.relations
    ));

    match failure {
        Some(err) => Err(err),
        None => Ok(stats),
    }
}
