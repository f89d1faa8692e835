//! Join graph resolution: aliases, flipping, multi-hop exposed joins.
//!
//! The resolver builds the ordered FROM clause for a query. Tables enter the
//! graph three ways: the main table, joins the caller requested, and tables
//! pulled in implicitly by qualified field references or security lock
//! chains. Join metadata is undirected; when a join is used in the opposite
//! direction from how it was declared, the entry is marked `flipped` and the
//! ON-clause generator keeps the literal condition correct.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{EngineError, Result};
use crate::model::{Join, JoinCardinality, MetaInstance};
use crate::query::joins::{JoinKind, QueryJoin};

/// One resolved JOIN clause entry, in FROM-clause order.
#[derive(Debug, Clone)]
pub struct ResolvedJoin {
    /// Name of the metadata join backing this entry.
    pub join_name: String,
    /// Table joined in by this entry.
    pub table: String,
    /// Alias of the joined table.
    pub alias: String,
    /// Alias of the already-present side the join attaches to.
    pub base_alias: String,
    /// True when the base side is the join's declared right table.
    pub flipped: bool,
    /// SQL join type.
    pub kind: JoinKind,
    /// Whether the joined table's columns appear in the output.
    pub select: bool,
    /// Whether traversal in this direction can fan rows out.
    pub fans_out: bool,
}

/// Ordered set of tables participating in one query.
#[derive(Debug)]
pub struct JoinGraph {
    main_table: String,
    entries: Vec<ResolvedJoin>,
    // (alias, table) in FROM order; index 0 is the main table.
    aliases: Vec<(String, String)>,
}

struct PathEdge {
    join_name: String,
    from_table: String,
    to_table: String,
}

impl JoinGraph {
    /// Starts a graph at the given main table.
    pub fn new(meta: &MetaInstance, main_table: &str) -> Result<Self> {
        meta.table(main_table)?;
        Ok(Self {
            main_table: main_table.to_owned(),
            entries: Vec::new(),
            aliases: vec![(main_table.to_owned(), main_table.to_owned())],
        })
    }

    /// Logical name of the main table.
    pub fn main_table(&self) -> &str {
        &self.main_table
    }

    /// Alias of the main table (always its logical name).
    pub fn main_alias(&self) -> &str {
        &self.main_table
    }

    /// Resolved join entries in FROM-clause order.
    pub fn entries(&self) -> &[ResolvedJoin] {
        &self.entries
    }

    /// All (alias, table) pairs in FROM order, main table first.
    pub fn alias_table_pairs(&self) -> &[(String, String)] {
        &self.aliases
    }

    /// Whether any resolved join can fan main-table rows out.
    pub fn has_to_many(&self) -> bool {
        self.entries.iter().any(|e| e.fans_out)
    }

    /// Resolves a qualifier (alias, or table name as fallback) to its alias
    /// and table.
    pub fn alias_for(&self, qualifier: &str) -> Option<(&str, &str)> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == qualifier)
            .or_else(|| self.aliases.iter().find(|(_, table)| table == qualifier))
            .map(|(alias, table)| (alias.as_str(), table.as_str()))
    }

    /// Adds one caller-requested join.
    ///
    /// With an explicit `join_name` the metadata join is used as-is. Without
    /// one, the resolver scans for joins connecting the target table to a
    /// present table: more than one candidate is an ambiguity error, exactly
    /// one resolves directly, and none falls back to a breadth-first search
    /// through exposed joins, adding intermediate tables as unselected hops.
    pub fn add_query_join(&mut self, meta: &MetaInstance, qj: &QueryJoin) -> Result<()> {
        meta.table(&qj.table)?;
        let alias = qj.effective_alias().to_owned();
        if self.contains_alias(&alias) {
            return Err(EngineError::DuplicateAlias { alias });
        }

        if let Some(join_name) = &qj.join_name {
            let join = meta.join(join_name)?.clone();
            let base_alias = match &qj.base_table_or_alias {
                Some(base) => {
                    let (base_alias, _) =
                        self.alias_for(base)
                            .ok_or_else(|| EngineError::UnresolvedAlias {
                                alias: base.clone(),
                                context: format!("join '{join_name}'"),
                            })?;
                    base_alias.to_owned()
                }
                None => self
                    .aliases
                    .iter()
                    .find(|(_, table)| join.other_side(table) == Some(qj.table.as_str()))
                    .map(|(alias, _)| alias.clone())
                    .ok_or_else(|| EngineError::NoJoinPath {
                        from: self.main_table.clone(),
                        table: qj.table.clone(),
                    })?,
            };
            let base_table = self.table_of(&base_alias).to_owned();
            let flipped = if join.left_table == base_table {
                false
            } else if join.right_table == base_table {
                true
            } else {
                return Err(EngineError::NoJoinPath {
                    from: base_alias,
                    table: qj.table.clone(),
                });
            };
            let joined_table = if flipped {
                &join.left_table
            } else {
                &join.right_table
            };
            if joined_table != &qj.table {
                return Err(EngineError::NoJoinPath {
                    from: base_alias,
                    table: qj.table.clone(),
                });
            }
            return self.add_entry(entry_from(
                &join, qj.table.clone(), alias, base_alias, flipped, qj.kind, qj.select,
            ));
        }

        // Candidate scan over joins directly connecting a present table.
        let mut candidates: Vec<(&Join, String)> = Vec::new();
        for join in meta.joins_touching(&qj.table) {
            let Some(other) = join.other_side(&qj.table) else {
                continue;
            };
            let base_alias = match &qj.base_table_or_alias {
                Some(base) => match self.alias_for(base) {
                    Some((base_alias, base_table)) if base_table == other => {
                        Some(base_alias.to_owned())
                    }
                    _ => None,
                },
                None => self
                    .aliases
                    .iter()
                    .find(|(_, table)| table == other)
                    .map(|(alias, _)| alias.clone()),
            };
            if let Some(base_alias) = base_alias {
                if !candidates.iter().any(|(j, _)| j.name == join.name) {
                    candidates.push((join, base_alias));
                }
            }
        }

        match candidates.len() {
            1 => {
                let (join, base_alias) = candidates.remove(0);
                let join = join.clone();
                let base_table = self.table_of(&base_alias).to_owned();
                let flipped = join.right_table == base_table && join.left_table != base_table;
                self.add_entry(entry_from(
                    &join, qj.table.clone(), alias, base_alias, flipped, qj.kind, qj.select,
                ))
            }
            0 => self.add_via_path(meta, qj, alias),
            n => Err(EngineError::AmbiguousJoin {
                table: qj.table.clone(),
                candidates: n,
            }),
        }
    }

    /// Ensures a table participates in the graph, joining it in through the
    /// unique connecting path if absent. Returns its alias.
    pub fn ensure_table(&mut self, meta: &MetaInstance, table: &str) -> Result<String> {
        if let Some((alias, _)) = self.alias_for(table) {
            return Ok(alias.to_owned());
        }
        meta.table(table)?;
        self.add_query_join(meta, &QueryJoin::new(table))?;
        Ok(table.to_owned())
    }

    /// Walks a chain of named joins from `start_alias`, adding any missing
    /// hops, and returns the alias of the chain's final table.
    ///
    /// Hops already present for the same purpose (same join, same base) are
    /// reused; otherwise a fresh alias is generated so an alias present for a
    /// different purpose is never duplicated.
    pub fn ensure_join_chain(
        &mut self,
        meta: &MetaInstance,
        start_alias: &str,
        chain: &[String],
    ) -> Result<String> {
        let mut current_alias = start_alias.to_owned();
        let mut current_table = self.table_of(&current_alias).to_owned();
        for join_name in chain {
            let join = meta.join(join_name)?.clone();
            let next_table = join
                .other_side(&current_table)
                .ok_or_else(|| EngineError::InvalidMetadata {
                    reason: format!("join '{join_name}' does not touch table '{current_table}'"),
                })?
                .to_owned();

            if let Some(entry) = self
                .entries
                .iter()
                .find(|e| &e.join_name == join_name && e.base_alias == current_alias)
            {
                current_alias = entry.alias.clone();
                current_table = entry.table.clone();
                continue;
            }

            let flipped = join.right_table == current_table && join.left_table != current_table;
            let alias = self.unique_alias(&next_table);
            self.add_entry(entry_from(
                &join,
                next_table.clone(),
                alias.clone(),
                current_alias,
                flipped,
                JoinKind::Inner,
                false,
            ))?;
            current_alias = alias;
            current_table = next_table;
        }
        Ok(current_alias)
    }

    fn add_via_path(&mut self, meta: &MetaInstance, qj: &QueryJoin, alias: String) -> Result<()> {
        let starts: Vec<(String, String)> = match &qj.base_table_or_alias {
            Some(base) => {
                let (base_alias, base_table) =
                    self.alias_for(base)
                        .ok_or_else(|| EngineError::UnresolvedAlias {
                            alias: base.clone(),
                            context: format!("join to '{}'", qj.table),
                        })?;
                vec![(base_alias.to_owned(), base_table.to_owned())]
            }
            None => self.aliases.clone(),
        };
        let from = starts[0].1.clone();

        let path = self
            .find_path(meta, &starts, &qj.table)
            .ok_or(EngineError::NoJoinPath {
                from,
                table: qj.table.clone(),
            })?;

        let mut current_alias = starts
            .iter()
            .find(|(_, table)| *table == path[0].from_table)
            .map(|(alias, _)| alias.clone())
            .expect("path starts at a present table");

        let last = path.len() - 1;
        for (i, edge) in path.iter().enumerate() {
            let join = meta.join(&edge.join_name)?.clone();
            let flipped = join.right_table == edge.from_table && join.left_table != edge.from_table;
            let (hop_alias, select) = if i == last {
                (alias.clone(), qj.select)
            } else {
                if self.contains_alias(&edge.to_table) {
                    return Err(EngineError::DuplicateAlias {
                        alias: edge.to_table.clone(),
                    });
                }
                (edge.to_table.clone(), false)
            };
            self.add_entry(entry_from(
                &join,
                edge.to_table.clone(),
                hop_alias.clone(),
                current_alias,
                flipped,
                qj.kind,
                select,
            ))?;
            current_alias = hop_alias;
        }
        Ok(())
    }

    // Breadth-first search over exposed joins. Present tables count as
    // visited so a path never runs through an alias already in the query.
    fn find_path(
        &self,
        meta: &MetaInstance,
        starts: &[(String, String)],
        target: &str,
    ) -> Option<Vec<PathEdge>> {
        let mut visited: HashSet<String> =
            self.aliases.iter().map(|(_, table)| table.clone()).collect();
        let mut parent: HashMap<String, (String, String)> = HashMap::new();
        let mut queue: VecDeque<String> = starts.iter().map(|(_, table)| table.clone()).collect();

        while let Some(table) = queue.pop_front() {
            for join in meta.joins_touching(&table).filter(|j| j.exposed) {
                let Some(next) = join.other_side(&table) else {
                    continue;
                };
                if visited.contains(next) {
                    continue;
                }
                visited.insert(next.to_owned());
                parent.insert(next.to_owned(), (join.name.clone(), table.clone()));
                if next == target {
                    let mut edges = Vec::new();
                    let mut cursor = target.to_owned();
                    while let Some((join_name, from_table)) = parent.get(&cursor) {
                        edges.push(PathEdge {
                            join_name: join_name.clone(),
                            from_table: from_table.clone(),
                            to_table: cursor.clone(),
                        });
                        cursor = from_table.clone();
                    }
                    edges.reverse();
                    return Some(edges);
                }
                queue.push_back(next.to_owned());
            }
        }
        None
    }

    fn add_entry(&mut self, entry: ResolvedJoin) -> Result<()> {
        if self.contains_alias(&entry.alias) {
            return Err(EngineError::DuplicateAlias {
                alias: entry.alias.clone(),
            });
        }
        self.aliases.push((entry.alias.clone(), entry.table.clone()));
        self.entries.push(entry);
        Ok(())
    }

    fn contains_alias(&self, alias: &str) -> bool {
        self.aliases.iter().any(|(a, _)| a == alias)
    }

    fn table_of<'a>(&'a self, alias: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(a, _)| a == alias)
            .map(|(_, table)| table.as_str())
            .unwrap_or(alias)
    }

    fn unique_alias(&self, base: &str) -> String {
        if !self.contains_alias(base) {
            return base.to_owned();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.contains_alias(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn entry_from(
    join: &Join,
    table: String,
    alias: String,
    base_alias: String,
    flipped: bool,
    kind: JoinKind,
    select: bool,
) -> ResolvedJoin {
    ResolvedJoin {
        join_name: join.name.clone(),
        table,
        alias,
        base_alias,
        flipped,
        kind,
        select,
        fans_out: !flipped && join.cardinality == JoinCardinality::OneToMany,
    }
}
