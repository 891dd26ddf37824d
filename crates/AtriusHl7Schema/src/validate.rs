use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::debug;

use crate::definition::{Hl7Schema, MemberDefinition, MemberReference};
use crate::error::{SchemaError, SchemaResult};

impl Hl7Schema {
    /// Checks the structural invariants the generator relies on.
    ///
    /// All violations are collected and reported together in a single
    /// [`SchemaError::Invalid`]:
    /// - field and component positions are contiguous and 1-based
    /// - datatype, segment, group and message names are unique
    /// - member names are unique inside each group and message
    /// - every referenced datatype, segment and group is declared
    /// - group references do not form a cycle
    pub fn validate(&self) -> SchemaResult<()> {
        let mut issues = Vec::new();

        check_unique("datatype", self.datatypes.iter().map(|d| d.name.as_str()), &mut issues);
        check_unique("segment", self.segments.iter().map(|s| s.name.as_str()), &mut issues);
        check_unique("group", self.groups.iter().map(|g| g.name.as_str()), &mut issues);
        check_unique("message", self.messages.iter().map(|m| m.name.as_str()), &mut issues);

        let datatypes: HashSet<&str> = self.datatypes.iter().map(|d| d.name.as_str()).collect();
        let segments: HashSet<&str> = self.segments.iter().map(|s| s.name.as_str()).collect();
        let groups: HashSet<&str> = self.groups.iter().map(|g| g.name.as_str()).collect();

        for datatype in &self.datatypes {
            let owner = format!("datatype {}", datatype.name);
            check_positions(&owner, datatype.components().iter().map(|c| c.position), &mut issues);
            for component in datatype.components() {
                if !datatypes.contains(component.datatype.as_str()) {
                    issues.push(format!(
                        "{owner} component {} references undeclared datatype {}",
                        component.position, component.datatype
                    ));
                }
            }
        }

        for segment in &self.segments {
            let owner = format!("segment {}", segment.name);
            if segment.fields.is_empty() {
                issues.push(format!("{owner} declares no fields"));
            }
            check_positions(&owner, segment.fields.iter().map(|f| f.position), &mut issues);
            for field in &segment.fields {
                if !datatypes.contains(field.datatype.as_str()) {
                    issues.push(format!(
                        "{owner} field {} references undeclared datatype {}",
                        field.position, field.datatype
                    ));
                }
                if field.max_length == Some(0) {
                    issues.push(format!("{owner} field {} has max_length 0", field.position));
                }
            }
        }

        for group in &self.groups {
            check_members(
                &format!("group {}", group.name),
                &group.members,
                &segments,
                &groups,
                &mut issues,
            );
        }

        for message in &self.messages {
            check_members(
                &format!("message {}", message.name),
                &message.members,
                &segments,
                &groups,
                &mut issues,
            );
        }

        check_group_cycles(self, &mut issues);

        if issues.is_empty() {
            debug!(
                "HL7 {} schema valid: {} datatypes, {} segments, {} groups, {} messages",
                self.version,
                self.datatypes.len(),
                self.segments.len(),
                self.groups.len(),
                self.messages.len()
            );
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                version: self.version.to_string(),
                issues,
            })
        }
    }
}

fn check_unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>, issues: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            issues.push(format!("{kind} with an empty name"));
        } else if !seen.insert(name) {
            issues.push(format!("duplicate {kind} {name}"));
        }
    }
}

fn check_positions(owner: &str, positions: impl Iterator<Item = usize>, issues: &mut Vec<String>) {
    for (index, position) in positions.enumerate() {
        if position != index + 1 {
            issues.push(format!(
                "{owner} has position {position} where {} was expected",
                index + 1
            ));
            // Later positions would all be reported as shifted; one finding is enough.
            return;
        }
    }
}

fn check_members(
    owner: &str,
    members: &[MemberDefinition],
    segments: &HashSet<&str>,
    groups: &HashSet<&str>,
    issues: &mut Vec<String>,
) {
    if members.is_empty() {
        issues.push(format!("{owner} declares no members"));
    }
    check_unique(
        &format!("member of {owner}:"),
        members.iter().map(|m| m.member_name()),
        issues,
    );
    for member in members {
        match &member.reference {
            MemberReference::Segment(name) if !segments.contains(name.as_str()) => {
                issues.push(format!("{owner} references undeclared segment {name}"));
            }
            MemberReference::Group(name) if !groups.contains(name.as_str()) => {
                issues.push(format!("{owner} references undeclared group {name}"));
            }
            _ => {}
        }
    }
}

fn check_group_cycles(schema: &Hl7Schema, issues: &mut Vec<String>) {
    let edges: BTreeMap<&str, Vec<&str>> = schema
        .groups
        .iter()
        .map(|g| {
            let children = g
                .members
                .iter()
                .filter_map(|m| match &m.reference {
                    MemberReference::Group(name) => Some(name.as_str()),
                    MemberReference::Segment(_) => None,
                })
                .collect();
            (g.name.as_str(), children)
        })
        .collect();

    let mut done = BTreeSet::new();
    for &start in edges.keys() {
        let mut path = Vec::new();
        if let Some(cycle) = find_cycle(start, &edges, &mut path, &mut done) {
            issues.push(format!("group cycle: {}", cycle.join(" -> ")));
            return;
        }
    }
}

fn find_cycle<'a>(
    node: &'a str,
    edges: &BTreeMap<&'a str, Vec<&'a str>>,
    path: &mut Vec<&'a str>,
    done: &mut BTreeSet<&'a str>,
) -> Option<Vec<&'a str>> {
    if let Some(start) = path.iter().position(|n| *n == node) {
        let mut cycle = path[start..].to_vec();
        cycle.push(node);
        return Some(cycle);
    }
    if done.contains(node) {
        return None;
    }
    path.push(node);
    for &child in edges.get(node).into_iter().flatten() {
        if let Some(cycle) = find_cycle(child, edges, path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    done.insert(node);
    None
}
