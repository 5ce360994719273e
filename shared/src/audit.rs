//! Data-quality pass over vote records, for admins cleaning up an import or
//! checking the stored list after candidates were removed.

use std::collections::HashSet;
use serde::{Serialize, Deserialize};
use crate::models::{Candidate, Vote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    MissingField,
    Duplicate,
    Inconsistent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub row: usize,
    pub vote: Vote,
    pub issue: Option<IssueKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub total: usize,
    pub clean: usize,
    pub missing_field: usize,
    pub duplicate: usize,
    pub inconsistent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub summary: AuditSummary,
    pub findings: Vec<AuditFinding>,
}

impl AuditReport {
    pub fn issue_count(&self) -> usize {
        self.summary.total - self.summary.clean
    }

    pub fn cleaned(&self) -> Vec<Vote> {
        self.findings.iter()
            .filter(|f| f.issue.is_none())
            .map(|f| f.vote.clone())
            .collect()
    }
}

/// One issue per row; a missing field outranks a duplicate, which outranks an
/// unknown candidate reference. The first row for a DNI is never the duplicate.
pub fn audit(rows: &[Vote], presidents: &[Candidate], mayors: &[Candidate]) -> AuditReport {
    let president_ids: HashSet<&str> = presidents.iter().map(|c| c.id.as_str()).collect();
    let mayor_ids: HashSet<&str> = mayors.iter().map(|c| c.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut summary = AuditSummary { total: rows.len(), ..Default::default() };

    let findings = rows.iter().enumerate().map(|(row, vote)| {
        let issue = if [&vote.dni, &vote.president_id, &vote.mayor_id].iter().any(|v| v.trim().is_empty()) {
            Some(IssueKind::MissingField)
        } else if !seen.insert(vote.dni.as_str()) {
            Some(IssueKind::Duplicate)
        } else if !president_ids.contains(vote.president_id.as_str()) || !mayor_ids.contains(vote.mayor_id.as_str()) {
            Some(IssueKind::Inconsistent)
        } else {
            None
        };

        match issue {
            None => summary.clean += 1,
            Some(IssueKind::MissingField) => summary.missing_field += 1,
            Some(IssueKind::Duplicate) => summary.duplicate += 1,
            Some(IssueKind::Inconsistent) => summary.inconsistent += 1,
        }

        AuditFinding { row, vote: vote.clone(), issue }
    }).collect();

    AuditReport { summary, findings }
}
