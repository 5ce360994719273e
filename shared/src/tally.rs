use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::models::{Candidate, Role, Vote};

/// Rebuilds every candidate's `votes` from the vote list. The vote list is the
/// source of truth; references to candidates that no longer exist are skipped.
pub fn recount(presidents: &mut [Candidate], mayors: &mut [Candidate], votes: &[Vote]) {
    presidents.iter_mut().chain(mayors.iter_mut()).for_each(|c| c.votes = 0);

    let president_idx = index_by_id(presidents);
    let mayor_idx = index_by_id(mayors);

    for vote in votes {
        if let Some(&i) = president_idx.get(vote.president_id.as_str()) {
            presidents[i].votes += 1;
        }
        if let Some(&i) = mayor_idx.get(vote.mayor_id.as_str()) {
            mayors[i].votes += 1;
        }
    }
}

// First occurrence wins when ids repeat.
fn index_by_id(candidates: &[Candidate]) -> HashMap<String, usize> {
    let mut idx = HashMap::with_capacity(candidates.len());
    for (i, c) in candidates.iter().enumerate() {
        idx.entry(c.id.clone()).or_insert(i);
    }
    idx
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyEntry {
    pub candidate_id: String,
    pub name: String,
    pub party: String,
    pub votes: u32,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleTally {
    pub role: Role,
    pub total_votes: u32,
    pub leader: Option<String>,
    pub entries: Vec<TallyEntry>,
}

impl RoleTally {
    pub fn from_candidates(role: Role, candidates: &[Candidate]) -> Self {
        let total_votes: u32 = candidates.iter().map(|c| c.votes).sum();

        let entries = candidates.iter().map(|c| TallyEntry {
            candidate_id: c.id.clone(),
            name: c.name.clone(),
            party: c.party.clone(),
            votes: c.votes,
            share: if total_votes == 0 { 0.0 } else { f64::from(c.votes) * 100.0 / f64::from(total_votes) },
        }).collect();

        let leader = candidates.iter()
            .fold(None::<&Candidate>, |best, c| match best {
                Some(b) if c.votes <= b.votes => Some(b),
                _ => Some(c),
            })
            .map(|c| c.id.clone());

        Self { role, total_votes, leader, entries }
    }

    pub fn entry(&self, candidate_id: &str) -> Option<&TallyEntry> {
        self.entries.iter().find(|e| e.candidate_id == candidate_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub total_ballots: usize,
    pub presidents: RoleTally,
    pub mayors: RoleTally,
}

impl ElectionSummary {
    pub fn new(presidents: &[Candidate], mayors: &[Candidate], total_ballots: usize) -> Self {
        Self {
            total_ballots,
            presidents: RoleTally::from_candidates(Role::President, presidents),
            mayors: RoleTally::from_candidates(Role::Mayor, mayors),
        }
    }

    pub fn role(&self, role: Role) -> &RoleTally {
        match role {
            Role::President => &self.presidents,
            Role::Mayor => &self.mayors,
        }
    }
}
