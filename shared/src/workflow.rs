use serde::{Serialize, Deserialize};
use tracing::{info, warn};
use crate::error::{ElectionError, Result};
use crate::kv::KeyValueStore;
use crate::models::{BallotDraft, Candidate, Role, Vote};
use crate::session::VoterSession;
use crate::storage::ElectionStore;
use crate::tally::RoleTally;

/// Where a voter stands: nothing chosen, one race chosen (a persisted draft),
/// or a final recorded vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BallotState {
    NoVote,
    Partial { draft: BallotDraft },
    Complete { vote: Vote },
}

impl BallotState {
    pub fn is_complete(&self) -> bool {
        matches!(self, BallotState::Complete { .. })
    }

    pub fn choice(&self, role: Role) -> Option<&str> {
        match self {
            BallotState::NoVote => None,
            BallotState::Partial { draft } => draft.choice(role),
            BallotState::Complete { vote } => Some(vote.choice(role)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterResults {
    pub vote: Vote,
    pub president: Option<Candidate>,
    pub mayor: Option<Candidate>,
    pub presidents: RoleTally,
    pub mayors: RoleTally,
}

impl<S: KeyValueStore> ElectionStore<S> {
    pub fn ballot_state(&self, voter: &VoterSession) -> BallotState {
        if let Some(vote) = self.user_vote(voter.dni()) {
            return BallotState::Complete { vote };
        }
        match self.draft(voter.dni()) {
            Some(draft) => BallotState::Partial { draft },
            None => BallotState::NoVote,
        }
    }

    /// Records the voter's choice for one race. The second race completes the
    /// ballot: the vote is written, tallies are rebuilt and the draft goes away.
    /// A recorded vote is final; once it is written the ballot reports
    /// `Complete` even if the follow-up writes fail.
    pub fn cast_selection(&mut self, voter: &VoterSession, role: Role, candidate_id: &str) -> Result<BallotState> {
        let dni = voter.dni();
        if self.user_vote(dni).is_some() {
            warn!(dni, "Rejected selection on a final ballot");
            return Err(ElectionError::AlreadyVoted);
        }
        if self.candidate(role, candidate_id).is_none() {
            return Err(ElectionError::CandidateNotFound { role, id: candidate_id.to_string() });
        }

        let mut draft = self.draft(dni).unwrap_or_else(|| BallotDraft::new(dni));
        draft.select(role, candidate_id);

        match draft.to_vote() {
            Some(vote) => {
                self.commit_vote(vote.clone())?;
                if let Err(e) = self.update_vote_counts() {
                    warn!(dni, error = %e, "Vote recorded but tallies were not rebuilt");
                }
                if let Err(e) = self.discard_draft(dni) {
                    warn!(dni, error = %e, "Vote recorded but its draft was not discarded");
                }
                info!(dni, "Ballot completed");
                Ok(BallotState::Complete { vote })
            }
            None => {
                self.save_draft(&draft)?;
                info!(dni, %role, "Partial ballot recorded");
                Ok(BallotState::Partial { draft })
            }
        }
    }

    pub fn voter_results(&self, voter: &VoterSession) -> Result<VoterResults> {
        let vote = self.user_vote(voter.dni()).ok_or(ElectionError::BallotIncomplete)?;
        let presidents = self.candidates(Role::President);
        let mayors = self.candidates(Role::Mayor);

        Ok(VoterResults {
            president: presidents.iter().find(|c| c.id == vote.president_id).cloned(),
            mayor: mayors.iter().find(|c| c.id == vote.mayor_id).cloned(),
            presidents: RoleTally::from_candidates(Role::President, &presidents),
            mayors: RoleTally::from_candidates(Role::Mayor, &mayors),
            vote,
        })
    }
}
