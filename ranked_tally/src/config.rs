// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The definition of a poll, as far as tabulation is concerned.
///
/// The order of the candidates is the display order. It carries no preference, but it
/// is the order used for every per-candidate listing in the results.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Poll {
    pub candidates: Vec<String>,
}

impl Poll {
    pub fn new(candidates: &[String]) -> Poll {
        Poll {
            candidates: candidates.to_vec(),
        }
    }
}

/// A validated ballot: distinct labels of the poll, most preferred first.
///
/// Ballots are only created through [crate::normalize_ballot] (or the builder), so that
/// the engine never sees unknown or repeated labels. An empty ballot is an abstention.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ballot {
    pub(crate) ranking: Vec<String>,
}

impl Ballot {
    pub fn ranking(&self) -> &[String] {
        &self.ranking
    }

    pub fn is_abstention(&self) -> bool {
        self.ranking.is_empty()
    }
}

// ******** Output data structures *********

/// Where the ballots of an eliminated candidate went.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub name: String,
    /// The next active choice of the transferred ballots, in poll order.
    pub transfers: Vec<(String, u64)>,
    /// Ballots that had no other active choice.
    pub exhausted: u64,
}

/// Statistics for one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundRecord {
    /// 1-based.
    pub round: u32,
    /// The vote count of every candidate still active at the start of the round, in poll order.
    pub tally: Vec<(String, u64)>,
    /// The ballots that still had an active choice (the majority denominator).
    pub active_ballots: u64,
    /// The non-abstaining ballots that were exhausted at this round.
    pub exhausted: u64,
    /// The smallest count that is a strict majority of the active ballots.
    pub threshold: u64,
    /// The candidates removed at the end of this round, in poll order.
    pub eliminated: Vec<String>,
    pub tie_broken_by_borda: bool,
    /// The restricted Borda scores of the candidates tied for last place, when a
    /// tie-break was needed.
    pub borda_scores: Option<Vec<(String, u64)>>,
    pub transfers: Vec<EliminationStats>,
    /// The candidates in an unresolved tie. Only filled for the last round of a tied poll.
    pub tied: Vec<String>,
}

/// The winner of the instant-runoff tabulation.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Winner {
    Candidate(String),
    /// The remaining candidates could not be separated, even with the Borda count.
    Tie,
}

impl Winner {
    pub const TIE_LABEL: &'static str = "tie";

    /// The candidate label, or "tie".
    pub fn label(&self) -> &str {
        match self {
            Winner::Candidate(name) => name.as_str(),
            Winner::Tie => Winner::TIE_LABEL,
        }
    }
}

impl Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The state in which the tabulation stopped.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Outcome {
    MajorityReached,
    SingleCandidateRemains,
    UnresolvedTie,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::MajorityReached => "majorityReached",
            Outcome::SingleCandidateRemains => "singleCandidateRemains",
            Outcome::UnresolvedTie => "unresolvedTie",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TabulationResult {
    pub winner: Winner,
    pub outcome: Outcome,
    pub total_rounds: u32,
    pub rounds: Vec<RoundRecord>,
}

/// One row of the materialized round history: one active candidate in one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundRow {
    pub round_number: u32,
    pub candidate: String,
    pub vote_count: u64,
    pub is_eliminated: bool,
    pub borda_score: Option<u64>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BordaResult {
    /// Every candidate of the poll, in poll order.
    pub scores: Vec<(String, u64)>,
    /// The ballots that ranked at least one candidate.
    pub ballots_counted: u64,
}

/// The instant-runoff result, with the Borda count reported alongside it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PollResults {
    pub irv: TabulationResult,
    pub borda: BordaResult,
}

/// Why a ballot was refused.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum InvalidBallotReason {
    UnknownCandidate(String),
    DuplicateCandidate(String),
}

/// Errors that prevent the tabulation from running.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyErrors {
    EmptyCandidateSet,
    /// The candidate list of the poll repeats a label.
    DuplicateCandidate(String),
    /// A candidate uses the label that reports a tied poll.
    ReservedCandidateName(String),
    /// The active set given to [crate::tally_round] names a label outside the poll.
    UnknownActiveCandidate(String),
    InvalidBallot(InvalidBallotReason),
}

impl Error for TallyErrors {}

impl Display for TallyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyErrors::EmptyCandidateSet => write!(f, "the poll has no candidates"),
            TallyErrors::DuplicateCandidate(name) => {
                write!(f, "the poll lists candidate {:?} more than once", name)
            }
            TallyErrors::ReservedCandidateName(name) => {
                write!(f, "{:?} is reserved for tied polls and cannot be a candidate", name)
            }
            TallyErrors::UnknownActiveCandidate(name) => {
                write!(f, "the active set names {:?}, which is not a candidate of this poll", name)
            }
            TallyErrors::InvalidBallot(InvalidBallotReason::UnknownCandidate(name)) => {
                write!(f, "invalid ballot: {:?} is not a candidate of this poll", name)
            }
            TallyErrors::InvalidBallot(InvalidBallotReason::DuplicateCandidate(name)) => {
                write!(f, "invalid ballot: {:?} is ranked more than once", name)
            }
        }
    }
}
