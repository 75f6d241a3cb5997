/*!
Instant-runoff tabulation for ranked-choice polls, with the Borda count used both as
an alternative result and as the tie-breaker between candidates tied for last place.

```
use ranked_tally::builder::Builder;
use ranked_tally::Winner;
# use ranked_tally::TallyErrors;

let s = |v: &[&str]| v.iter().map(|x| x.to_string()).collect::<Vec<String>>();

let mut builder = Builder::new().candidates(&s(&["A", "B", "C"]))?;
builder.add_ballot(&s(&["A", "B", "C"]))?;
builder.add_ballot(&s(&["B", "A", "C"]))?;
builder.add_ballot(&s(&["C", "A", "B"]))?;
builder.add_ballot(&s(&["A"]))?;

let result = builder.tabulate_irv()?;
assert_eq!(result.winner, Winner::Candidate("A".to_string()));
assert_eq!(result.total_rounds, 2);
# Ok::<(), TallyErrors>(())
```
*/

mod assemble;
mod borda;
pub mod builder;
mod config;
pub mod manual;
mod normalize;

use log::{debug, info};

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::{Add, AddAssign},
};

pub use crate::assemble::tabulate;
pub use crate::borda::tabulate_borda;
pub use crate::config::*;
pub use crate::normalize::normalize_ballot;

// **** Private structures ****

type RoundId = u32;

/// The position of the candidate in the poll. Sorting by id is sorting in poll order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

// Invariant: first_valid is still active in the round that holds this choice.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct RankedChoice {
    first_valid: CandidateId,
    rest: Vec<CandidateId>,
}

impl RankedChoice {
    /// Moves past the eliminated candidates. Returns None if the ballot is exhausted.
    fn filtered_candidate(&self, still_valid: &BTreeSet<CandidateId>) -> Option<RankedChoice> {
        if still_valid.contains(&self.first_valid) {
            return Some(self.clone());
        }
        advance_voting(&self.rest, still_valid)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct VoteInternal {
    candidates: RankedChoice,
    count: VoteCount,
}

/// All the identical ballots of the poll, grouped together.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct VoteSignature {
    // Guaranteed to never be empty at construction: abstentions are counted apart.
    ranks: Vec<CandidateId>,
    // Guaranteed to never be zero at construction
    count: VoteCount,
}

// Flag to indicate how the candidates of a round were selected for elimination.
#[derive(Eq, PartialEq, Debug, Clone)]
enum TiebreakSituation {
    Clean,
    // The restricted Borda scores of the tied candidates.
    BordaOccured(Vec<(CandidateId, VoteCount)>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum Elimination {
    Eliminate(Vec<CandidateId>, TiebreakSituation),
    // Every active candidate is tied, the Borda count included.
    Unresolved(Vec<CandidateId>, Vec<(CandidateId, VoteCount)>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundStatus {
    Running,
    Elected(CandidateId, Outcome),
    Tied,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundStatistics {
    tally: Vec<(CandidateId, VoteCount)>,
    active_ballots: VoteCount,
    exhausted: VoteCount,
    threshold: VoteCount,
    eliminated: Vec<CandidateId>,
    tiebreak: TiebreakSituation,
    /// For every eliminated candidate, the transfers of its ballots and the exhausted ones.
    transfers: Vec<(CandidateId, Vec<(CandidateId, VoteCount)>, VoteCount)>,
    tied: Vec<CandidateId>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundResult {
    votes: Vec<VoteInternal>,
    stats: RoundStatistics,
    status: RoundStatus,
}

/// The first-preference counts of one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundTally {
    /// Every active candidate, in poll order.
    pub counts: Vec<(String, u64)>,
    pub active_ballots: u64,
    /// Non-abstaining ballots with no active choice left.
    pub exhausted: u64,
}

/// Counts the first preferences among the given active candidates.
///
/// Every ballot goes to its highest ranked active candidate. Ballots without any active
/// candidate are exhausted, and abstentions are not counted at all.
pub fn tally_round(
    poll: &Poll,
    ballots: &[Ballot],
    active: &[String],
) -> Result<RoundTally, TallyErrors> {
    let cr = checks(poll, ballots)?;
    let mut still_valid: BTreeSet<CandidateId> = BTreeSet::new();
    for name in active.iter() {
        let cid = cr
            .candidates
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cid)| *cid)
            .ok_or_else(|| TallyErrors::UnknownActiveCandidate(name.clone()))?;
        still_valid.insert(cid);
    }
    let active_candidates: Vec<(String, CandidateId)> = cr
        .candidates
        .iter()
        .filter(|(_, cid)| still_valid.contains(cid))
        .cloned()
        .collect();

    let votes = initial_votes(&cr.signatures, &still_valid);
    let tally = compute_tally(&votes, &active_candidates);
    let active_ballots: VoteCount = votes.iter().map(|v| v.count).sum();
    Ok(RoundTally {
        counts: tally
            .iter()
            .map(|(cid, vc)| (cr.candidate_name(*cid), vc.0))
            .collect(),
        active_ballots: active_ballots.0,
        exhausted: cr.counted.0 - active_ballots.0,
    })
}

/// Runs the instant-runoff tabulation.
///
/// Arguments:
/// * `poll` the candidates of the poll
/// * `ballots` a consistent snapshot of the accepted ballots
///
/// The result is fully determined by the multiset of ballots: their order does not matter.
pub fn tabulate_irv(poll: &Poll, ballots: &[Ballot]) -> Result<TabulationResult, TallyErrors> {
    info!(
        "tabulate_irv: processing {:?} ballots, candidates: {:?}",
        ballots.len(),
        poll.candidates
    );

    let cr: CheckResult = checks(poll, ballots)?;
    debug!(
        "tabulate_irv: {:?} distinct rankings, {:?} abstentions",
        cr.signatures.len(),
        cr.abstentions
    );
    for (name, cid) in cr.candidates.iter() {
        info!("Candidate: {}: {}", cid.0, name);
    }

    let all_ids: BTreeSet<CandidateId> = cr.candidates.iter().map(|(_, cid)| *cid).collect();

    // The candidates that are still running, in poll order.
    let mut cur_candidates: Vec<(String, CandidateId)> = cr.candidates.clone();
    let mut cur_votes: Vec<VoteInternal> = initial_votes(&cr.signatures, &all_ids);
    let mut cur_stats: Vec<RoundStatistics> = Vec::new();

    loop {
        let round_id = (cur_stats.len() + 1) as RoundId;
        debug!(
            "Round id: {:?} cur_candidates: {:?}",
            round_id, cur_candidates
        );
        let round_res = run_one_round(&cur_votes, &cr, &cur_candidates);
        info!("Round id: {:?} stats: {:?}", round_id, round_res.stats);

        let eliminated: BTreeSet<CandidateId> =
            round_res.stats.eliminated.iter().cloned().collect();
        cur_stats.push(round_res.stats);
        cur_votes = round_res.votes;

        let (winner, outcome) = match round_res.status {
            RoundStatus::Running => {
                let survivors: Vec<(String, CandidateId)> = cur_candidates
                    .iter()
                    .filter(|(_, cid)| !eliminated.contains(cid))
                    .cloned()
                    .collect();
                // Invariant: the number of candidates decreased and someone is left.
                assert!(
                    !survivors.is_empty() && survivors.len() < cur_candidates.len(),
                    "The number of candidates did not decrease properly: {:?} -> {:?}",
                    cur_candidates,
                    survivors
                );
                cur_candidates = survivors;
                continue;
            }
            RoundStatus::Elected(cid, outcome) => {
                (Winner::Candidate(cr.candidate_name(cid)), outcome)
            }
            RoundStatus::Tied => (Winner::Tie, Outcome::UnresolvedTie),
        };

        info!(
            "tabulate_irv: winner: {} ({:?}) after {} rounds",
            winner,
            outcome,
            cur_stats.len()
        );
        let rounds = round_results_to_stats(&cur_stats, &cr);
        return Ok(TabulationResult {
            winner,
            outcome,
            total_rounds: rounds.len() as u32,
            rounds,
        });
    }
}

fn initial_votes(
    signatures: &[VoteSignature],
    still_valid: &BTreeSet<CandidateId>,
) -> Vec<VoteInternal> {
    signatures
        .iter()
        .filter_map(|sig| {
            advance_voting(&sig.ranks, still_valid).map(|candidates| VoteInternal {
                candidates,
                count: sig.count,
            })
        })
        .collect()
}

fn get_threshold(active_ballots: VoteCount) -> VoteCount {
    if active_ballots == VoteCount::EMPTY {
        VoteCount::EMPTY
    } else {
        VoteCount((active_ballots.0 / 2) + 1)
    }
}

fn round_results_to_stats(results: &[RoundStatistics], cr: &CheckResult) -> Vec<RoundRecord> {
    results
        .iter()
        .enumerate()
        .map(|(idx, r)| round_result_to_stat(r, idx as RoundId + 1, cr))
        .collect()
}

fn round_result_to_stat(stats: &RoundStatistics, round_id: RoundId, cr: &CheckResult) -> RoundRecord {
    let names = |cids: &[CandidateId]| -> Vec<String> {
        cids.iter().map(|cid| cr.candidate_name(*cid)).collect()
    };
    let with_names = |counts: &[(CandidateId, VoteCount)]| -> Vec<(String, u64)> {
        counts
            .iter()
            .map(|(cid, vc)| (cr.candidate_name(*cid), vc.0))
            .collect()
    };

    RoundRecord {
        round: round_id,
        tally: with_names(&stats.tally[..]),
        active_ballots: stats.active_ballots.0,
        exhausted: stats.exhausted.0,
        threshold: stats.threshold.0,
        eliminated: names(&stats.eliminated[..]),
        tie_broken_by_borda: matches!(stats.tiebreak, TiebreakSituation::BordaOccured(_)),
        borda_scores: match &stats.tiebreak {
            TiebreakSituation::Clean => None,
            TiebreakSituation::BordaOccured(scores) => Some(with_names(&scores[..])),
        },
        transfers: stats
            .transfers
            .iter()
            .map(|(cid, transfers, exhausted)| EliminationStats {
                name: cr.candidate_name(*cid),
                transfers: with_names(&transfers[..]),
                exhausted: exhausted.0,
            })
            .collect(),
        tied: names(&stats.tied[..]),
    }
}

// The tally is returned in poll order and includes the candidates without any vote.
fn compute_tally(
    votes: &[VoteInternal],
    candidate_names: &[(String, CandidateId)],
) -> Vec<(CandidateId, VoteCount)> {
    let mut tally: BTreeMap<CandidateId, VoteCount> = candidate_names
        .iter()
        .map(|(_, cid)| (*cid, VoteCount::EMPTY))
        .collect();
    for v in votes.iter() {
        let vc = tally
            .get_mut(&v.candidates.first_valid)
            .expect("a vote points to an inactive candidate");
        *vc += v.count;
    }
    tally.into_iter().collect()
}

fn run_one_round(
    votes: &[VoteInternal],
    cr: &CheckResult,
    candidate_names: &[(String, CandidateId)],
) -> RoundResult {
    let tally = compute_tally(votes, candidate_names);
    debug!("run_one_round: tally: {:?}", tally);

    let active_ballots: VoteCount = votes.iter().map(|v| v.count).sum();
    assert!(
        active_ballots <= cr.counted,
        "More active ballots than counted ballots"
    );
    let exhausted = VoteCount(cr.counted.0 - active_ballots.0);
    let vote_threshold = get_threshold(active_ballots);
    debug!(
        "run_one_round: active ballots: {:?} exhausted: {:?} threshold: {:?}",
        active_ballots, exhausted, vote_threshold
    );

    let mut stats = RoundStatistics {
        tally: tally.clone(),
        active_ballots,
        exhausted,
        threshold: vote_threshold,
        eliminated: Vec::new(),
        tiebreak: TiebreakSituation::Clean,
        transfers: Vec::new(),
        tied: Vec::new(),
    };

    // A strict majority of the ballots that are still active.
    let majority = tally
        .iter()
        .find(|(_, vc)| active_ballots > VoteCount::EMPTY && *vc >= vote_threshold);
    if let Some((cid, vc)) = majority {
        debug!("run_one_round: {:?} has count {:?}, marking as winner", cid, vc);
        return RoundResult {
            votes: votes.to_vec(),
            stats,
            status: RoundStatus::Elected(*cid, Outcome::MajorityReached),
        };
    }

    // Only one candidate. It is the winner by any standard.
    if let [(cid, _)] = tally.as_slice() {
        debug!("run_one_round: only one candidate, directly winning: {:?}", cid);
        return RoundResult {
            votes: votes.to_vec(),
            stats,
            status: RoundStatus::Elected(*cid, Outcome::SingleCandidateRemains),
        };
    }

    let (eliminated, tiebreak) = match find_eliminated_candidates(&tally, &cr.signatures) {
        Elimination::Eliminate(eliminated, tiebreak) => (eliminated, tiebreak),
        Elimination::Unresolved(tied, scores) => {
            debug!("run_one_round: unresolved tie between {:?}", tied);
            stats.tiebreak = TiebreakSituation::BordaOccured(scores);
            stats.tied = tied;
            return RoundResult {
                votes: votes.to_vec(),
                stats,
                status: RoundStatus::Tied,
            };
        }
    };
    debug!("run_one_round: tiebreak situation: {:?}", tiebreak);
    debug!("run_one_round: eliminated_candidates: {:?}", eliminated);

    let eliminated_set: BTreeSet<CandidateId> = eliminated.iter().cloned().collect();
    let remaining_candidates: BTreeSet<CandidateId> = candidate_names
        .iter()
        .map(|(_, cid)| *cid)
        .filter(|cid| !eliminated_set.contains(cid))
        .collect();

    // Statistics about transfers:
    // For every eliminated candidate, keep the vote transfers and the exhausted votes.
    let mut elimination_stats: BTreeMap<CandidateId, (BTreeMap<CandidateId, VoteCount>, VoteCount)> =
        eliminated
            .iter()
            .map(|cid| (*cid, (BTreeMap::new(), VoteCount::EMPTY)))
            .collect();

    // Filter the rest of the votes to simply keep the votes that still matter
    let rem_votes: Vec<VoteInternal> = votes
        .iter()
        .filter_map(|va| {
            let new_rank = va.candidates.filtered_candidate(&remaining_candidates);
            let old_first = va.candidates.first_valid;
            match (&new_rank, elimination_stats.get_mut(&old_first)) {
                (None, Some(e)) => {
                    // Ballot is now exhausted. Record the exhausted vote.
                    e.1 += va.count;
                }
                (Some(nr), Some(e)) => {
                    // The ballot has been transfered. Record the transfer.
                    let e2 = e.0.entry(nr.first_valid).or_insert(VoteCount::EMPTY);
                    *e2 += va.count;
                }
                (_, None) => {
                    // Nothing to do, the first choice is the same.
                }
            }
            new_rank.map(|rc| VoteInternal {
                candidates: rc,
                count: va.count,
            })
        })
        .collect();

    stats.eliminated = eliminated;
    stats.tiebreak = tiebreak;
    stats.transfers = elimination_stats
        .into_iter()
        .map(|(cid, (transfers, exhausted))| (cid, transfers.into_iter().collect(), exhausted))
        .collect();

    RoundResult {
        votes: rem_votes,
        stats,
        status: RoundStatus::Running,
    }
}

// Expects at least two candidates in the tally.
fn find_eliminated_candidates(
    tally: &[(CandidateId, VoteCount)],
    signatures: &[VoteSignature],
) -> Elimination {
    assert!(tally.len() >= 2);

    let min_count: VoteCount = tally
        .iter()
        .map(|(_, vc)| *vc)
        .min()
        .unwrap_or(VoteCount::EMPTY);
    let all_smallest: Vec<CandidateId> = tally
        .iter()
        .filter(|(_, vc)| *vc == min_count)
        .map(|(cid, _)| *cid)
        .collect();
    debug!(
        "find_eliminated_candidates: all_smallest: {:?}",
        all_smallest
    );
    assert!(!all_smallest.is_empty());

    // No tiebreak, the logic below is not relevant.
    if all_smallest.len() == 1 {
        return Elimination::Eliminate(all_smallest, TiebreakSituation::Clean);
    }

    let scores: Vec<(CandidateId, VoteCount)> = borda::borda_scores(signatures, &all_smallest);
    debug!(
        "find_eliminated_candidates: restricted Borda scores: {:?}",
        scores
    );
    let min_score: VoteCount = scores
        .iter()
        .map(|(_, s)| *s)
        .min()
        .unwrap_or(VoteCount::EMPTY);
    let lowest: Vec<CandidateId> = scores
        .iter()
        .filter(|(_, s)| *s == min_score)
        .map(|(cid, _)| *cid)
        .collect();

    // We would be removing all the candidates.
    if lowest.len() == tally.len() {
        return Elimination::Unresolved(lowest, scores);
    }
    Elimination::Eliminate(lowest, TiebreakSituation::BordaOccured(scores))
}

/// Finds the first choice that is still valid. The rest of the ranking is kept as is.
fn advance_voting(
    choices: &[CandidateId],
    still_valid: &BTreeSet<CandidateId>,
) -> Option<RankedChoice> {
    let idx = choices.iter().position(|cid| still_valid.contains(cid))?;
    Some(RankedChoice {
        first_valid: choices[idx],
        rest: choices[idx + 1..].to_vec(),
    })
}

struct CheckResult {
    // In poll order
    candidates: Vec<(String, CandidateId)>,
    // Sorted by ranking, so that the order of the ballots does not matter.
    signatures: Vec<VoteSignature>,
    // The ballots that ranked at least one candidate.
    counted: VoteCount,
    abstentions: VoteCount,
}

impl CheckResult {
    fn candidate_name(&self, cid: CandidateId) -> String {
        self.candidates[cid.0 as usize].0.clone()
    }
}

// Maps the labels to candidate ids and groups the identical ballots.
/// The candidate list must be non-empty, without repeats, and must not use the tie label.
pub(crate) fn check_candidate_names(candidates: &[String]) -> Result<(), TallyErrors> {
    if candidates.is_empty() {
        return Err(TallyErrors::EmptyCandidateSet);
    }
    for (idx, name) in candidates.iter().enumerate() {
        if name == Winner::TIE_LABEL {
            return Err(TallyErrors::ReservedCandidateName(name.clone()));
        }
        if candidates[..idx].contains(name) {
            return Err(TallyErrors::DuplicateCandidate(name.clone()));
        }
    }
    Ok(())
}

fn checks(poll: &Poll, ballots: &[Ballot]) -> Result<CheckResult, TallyErrors> {
    debug!("checks: {:?} ballots", ballots.len());
    check_candidate_names(&poll.candidates)?;
    let ids: BTreeMap<&str, CandidateId> = poll
        .candidates
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), CandidateId(idx as u32)))
        .collect();

    let mut grouped: BTreeMap<Vec<CandidateId>, VoteCount> = BTreeMap::new();
    let mut abstentions = VoteCount::EMPTY;
    for b in ballots.iter() {
        if b.is_abstention() {
            abstentions += VoteCount(1);
            continue;
        }
        // The ballot was normalized, possibly against another poll: check it again.
        let mut ranks: Vec<CandidateId> = Vec::with_capacity(b.ranking.len());
        for name in b.ranking.iter() {
            let cid = *ids.get(name.as_str()).ok_or_else(|| {
                TallyErrors::InvalidBallot(InvalidBallotReason::UnknownCandidate(name.clone()))
            })?;
            if ranks.contains(&cid) {
                return Err(TallyErrors::InvalidBallot(
                    InvalidBallotReason::DuplicateCandidate(name.clone()),
                ));
            }
            ranks.push(cid);
        }
        *grouped.entry(ranks).or_insert(VoteCount::EMPTY) += VoteCount(1);
    }

    let signatures: Vec<VoteSignature> = grouped
        .into_iter()
        .map(|(ranks, count)| VoteSignature { ranks, count })
        .collect();
    let counted: VoteCount = signatures.iter().map(|s| s.count).sum();

    Ok(CheckResult {
        candidates: poll
            .candidates
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), CandidateId(idx as u32)))
            .collect(),
        signatures,
        counted,
        abstentions,
    })
}
