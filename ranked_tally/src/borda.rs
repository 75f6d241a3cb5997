use log::debug;

use crate::{checks, Ballot, BordaResult, CandidateId, Poll, TallyErrors, VoteCount, VoteSignature};

/// Computes the Borda count of the poll.
///
/// On a ballot ranking `L` candidates, the candidate at position `i` (1-based) gets `L - i`
/// points: the last ranked candidate gets nothing, and so do the candidates that were not
/// ranked at all. Ties in the final scores are reported as they are.
pub fn tabulate_borda(poll: &Poll, ballots: &[Ballot]) -> Result<BordaResult, TallyErrors> {
    let cr = checks(poll, ballots)?;
    let all: Vec<CandidateId> = cr.candidates.iter().map(|(_, cid)| *cid).collect();
    let scores = borda_scores(&cr.signatures, &all);
    debug!("tabulate_borda: scores: {:?}", scores);
    Ok(BordaResult {
        scores: scores
            .iter()
            .map(|(cid, score)| (cr.candidate_name(*cid), score.0))
            .collect(),
        ballots_counted: cr.counted.0,
    })
}

/// The Borda scores restricted to the given candidates, in the same order.
///
/// Every ranking is first reduced to the relative order of these candidates, so that the
/// other candidates have no influence on the points.
pub(crate) fn borda_scores(
    votes: &[VoteSignature],
    candidates: &[CandidateId],
) -> Vec<(CandidateId, VoteCount)> {
    let mut scores: Vec<(CandidateId, VoteCount)> = candidates
        .iter()
        .map(|cid| (*cid, VoteCount::EMPTY))
        .collect();
    for v in votes.iter() {
        let reduced: Vec<CandidateId> = v
            .ranks
            .iter()
            .filter(|cid| candidates.contains(*cid))
            .cloned()
            .collect();
        let len = reduced.len() as u64;
        for (idx, cid) in reduced.iter().enumerate() {
            let points = len - 1 - idx as u64;
            if let Some(pos) = candidates.iter().position(|c| c == cid) {
                scores[pos].1 += VoteCount(points * v.count.0);
            }
        }
    }
    scores
}
