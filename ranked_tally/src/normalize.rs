use std::collections::HashSet;

use crate::{Ballot, InvalidBallotReason, Poll, TallyErrors};

/// Validates a raw ranking against the candidates of the poll.
///
/// The ranking is kept exactly as submitted. It is refused if it names a candidate that is
/// not part of the poll, or if it ranks the same candidate twice. An empty ranking is a
/// valid abstention.
pub fn normalize_ballot(raw: &[String], poll: &Poll) -> Result<Ballot, TallyErrors> {
    let mut seen: HashSet<&str> = HashSet::new();
    for name in raw.iter() {
        if !poll.candidates.contains(name) {
            return Err(TallyErrors::InvalidBallot(
                InvalidBallotReason::UnknownCandidate(name.clone()),
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(TallyErrors::InvalidBallot(
                InvalidBallotReason::DuplicateCandidate(name.clone()),
            ));
        }
    }
    Ok(Ballot {
        ranking: raw.to_vec(),
    })
}
