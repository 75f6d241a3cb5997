use log::debug;

pub use crate::config::*;
use crate::{check_candidate_names, normalize_ballot, tabulate, tabulate_borda, tabulate_irv};

/// A builder for collecting the ballots of a poll.
///
/// Every ballot is validated when it is added, and accepted ballots can never be changed
/// or removed afterwards.
///
/// ```
/// pub use ranked_tally::builder::Builder;
/// # use ranked_tally::TallyErrors;
///
/// let mut builder = Builder::new()
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_ballot(&["Bob".to_string(), "Anna".to_string()])?;
/// builder.add_ballot(&[])?;
/// assert!(builder.add_ballot(&["Clara".to_string()]).is_err());
/// assert_eq!(builder.ballots().len(), 2);
///
/// # Ok::<(), TallyErrors>(())
/// ```
pub struct Builder {
    _poll: Option<Poll>,
    _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _poll: None,
            _ballots: Vec::new(),
        }
    }

    /// Sets the candidates of the poll. The ballots added so far are discarded.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, TallyErrors> {
        check_candidate_names(cands)?;
        Ok(Builder {
            _poll: Some(Poll::new(cands)),
            _ballots: Vec::new(),
        })
    }

    /// Adds a ballot: the choices of the voter, most preferred first.
    ///
    /// An empty list of choices is an abstention.
    pub fn add_ballot(&mut self, choices: &[String]) -> Result<(), TallyErrors> {
        let poll = self._poll.as_ref().ok_or(TallyErrors::EmptyCandidateSet)?;
        let ballot = normalize_ballot(choices, poll)?;
        debug!("add_ballot: accepted {:?}", ballot);
        self._ballots.push(ballot);
        Ok(())
    }

    pub fn poll(&self) -> Option<&Poll> {
        self._poll.as_ref()
    }

    /// The ballots accepted so far.
    pub fn ballots(&self) -> &[Ballot] {
        &self._ballots
    }

    pub fn tabulate_irv(&self) -> Result<TabulationResult, TallyErrors> {
        tabulate_irv(self.checked_poll()?, &self._ballots)
    }

    pub fn tabulate_borda(&self) -> Result<BordaResult, TallyErrors> {
        tabulate_borda(self.checked_poll()?, &self._ballots)
    }

    pub fn tabulate(&self) -> Result<PollResults, TallyErrors> {
        tabulate(self.checked_poll()?, &self._ballots)
    }

    fn checked_poll(&self) -> Result<&Poll, TallyErrors> {
        self._poll.as_ref().ok_or(TallyErrors::EmptyCandidateSet)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(names: &[&str]) -> Vec<String> {
        names.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn no_candidates() {
        let mut builder = Builder::new();
        assert_eq!(
            builder.add_ballot(&s(&["A"])),
            Err(TallyErrors::EmptyCandidateSet)
        );
        assert!(builder.tabulate_irv().is_err());
        assert!(Builder::new().candidates(&[]).is_err());
    }

    #[test]
    fn duplicate_candidates() {
        assert!(matches!(
            Builder::new().candidates(&s(&["A", "B", "A"])),
            Err(TallyErrors::DuplicateCandidate(name)) if name == "A"
        ));
    }

    #[test]
    fn tie_label_is_refused() {
        assert_eq!(
            Builder::new().candidates(&s(&["A", "tie"])).err(),
            Some(TallyErrors::ReservedCandidateName("tie".to_string()))
        );
    }

    #[test]
    fn rejected_ballots_are_not_kept() {
        let mut builder = Builder::new().candidates(&s(&["A", "B"])).unwrap();
        builder.add_ballot(&s(&["A"])).unwrap();
        assert!(builder.add_ballot(&s(&["A", "A"])).is_err());
        assert!(builder.add_ballot(&s(&["C"])).is_err());
        assert_eq!(builder.ballots().len(), 1);
        let res = builder.tabulate().unwrap();
        assert_eq!(res.irv.winner, Winner::Candidate("A".to_string()));
        assert_eq!(res.borda.ballots_counted, 1);
    }
}
