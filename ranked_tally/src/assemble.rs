use log::info;

use crate::{
    tabulate_borda, tabulate_irv, Ballot, BordaResult, Poll, PollResults, RoundRow,
    TabulationResult, TallyErrors,
};

/// Runs both tabulations over the same snapshot of ballots.
///
/// The Borda count is informational: it never changes the instant-runoff winner.
pub fn tabulate(poll: &Poll, ballots: &[Ballot]) -> Result<PollResults, TallyErrors> {
    let irv = tabulate_irv(poll, ballots)?;
    let borda = tabulate_borda(poll, ballots)?;
    info!(
        "tabulate: instant-runoff winner: {}, Borda leaders: {:?}",
        irv.winner,
        borda.leaders()
    );
    Ok(PollResults { irv, borda })
}

impl TabulationResult {
    /// Flattens the round history into one row per active candidate and per round.
    ///
    /// This is the form in which a result is written out once it has been computed.
    pub fn round_rows(&self) -> Vec<RoundRow> {
        let mut rows: Vec<RoundRow> = Vec::new();
        for r in self.rounds.iter() {
            for (name, count) in r.tally.iter() {
                let borda_score = r.borda_scores.as_ref().and_then(|scores| {
                    scores
                        .iter()
                        .find(|(n, _)| n == name)
                        .map(|(_, score)| *score)
                });
                rows.push(RoundRow {
                    round_number: r.round,
                    candidate: name.clone(),
                    vote_count: *count,
                    is_eliminated: r.eliminated.contains(name),
                    borda_score,
                });
            }
        }
        rows
    }
}

impl BordaResult {
    pub fn score(&self, candidate: &str) -> Option<u64> {
        self.scores
            .iter()
            .find(|(n, _)| n == candidate)
            .map(|(_, score)| *score)
    }

    /// All the candidates sharing the highest score, in poll order.
    pub fn leaders(&self) -> Vec<String> {
        let max_score = self.scores.iter().map(|(_, score)| *score).max();
        self.scores
            .iter()
            .filter(|(_, score)| Some(*score) == max_score)
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// The candidates by decreasing score. Equal scores keep the poll order.
    pub fn ranking(&self) -> Vec<(String, u64)> {
        let mut res = self.scores.clone();
        res.sort_by(|(_, s1), (_, s2)| s2.cmp(s1));
        res
    }
}
