//! Counsel voting
//!
//! Each analyst casts one vote for a uniformly random *other* analyst. The
//! outcome is presentation only: nothing downstream uses the winner to pick
//! or discard an analysis.
//!
//! # Tie-breaking
//!
//! [`VoteTally`] lists candidates in the order they first receive a vote
//! while walking the ballots in cast order. [`VoteTally::winner`] returns the
//! first candidate in that order holding the maximal count. An empty tally
//! has no winner.

use crate::types::{timestamp_label, Vote};
use rand::Rng;

/// Cast one ballot per analyst, never for themselves.
///
/// Exclusion is positional, so analysts sharing a display name still cannot
/// vote for their own slot. A lone analyst has no eligible candidate and
/// abstains.
pub fn cast_votes<R: Rng + ?Sized>(agent_names: &[String], rng: &mut R) -> Vec<Vote> {
    if agent_names.len() < 2 {
        return Vec::new();
    }

    agent_names
        .iter()
        .enumerate()
        .map(|(voter_idx, voter)| {
            // Draw from the n-1 other slots and skip over the voter's own.
            let mut pick = rng.random_range(0..agent_names.len() - 1);
            if pick >= voter_idx {
                pick += 1;
            }
            Vote {
                voter: voter.clone(),
                voted_for: agent_names[pick].clone(),
                timestamp: timestamp_label(),
            }
        })
        .collect()
}

/// Vote counts per candidate, derived from a ballot list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTally {
    entries: Vec<(String, usize)>,
}

impl VoteTally {
    pub fn from_votes(votes: &[Vote]) -> Self {
        let mut entries: Vec<(String, usize)> = Vec::new();
        for vote in votes {
            match entries.iter_mut().find(|(name, _)| *name == vote.voted_for) {
                Some((_, count)) => *count += 1,
                None => entries.push((vote.voted_for.clone(), 1)),
            }
        }
        Self { entries }
    }

    /// Votes received by `name` (zero when never voted for).
    pub fn count(&self, name: &str) -> usize {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    /// Sum of all counts; equals the number of ballots.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// First candidate (in first-vote order) with the highest count.
    pub fn winner(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, count) in &self.entries {
            if best.map_or(true, |(_, top)| *count > top) {
                best = Some((name.as_str(), *count));
            }
        }
        best
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Human-readable voting outcome listing every analyst.
pub fn voting_summary(agent_names: &[String], tally: &VoteTally) -> String {
    let mut summary = String::from("**COUNSEL VOTING RESULTS**\n\n");
    for agent in agent_names {
        let count = tally.count(agent);
        summary.push_str(&format!("{}: {} ({} votes)\n", agent, "●".repeat(count), count));
    }

    match tally.winner() {
        Some((winner, count)) => {
            summary.push_str(&format!("\n**Winner: {}** with {} votes!", winner, count));
        }
        None => summary.push_str("\nNo votes were cast, so there is no winner."),
    }
    summary
}
