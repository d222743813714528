//! Hamming nearest-neighbor descriptor matching with the ratio test.

use super::features::Descriptor;

/// An accepted descriptor correspondence.
#[derive(Debug, Clone, Copy)]
pub struct MatchPair {
    /// Index into the query (reference) descriptor set.
    pub query: usize,
    /// Index into the train (candidate) descriptor set.
    pub train: usize,
    /// Hamming distance of the accepted match.
    pub distance: u32,
}

/// Brute-force 2-NN matching with Lowe's ratio test.
///
/// A match is kept only when its distance is below `ratio` times the
/// second-best distance, which suppresses ambiguous correspondences on
/// repetitive page furniture (nav bars, list rows).
pub fn match_descriptors(query: &[Descriptor], train: &[Descriptor], ratio: f32) -> Vec<MatchPair> {
    if train.len() < 2 {
        return Vec::new();
    }
    let mut matches = Vec::new();
    for (qi, qd) in query.iter().enumerate() {
        let mut best = u32::MAX;
        let mut best_idx = 0usize;
        let mut second = u32::MAX;
        for (ti, td) in train.iter().enumerate() {
            let d = qd.hamming(td);
            if d < best {
                second = best;
                best = d;
                best_idx = ti;
            } else if d < second {
                second = d;
            }
        }
        if (best as f32) < ratio * (second as f32) {
            matches.push(MatchPair {
                query: qi,
                train: best_idx,
                distance: best,
            });
        }
    }
    matches
}
