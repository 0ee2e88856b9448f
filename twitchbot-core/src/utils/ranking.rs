// twitchbot-core/src/utils/ranking.rs

/// One place on a leaderboard. Everyone tied on `count` shares `rank`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier<'a> {
    pub rank: usize,
    pub count: u64,
    pub names: Vec<&'a str>,
}

/// Groups `counts` (already sorted, highest first) into tiers of equal
/// count. Ranks are dense: two users tied for first are followed by second.
pub fn tied_rank<S: AsRef<str>>(counts: &[(S, u64)]) -> Vec<Tier<'_>> {
    let mut tiers: Vec<Tier<'_>> = Vec::new();
    for (name, count) in counts {
        match tiers.last_mut() {
            Some(tier) if tier.count == *count => tier.names.push(name.as_ref()),
            _ => tiers.push(Tier {
                rank: tiers.len() + 1,
                count: *count,
                names: vec![name.as_ref()],
            }),
        }
    }
    tiers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_share_a_rank() {
        let counts = [("a", 500), ("b", 300), ("c", 300), ("d", 51)];
        let tiers = tied_rank(&counts);
        assert_eq!(
            tiers,
            vec![
                Tier { rank: 1, count: 500, names: vec!["a"] },
                Tier { rank: 2, count: 300, names: vec!["b", "c"] },
                Tier { rank: 3, count: 51, names: vec!["d"] },
            ]
        );
    }

    #[test]
    fn empty_board() {
        let counts: [(String, u64); 0] = [];
        assert!(tied_rank(&counts).is_empty());
    }
}
