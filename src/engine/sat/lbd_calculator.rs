use super::Trail;
use crate::basic_types::HashSet;
use crate::engine::variables::Literal;

/// The literal block distance of a clause: the number of distinct decision levels among its
/// assigned literals. Lower values indicate higher-quality learned clauses.
pub(crate) fn calculate_lbd(clause: &[Literal], trail: &Trail) -> u32 {
    let levels: HashSet<usize> = clause
        .iter()
        .filter(|&&literal| trail.is_literal_assigned(literal))
        .map(|&literal| trail.get_literal_assignment_level(literal))
        .collect();

    levels.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lbd_counts_distinct_levels() {
        let mut trail = Trail::default();
        let literals: Vec<Literal> = (0..4).map(|_| Literal::new(trail.grow(), true)).collect();

        trail.enqueue_with_unit_reason(literals[0]);
        trail.increase_decision_level();
        trail.enqueue_search_decision(literals[1]);
        trail.enqueue_search_decision(literals[2]);
        trail.increase_decision_level();
        trail.enqueue_search_decision(literals[3]);

        assert_eq!(calculate_lbd(&literals, &trail), 3);
    }
}
