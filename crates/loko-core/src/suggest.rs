//! "Did you mean" helpers for unknown names

/// Maximum Levenshtein distance for a candidate to be suggested
pub const MAX_SUGGESTION_DISTANCE: usize = 3;

/// Find the closest candidate to `input`, if any is close enough
pub fn closest_match<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = strsim::levenshtein(input, candidate);
            (distance > 0 && distance <= MAX_SUGGESTION_DISTANCE).then_some((distance, candidate))
        })
        .min_by_key(|(distance, candidate)| (*distance, *candidate))
        .map(|(_, candidate)| candidate)
}

/// Format a " Did you mean ...?" suffix, or an empty string
pub fn did_you_mean<'a, I>(input: &str, candidates: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match closest_match(input, candidates) {
        Some(name) => format!(" Did you mean \"{}\"?", name),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_match() {
        let candidates = ["service_type", "ingress_hosts", "enable_monitoring"];
        assert_eq!(closest_match("service_typ", candidates), Some("service_type"));
        assert_eq!(closest_match("ingres_hosts", candidates), Some("ingress_hosts"));
        assert_eq!(closest_match("something_else", candidates), None);
    }

    #[test]
    fn test_exact_match_is_not_a_suggestion() {
        assert_eq!(closest_match("contour", ["contour"]), None);
    }

    #[test]
    fn test_did_you_mean() {
        assert_eq!(
            did_you_mean("contuor", ["contour", "cluster-autoscaler"]),
            " Did you mean \"contour\"?"
        );
        assert_eq!(did_you_mean("xyz", ["contour"]), "");
    }
}
