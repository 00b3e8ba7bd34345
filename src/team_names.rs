use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical lookup key for a team name: diacritics stripped, lowercased,
/// punctuation treated as whitespace, whitespace collapsed.
///
/// "Ludogorets  Razgrad", "ludogorets-razgrad" and "Ludogoréts Razgrad" all map
/// to `ludogorets razgrad`.
pub fn normalize_team_name(name: &str) -> String {
    let folded = name
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect::<String>();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::normalize_team_name;

    #[test]
    fn folds_case_accents_and_punctuation() {
        assert_eq!(normalize_team_name("  Ludogorets  "), "ludogorets");
        assert_eq!(normalize_team_name("Atlético Madrid"), "atletico madrid");
        assert_eq!(normalize_team_name("St. Gallen"), "st gallen");
        assert_eq!(
            normalize_team_name("Ludogorets-Razgrad"),
            normalize_team_name("ludogorets razgrad")
        );
        assert_eq!(normalize_team_name("FC København"), "fc københavn");
    }

    #[test]
    fn empty_and_symbol_only_names_collapse_to_empty() {
        assert_eq!(normalize_team_name(""), "");
        assert_eq!(normalize_team_name(" .-/ "), "");
    }
}
