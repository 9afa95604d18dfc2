//! Moveset parsing and derived move features.

use super::ClubError;

/// Parses the raw moveset field. The source data writes movesets as a
/// Python-style list with single quotes (`['e4', 'e5', ...]`), so quotes are
/// normalized before JSON parsing. `eval`-style interpretation is
/// deliberately avoided.
pub fn parse_moveset(raw: &str) -> Result<Vec<String>, ClubError> {
    let normalized = raw.trim().replace('\'', "\"");
    serde_json::from_str(&normalized).map_err(|err| ClubError::InvalidMoveset(err.to_string()))
}

/// Number of checking moves (a `+` suffix in algebraic notation).
pub fn count_checks(moves: &[String]) -> i64 {
    moves.iter().filter(|m| m.contains('+')).count() as i64
}

/// All three-move windows of the moveset, each joined with commas
/// (e.g. "d4,d5,c4").
pub fn three_move_sequences(moves: &[String]) -> Vec<String> {
    moves.windows(3).map(|window| window.join(",")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn moves(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn parses_single_quoted_list() {
        assert_eq!(
            parse_moveset("['d4', 'd5', 'c4']").unwrap(),
            moves(&["d4", "d5", "c4"])
        );
    }

    #[test]
    fn parses_plain_json_list() {
        assert_eq!(parse_moveset(r#"["e4","e5"]"#).unwrap(), moves(&["e4", "e5"]));
    }

    #[rstest]
    #[case("not a list")]
    #[case("['unterminated'")]
    fn rejects_malformed_movesets(#[case] raw: &str) {
        assert!(matches!(
            parse_moveset(raw),
            Err(ClubError::InvalidMoveset(_))
        ));
    }

    #[test]
    fn counts_checking_moves() {
        assert_eq!(count_checks(&moves(&["e4", "Qh5+", "Ke7", "Qxe5+"])), 2);
        assert_eq!(count_checks(&moves(&["e4", "e5"])), 0);
    }

    #[rstest]
    #[case(&["d4", "d5", "c4", "e6"], &["d4,d5,c4", "d5,c4,e6"])]
    #[case(&["e4", "e5", "Nf3"], &["e4,e5,Nf3"])]
    #[case(&["e4", "e5"], &[])]
    fn derives_three_move_windows(#[case] input: &[&str], #[case] expected: &[&str]) {
        assert_eq!(three_move_sequences(&moves(input)), moves(expected));
    }
}
