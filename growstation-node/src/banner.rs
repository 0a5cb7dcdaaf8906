//! Fixed-width lines for the build-time error box

/// Fit `line` into `width` columns, marking a cut with `...`
///
/// Counts characters rather than bytes, so a cut never lands inside a
/// multibyte character.
pub fn fit_line(line: &str, width: usize) -> String {
    if line.chars().count() <= width {
        return line.to_string();
    }
    let kept = line.chars().take(width.saturating_sub(3)).collect::<String>();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_unchanged() {
        assert_eq!(fit_line("port = 80", 62), "port = 80");
    }

    #[test]
    fn test_long_line_cut() {
        let line = "x".repeat(80);
        let fitted = fit_line(&line, 62);
        assert_eq!(fitted.chars().count(), 62);
        assert!(fitted.ends_with("..."));
    }

    #[test]
    fn test_multibyte_cut_on_char_boundary() {
        let line = format!("{}é{}", "a".repeat(58), "b".repeat(10));
        let fitted = fit_line(&line, 62);
        assert_eq!(fitted, format!("{}é...", "a".repeat(58)));
    }
}
