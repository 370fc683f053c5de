/// Expand `${VAR}`, `$VAR` and `%VAR%` references in one left-to-right pass.
///
/// Unset variables are left exactly as written. An unterminated `${` or `%`
/// is copied through unchanged. Expanded values are not re-scanned.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['$', '%']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let (reference, name) = if let Some(braced) = tail.strip_prefix("${") {
            match braced.find('}') {
                Some(end) => (&tail[..end + 3], &braced[..end]),
                None => (&tail[..2], ""),
            }
        } else if let Some(bare) = tail.strip_prefix('$') {
            let len = bare
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(bare.len());
            (&tail[..len + 1], &bare[..len])
        } else {
            let inner = &tail[1..];
            match inner.find('%') {
                Some(end) if end > 0 => (&tail[..end + 2], &inner[..end]),
                _ => (&tail[..1], ""),
            }
        };

        match (!name.is_empty()).then(|| std::env::var(name).ok()).flatten() {
            Some(value) => out.push_str(&value),
            None => out.push_str(reference),
        }
        rest = &rest[pos + reference.len()..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_all_three_styles() {
        env::set_var("EXPAND_TEST_A", "alpha");
        env::set_var("EXPAND_TEST_B", "beta");

        assert_eq!(expand_env_vars("$EXPAND_TEST_A/x"), "alpha/x");
        assert_eq!(expand_env_vars("${EXPAND_TEST_A}suffix"), "alphasuffix");
        assert_eq!(expand_env_vars("%EXPAND_TEST_B%\\dir"), "beta\\dir");
        assert_eq!(
            expand_env_vars("$EXPAND_TEST_A-${EXPAND_TEST_B}-%EXPAND_TEST_A%"),
            "alpha-beta-alpha"
        );

        env::remove_var("EXPAND_TEST_A");
        env::remove_var("EXPAND_TEST_B");
    }

    #[test]
    fn test_unset_variables_are_kept() {
        assert_eq!(expand_env_vars("$EXPAND_TEST_UNSET/a"), "$EXPAND_TEST_UNSET/a");
        assert_eq!(expand_env_vars("${EXPAND_TEST_UNSET}"), "${EXPAND_TEST_UNSET}");
        assert_eq!(expand_env_vars("%EXPAND_TEST_UNSET%"), "%EXPAND_TEST_UNSET%");
    }

    #[test]
    fn test_malformed_references() {
        assert_eq!(expand_env_vars("$"), "$");
        assert_eq!(expand_env_vars("${open"), "${open");
        assert_eq!(expand_env_vars("100%"), "100%");
        assert_eq!(expand_env_vars("%%"), "%%");
        assert_eq!(expand_env_vars("$$"), "$$");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        env::set_var("EXPAND_TEST_LOOP", "$EXPAND_TEST_LOOP");
        assert_eq!(expand_env_vars("$EXPAND_TEST_LOOP"), "$EXPAND_TEST_LOOP");
        env::remove_var("EXPAND_TEST_LOOP");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(expand_env_vars("/storage/emulated/0"), "/storage/emulated/0");
        assert_eq!(expand_env_vars(""), "");
    }
}
