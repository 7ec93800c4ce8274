use secrecy::{ExposeSecret, SecretString};

/// Display form of a secret key: its mode prefix and last four characters.
pub fn mask_secret(secret: &SecretString) -> String {
    let raw = secret.expose_secret();
    let prefix = ["sk_test_", "rk_test_", "sk_live_", "rk_live_"]
        .into_iter()
        .find(|prefix| raw.starts_with(prefix))
        .unwrap_or("");

    let tail: String = raw.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    if raw.chars().count() <= prefix.len() + 4 {
        return format!("{prefix}****");
    }
    format!("{prefix}****{tail}")
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::mask_secret;

    #[test]
    fn masks_all_but_prefix_and_suffix() {
        let secret = SecretString::from("sk_test_51abcdefghijklmnWXYZ".to_string());

        assert_eq!(mask_secret(&secret), "sk_test_****WXYZ");
    }

    #[test]
    fn short_secrets_reveal_nothing_after_prefix() {
        let secret = SecretString::from("sk_test_abc".to_string());

        assert_eq!(mask_secret(&secret), "sk_test_****");
    }
}
