use rand::Rng;

const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz\
                            0123456789";

/// Creates a random lowercase alphanumeric string, e.g. used as
/// suffix for gateway instance names.
pub fn create_random_secret(secret_len: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..secret_len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_random_secret() {
        let len = 30;
        let sec1 = create_random_secret(len);
        let sec2 = create_random_secret(len);
        assert_eq!(sec1.len(), 30);
        assert_eq!(sec2.len(), 30);
        assert_ne!(sec2, sec1);

        let len = 47;
        assert_eq!(len, create_random_secret(len).len())
    }

    #[test]
    fn it_only_uses_lowercase_alphanumerics() {
        let secret = create_random_secret(200);
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }
}
