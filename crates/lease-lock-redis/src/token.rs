//! Fencing token generation.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Generates a token unique to one acquisition.
///
/// Format: `{process_id}_{counter}_{random_hex}`. The counter keeps tokens
/// distinct within a process even if the random part repeats.
pub fn create_token() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    let pid = process::id();

    let mut rng = rand::thread_rng();
    let random: u64 = rng.r#gen();

    format!("{}_{}_{:016x}", pid, counter, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<String> = (0..1000).map(|_| create_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }

    #[test]
    fn test_token_format() {
        let token = create_token();
        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], process::id().to_string());
        assert_eq!(parts[2].len(), 16);
    }
}
