use anyhow::{Result, bail};

/// Resolve CLI seed tokens into simulation seeds.
///
/// Accepts integers (negatives map to their magnitude) and `0x` hex.
/// Duplicates are dropped, first occurrence wins.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        let seed = if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16).ok()
        } else if let Ok(value) = token.parse::<i64>() {
            Some(value.unsigned_abs())
        } else {
            token.parse::<u64>().ok()
        };

        let Some(seed) = seed else {
            bail!("unrecognized seed `{token}`");
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }

    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|token| (*token).to_string()).collect()
    }

    #[test]
    fn parses_decimal_negative_and_hex() {
        let seeds = resolve_seed_inputs(&tokens(&["1337", "-7", "0xff", "18446744073709551615"]))
            .unwrap();
        assert_eq!(seeds, vec![1337, 7, 255, u64::MAX]);
    }

    #[test]
    fn drops_duplicates_and_blanks() {
        let seeds = resolve_seed_inputs(&tokens(&["4", "", "4", "-4"])).unwrap();
        assert_eq!(seeds, vec![4]);
    }

    #[test]
    fn rejects_words_and_empty_input() {
        assert!(resolve_seed_inputs(&tokens(&["sensei"])).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }
}
