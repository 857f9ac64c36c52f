//! Argument helpers shared by the headless binaries.

/// Value of `--name value` or `--name=value`. Blank values count as missing.
pub fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

/// First argument that is neither a flag nor the value of one of `value_flags`.
pub fn positional_arg(args: &[String], value_flags: &[&str]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if value_flags.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn value_can_follow_or_be_joined() {
        let a = args(&["--db", "clubs.db", "--seed=7", "--export", " "]);
        assert_eq!(arg_value(&a, "--db").as_deref(), Some("clubs.db"));
        assert_eq!(arg_value(&a, "--seed").as_deref(), Some("7"));
        assert_eq!(arg_value(&a, "--export"), None);
        assert_eq!(arg_value(&a, "--missing"), None);
    }

    #[test]
    fn positional_skips_flag_values() {
        let a = args(&["-v", "--db", "clubs.db", "import.json"]);
        assert_eq!(positional_arg(&a, &["--db", "--file"]).as_deref(), Some("import.json"));
        assert_eq!(positional_arg(&args(&["--db", "x.db"]), &["--db"]), None);
    }
}
