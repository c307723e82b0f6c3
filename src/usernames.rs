/// Takes the first comma-delimited field of every line, trimmed. Lines that
/// end up empty are dropped; order and duplicates are kept.
pub fn parse_usernames(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

/// Short preview of a loaded list, e.g. `a, b, c, d, e...`.
pub fn preview(usernames: &[String]) -> String {
    let head = usernames.iter().take(5).map(String::as_str).collect::<Vec<_>>().join(", ");
    if usernames.len() > 5 {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_field_and_drops_blanks() {
        let text = "alice,extra,columns\r\n\r\n  bob  \ncarol, 12\n   \n,orphan\nalice\n";
        assert_eq!(parse_usernames(text), vec!["alice", "bob", "carol", "alice"]);
    }

    #[test]
    fn leading_byte_order_mark_is_dropped() {
        assert_eq!(parse_usernames("\u{feff}alice,1\r\nbob\r\n"), vec!["alice", "bob"]);
    }

    #[test]
    fn empty_input_gives_empty_list() {
        assert!(parse_usernames("").is_empty());
        assert!(parse_usernames("\n\n \r\n").is_empty());
    }

    #[test]
    fn preview_truncates_after_five() {
        let names: Vec<String> = (1..=7).map(|i| format!("u{i}")).collect();
        assert_eq!(preview(&names), "u1, u2, u3, u4, u5...");
        assert_eq!(preview(&names[..2]), "u1, u2");
    }
}
