/// A command line split into its command name and its raw arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub name: &'a str,
    /// Everything after the whitespace character that ends the name, untouched. `None` if
    /// nothing but whitespace follows the name.
    pub args: Option<&'a str>,
}

/// Splits off the first whitespace-delimited token of `line` as the command name.
///
/// Returns `None` for an empty or all-whitespace line.
pub fn tokenize(line: &str) -> Option<CommandLine<'_>> {
    let start = line.find(|c: char| !c.is_whitespace())?;
    let rest = &line[start..];
    let (name, after) = match rest.find(char::is_whitespace) {
        Some(end) => {
            let sep = rest[end..].chars().next().map_or(0, char::len_utf8);
            (&rest[..end], &rest[end + sep..])
        }
        None => (rest, ""),
    };
    let args = if after.trim().is_empty() {
        None
    } else {
        Some(after)
    };
    Some(CommandLine { name, args })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Option<(&str, Option<&str>)> {
        tokenize(line).map(|c| (c.name, c.args))
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(split(""), None);
        assert_eq!(split("   "), None);
        assert_eq!(split(" \t "), None);
    }

    #[test]
    fn test_name_only() {
        assert_eq!(split("c"), Some(("c", None)));
        assert_eq!(split("  si"), Some(("si", None)));
        assert_eq!(split("q   "), Some(("q", None)));
    }

    #[test]
    fn test_args_are_raw() {
        assert_eq!(split("p 1 + 2"), Some(("p", Some("1 + 2"))));
        assert_eq!(split("p  1+2 "), Some(("p", Some(" 1+2 "))));
        assert_eq!(split("  x 10 0x100"), Some(("x", Some("10 0x100"))));
        assert_eq!(split("x\t3\t100"), Some(("x", Some("3\t100"))));
    }

    #[test]
    fn test_unicode_separator() {
        assert_eq!(split("p\u{3000}1"), Some(("p", Some("1"))));
    }
}
