use sorted_files_core::listing::SortKey;
use std::path::PathBuf;

/// A line typed on stdin while watching
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Sort(SortKey),
    Root(PathBuf),
    Refresh,
    Status,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "root" | "cd" => {
                if rest.is_empty() {
                    Err("Usage: root <DIR>".to_string())
                } else {
                    Ok(Command::Root(PathBuf::from(rest)))
                }
            }
            "refresh" => Ok(Command::Refresh),
            "status" => Ok(Command::Status),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            _ => word.parse::<SortKey>().map(Command::Sort).map_err(|_| {
                format!(
                    "Unknown command: '{line}'. Try modified, created, name, size, root <DIR>, refresh, status or quit"
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("name".parse(), Ok(Command::Sort(SortKey::Name)));
        assert_eq!("  Size ".parse(), Ok(Command::Sort(SortKey::Size)));
        assert_eq!("mtime".parse(), Ok(Command::Sort(SortKey::ModifiedTime)));
        assert_eq!(
            "root /tmp/some dir".parse(),
            Ok(Command::Root(PathBuf::from("/tmp/some dir")))
        );
        assert_eq!("refresh".parse(), Ok(Command::Refresh));
        assert_eq!("status".parse(), Ok(Command::Status));
        assert_eq!("quit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!("root".parse::<Command>().is_err());
        let err = "sideways".parse::<Command>().unwrap_err();
        assert!(err.contains("Unknown command"));
    }
}
