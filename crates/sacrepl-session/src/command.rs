//! `%`-prefixed session commands.

/// Usage text shown by `%help`.
pub const HELP_TEXT: &str = "\
Currently the following commands are available:
    %print      -- print the current program including
                   imports, functions and statements in the main.
    %flags      -- print flags that are used when running sac2c.
    %setflags <flags>
                -- reset sac2c flags to <flags>
";

/// Commands handled by the session itself, without a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Help,
    Print,
    Flags,
    SetFlags,
}

impl SessionCommand {
    pub fn magic(self) -> &'static str {
        match self {
            SessionCommand::Help => "%help",
            SessionCommand::Print => "%print",
            SessionCommand::Flags => "%flags",
            SessionCommand::SetFlags => "%setflags",
        }
    }

    /// If the first line of `input` starts with this command, return the
    /// rest of that line as its argument string.
    pub fn strip(self, input: &str) -> Option<&str> {
        let line = input.trim_start().lines().next()?;
        line.strip_prefix(self.magic()).map(str::trim)
    }
}

/// Split a flag string the way a POSIX shell would.
///
/// Returns `None` on unbalanced quotes.
pub fn split_flags(args: &str) -> Option<Vec<String>> {
    shlex::split(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_returns_arguments() {
        assert_eq!(SessionCommand::SetFlags.strip("%setflags -O1 -v2"), Some("-O1 -v2"));
        assert_eq!(SessionCommand::Help.strip("  %help\n"), Some(""));
        assert_eq!(SessionCommand::Print.strip("%flags"), None);
    }

    #[test]
    fn test_strip_is_case_sensitive() {
        assert_eq!(SessionCommand::Help.strip("%HELP"), None);
    }

    #[test]
    fn test_strip_only_reads_first_line() {
        assert_eq!(
            SessionCommand::SetFlags.strip("%setflags -O3\n-v4"),
            Some("-O3")
        );
        assert_eq!(SessionCommand::Flags.strip("x = 1;\n%flags"), None);
    }

    #[test]
    fn test_split_flags_shell_style() {
        assert_eq!(
            split_flags("-O1 -D 'NAME=a b' \"-v2\""),
            Some(vec![
                "-O1".to_string(),
                "-D".to_string(),
                "NAME=a b".to_string(),
                "-v2".to_string()
            ])
        );
        assert_eq!(split_flags(""), Some(vec![]));
        assert_eq!(split_flags("'unterminated"), None);
    }
}
