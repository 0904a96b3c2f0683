use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// Specification for a command to execute.
///
/// Arguments are `Vec<OsString>`, never shell strings, so a file name such as
/// `a; rm -rf ~.tex` reaches the program as one literal argument.
///
/// ```rust
/// use reportgen_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("pdflatex")
///     .args(["-interaction=nonstopmode", "-halt-on-error"])
///     .arg("report.tex")
///     .cwd("/tmp/build");
///
/// assert_eq!(cmd.program, OsString::from("pdflatex"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Build a `std::process::Command` using argv-style APIs only.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }

    /// Program and arguments joined for log output. Never executed.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_chain() {
        let cmd = CommandSpec::new("pdflatex")
            .arg("-interaction=nonstopmode")
            .args(["-halt-on-error", "doc.tex"])
            .cwd("/work")
            .env("TEXINPUTS", ".:");

        assert_eq!(cmd.program, OsString::from("pdflatex"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/work")));
        assert_eq!(
            cmd.env.as_ref().and_then(|e| e.get(&OsString::from("TEXINPUTS"))),
            Some(&OsString::from(".:"))
        );
    }

    #[test]
    fn test_metacharacters_stay_one_argument() {
        let cmd = CommandSpec::new("pdflatex").arg("a; rm -rf ~.tex");
        assert_eq!(cmd.args, vec![OsString::from("a; rm -rf ~.tex")]);

        let command = cmd.to_command();
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_display() {
        let cmd = CommandSpec::new("pdflatex").args(["-halt-on-error", "x.tex"]);
        assert_eq!(cmd.display(), "pdflatex -halt-on-error x.tex");
    }

    #[test]
    fn test_to_command_sets_cwd() {
        let cmd = CommandSpec::new("pdflatex").cwd("/work").to_command();
        assert_eq!(cmd.get_current_dir(), Some(std::path::Path::new("/work")));
    }
}
