//! Line-oriented operator prompts.

use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::error::LaunchError;

/// Prompt/answer channel to the operator.
///
/// Generic over its streams so the interactive steps can be driven from a
/// byte buffer in tests.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    /// Console bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print one line.
    pub fn say(&mut self, line: impl Display) -> Result<(), LaunchError> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    /// Ask a question and return the trimmed answer.
    ///
    /// End of input counts as the operator aborting. Bytes that are not valid
    /// UTF-8 are replaced, so the caller's validation rejects the answer and
    /// asks again.
    pub fn ask(&mut self, prompt: &str) -> Result<String, LaunchError> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            writeln!(self.output)?;
            return Err(LaunchError::Aborted);
        }
        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }

    /// Ask until `parse` accepts the answer.
    ///
    /// A rejected answer prints the parser's message and repeats the prompt.
    pub fn ask_until<T>(
        &mut self,
        prompt: &str,
        mut parse: impl FnMut(&str) -> Result<T, String>,
    ) -> Result<T, LaunchError> {
        loop {
            let answer = self.ask(prompt)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(message) => self.say(message)?,
            }
        }
    }

    /// Yes/no question where an empty answer means no.
    pub fn confirm(&mut self, question: &str) -> Result<bool, LaunchError> {
        self.ask_until(&format!("{} [y/N]: ", question), parse_yes_no)
    }

    /// Consume the console and return its output stream.
    #[cfg(test)]
    pub(crate) fn into_output(self) -> W {
        self.output
    }
}

fn parse_yes_no(answer: &str) -> Result<bool, String> {
    match answer.to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(true),
        "" | "n" | "no" => Ok(false),
        _ => Err("Please answer y or n.".to_string()),
    }
}

#[cfg(test)]
pub(crate) fn scripted(input: impl AsRef<[u8]>) -> Console<io::Cursor<Vec<u8>>, Vec<u8>> {
    Console::new(io::Cursor::new(input.as_ref().to_vec()), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_trims() {
        let mut console = scripted("  hello \n");
        assert_eq!(console.ask("> ").unwrap(), "hello");
    }

    #[test]
    fn test_eof_aborts() {
        let mut console = scripted("");
        assert!(matches!(console.ask("> "), Err(LaunchError::Aborted)));
    }

    #[test]
    fn test_ask_until_repeats() {
        let mut console = scripted("x\n-3\n7\n");
        let value = console
            .ask_until("n: ", |s| s.parse::<u32>().map_err(|_| "not a number".to_string()))
            .unwrap();
        assert_eq!(value, 7);

        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output.matches("n: ").count(), 3);
        assert_eq!(output.matches("not a number").count(), 2);
    }

    #[test]
    fn test_invalid_utf8_is_reprompted() {
        let mut console = scripted(b"\xff\xfe\n\xc3\n4\n");
        let value = console
            .ask_until("n: ", |s| s.parse::<u32>().map_err(|_| "not a number".to_string()))
            .unwrap();
        assert_eq!(value, 4);

        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output.matches("not a number").count(), 2);
    }

    #[test]
    fn test_confirm() {
        let mut console = scripted("Y\n\nmaybe\nno\n");
        assert!(console.confirm("Go?").unwrap());
        assert!(!console.confirm("Go?").unwrap());
        assert!(!console.confirm("Go?").unwrap());

        let output = String::from_utf8(console.into_output()).unwrap();
        assert!(output.contains("Please answer y or n."));
    }
}
