//! Reading the debate material.
//!
//! | Source          | Selected by               | Behaviour                          |
//! |-----------------|---------------------------|------------------------------------|
//! | interactive     | `--interactive`           | lines until two empty lines        |
//! | stdin           | `-`                       | read to EOF                        |
//! | file            | existing file path        | read file                          |
//! | literal text    | anything else             | used as-is                         |

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Where the material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialSource {
    Interactive,
    Stdin,
    File(PathBuf),
    Text(String),
}

impl MaterialSource {
    /// Classify the positional argument. `None` when there is no input at all.
    pub fn resolve(input: Option<&str>, interactive: bool) -> Result<Option<Self>> {
        if interactive {
            return Ok(Some(Self::Interactive));
        }
        let Some(input) = input else {
            return Ok(None);
        };
        if input == "-" {
            return Ok(Some(Self::Stdin));
        }
        Ok(Some(file_or_text(input)?))
    }
}

/// An existing file is read; a directory is an error; a path that does not
/// exist is taken as literal text.
fn file_or_text(source: &str) -> Result<MaterialSource> {
    let path = Path::new(source);
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => bail!("cannot read a directory: {source}"),
        Ok(_) => Ok(MaterialSource::File(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok(MaterialSource::Text(source.to_string()))
        }
        Err(e) => Err(e).with_context(|| format!("cannot access {source}")),
    }
}

/// Read the material from `source`. `input`/`out` are used for stdin and the
/// interactive prompts.
pub fn read_material<R: BufRead, W: Write>(
    source: &MaterialSource,
    input: &mut R,
    out: &mut W,
) -> Result<String> {
    match source {
        MaterialSource::Interactive => read_interactive(input, out),
        MaterialSource::Stdin => {
            let mut text = String::new();
            input
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
        MaterialSource::File(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        MaterialSource::Text(text) => Ok(text.clone()),
    }
}

/// Prompted entry: a multi-line question, then an optional context file path
/// (or literal context text).
pub fn read_interactive<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<String> {
    writeln!(out, "Enter your question or instruction (press ENTER twice to finish):")?;
    out.flush()?;
    let question = read_until_blank_lines(input).context("failed to read input")?;

    writeln!(out, "Context file path (optional, ENTER to skip):")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line).context("failed to read input")?;
    let context = line.trim();

    if context.is_empty() {
        writeln!(out, "Question received ({} characters)", question.chars().count())?;
        return Ok(question);
    }

    let mut material = format!("# Question\n\n{question}\n\n---\n\n");
    match file_or_text(context)? {
        MaterialSource::File(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            material.push_str(&format!("# Context file: {context}\n\n{content}"));
        }
        _ => material.push_str(&format!("# Context\n\n{context}")),
    }
    writeln!(out, "Question and context received")?;
    Ok(material)
}

/// Lines up to two consecutive empty lines (or EOF), trailing empties trimmed.
pub fn read_until_blank_lines<R: BufRead>(input: &mut R) -> std::io::Result<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut empty_run = 0;
    let mut buf = String::new();

    loop {
        buf.clear();
        if input.read_line(&mut buf)? == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            empty_run += 1;
            if empty_run >= 2 {
                break;
            }
        } else {
            empty_run = 0;
        }
        lines.push(line.to_string());
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    Ok(lines.join("\n"))
}

/// Reject empty or whitespace-only material.
pub fn validate_material(material: &str) -> Result<()> {
    if material.trim().is_empty() {
        bail!("material is empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn two_blank_lines_end_entry() {
        let mut input = Cursor::new("first\n\nsecond\n\n\nignored\n");
        assert_eq!(read_until_blank_lines(&mut input).unwrap(), "first\n\nsecond");
    }

    #[test]
    fn eof_ends_entry_and_trims_trailing_blanks() {
        let mut input = Cursor::new("only line\n\n");
        assert_eq!(read_until_blank_lines(&mut input).unwrap(), "only line");
    }

    #[test]
    fn crlf_lines_are_handled() {
        let mut input = Cursor::new("a\r\n\r\n\r\n");
        assert_eq!(read_until_blank_lines(&mut input).unwrap(), "a");
    }

    #[test]
    fn interactive_without_context_returns_question() {
        let mut input = Cursor::new("Should we migrate?\n\n\n\n");
        let mut out = Vec::new();
        let material = read_interactive(&mut input, &mut out).unwrap();
        assert_eq!(material, "Should we migrate?");
        assert!(String::from_utf8(out).unwrap().contains("Question received"));
    }

    #[test]
    fn interactive_with_context_file_combines_both() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "budget: 10k").unwrap();
        let script = format!("Go or no go?\n\n\n{}\n", tmp.path().display());
        let mut input = Cursor::new(script);
        let material = read_interactive(&mut input, &mut Vec::new()).unwrap();
        assert!(material.starts_with("# Question\n\nGo or no go?"));
        assert!(material.contains("# Context file:"));
        assert!(material.ends_with("budget: 10k"));
    }

    #[test]
    fn resolve_classifies_sources() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_string_lossy().to_string();

        assert_eq!(MaterialSource::resolve(None, false).unwrap(), None);
        assert_eq!(
            MaterialSource::resolve(Some("x"), true).unwrap(),
            Some(MaterialSource::Interactive)
        );
        assert_eq!(
            MaterialSource::resolve(Some("-"), false).unwrap(),
            Some(MaterialSource::Stdin)
        );
        assert_eq!(
            MaterialSource::resolve(Some(&path), false).unwrap(),
            Some(MaterialSource::File(tmp.path().to_path_buf()))
        );
        assert_eq!(
            MaterialSource::resolve(Some("we should start a startup"), false).unwrap(),
            Some(MaterialSource::Text("we should start a startup".into()))
        );
    }

    #[test]
    fn directory_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_string_lossy().to_string();
        assert!(MaterialSource::resolve(Some(&dir), false).is_err());
    }

    #[test]
    fn stdin_is_read_to_end() {
        let mut input = Cursor::new("piped\nmaterial\n");
        let text = read_material(&MaterialSource::Stdin, &mut input, &mut Vec::new()).unwrap();
        assert_eq!(text, "piped\nmaterial\n");
    }

    #[test]
    fn whitespace_material_rejected() {
        assert!(validate_material(" \n\t ").is_err());
        assert!(validate_material("x").is_ok());
    }
}
