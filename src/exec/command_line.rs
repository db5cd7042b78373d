// src/exec/command_line.rs

//! Program + argument description of a process to launch.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{ProcrunError, Result};
use crate::resolve::{Context, ExprResolver, Resolution};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"));

/// An immutable-at-call-time command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Split a command string on whitespace, honouring single and double
    /// quotes. Quotes are removed; there is no escape syntax.
    pub fn parse(line: &str) -> Result<Self> {
        let mut tokens = tokenize(line)?.into_iter();
        let program = tokens.next().ok_or_else(|| {
            ProcrunError::ConfigError("command line must not be empty".to_string())
        })?;
        Ok(Self {
            program,
            args: tokens.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Replace every `${expr}` in the program and arguments with the value the
    /// resolver produces for `expr`.
    ///
    /// An absent result substitutes the empty string. A declined expression is
    /// an error, since leaving the placeholder in place would silently run
    /// the wrong command.
    pub fn expand(&self, resolver: &dyn ExprResolver, ctx: &dyn Context) -> Result<Self> {
        Ok(Self {
            program: expand_str(&self.program, resolver, ctx)?,
            args: self
                .args
                .iter()
                .map(|a| expand_str(a, resolver, ctx))
                .collect::<Result<Vec<_>>>()?,
        })
    }
}

fn expand_str(s: &str, resolver: &dyn ExprResolver, ctx: &dyn Context) -> Result<String> {
    let mut err = None;

    let out = PLACEHOLDER.replace_all(s, |caps: &Captures<'_>| {
        if err.is_some() {
            return String::new();
        }
        match resolver.evaluate(ctx, &caps[1]) {
            Ok(Resolution::Resolved(v)) => v.to_string(),
            Ok(Resolution::Absent) => String::new(),
            Ok(Resolution::Declined) => {
                err = Some(ProcrunError::Expression(format!(
                    "no resolver handled placeholder '{}'",
                    &caps[0]
                )));
                String::new()
            }
            Err(e) => {
                err = Some(e);
                String::new()
            }
        }
    });

    match err {
        Some(e) => Err(e),
        None => Ok(out.into_owned()),
    }
}

fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(ProcrunError::ConfigError(format!(
            "unbalanced quote {q} in command line: {line}"
        )));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.chars().any(char::is_whitespace) {
        return arg.to_string();
    }
    if arg.contains('"') {
        format!("'{arg}'")
    } else {
        format!("\"{arg}\"")
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_arg(&self.program))?;
        for a in &self.args {
            write!(f, " {}", quote_arg(a))?;
        }
        Ok(())
    }
}
