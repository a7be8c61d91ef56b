// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-Run Hook: a command template tokenized once at configuration
//! time, with `$name` positional substitutions applied per run.
//!
//! Unbraced `$name` form with a hand-rolled scanner, avoiding a `regex`
//! dependency for one substitution site.

use std::collections::HashMap;

use tracing::warn;

/// Split a command template into argv the way a shell would for a simple,
/// unpiped command line: whitespace separates tokens, single and double
/// quotes group one token and are stripped, no expansion beyond that.
fn shell_split(template: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }
    if in_token || quote.is_some() {
        tokens.push(current);
    }
    tokens
}

/// Replace every `$name` occurrence in `token` with its value from `vars`.
/// An unrecognized `$name` is left in place rather than silently dropped,
/// so a misconfigured hook fails loudly instead of swallowing an argument.
fn substitute(token: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        let mut name = String::new();
        while let Some(&next) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                name.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            out.push('$');
        } else if let Some(value) = vars.get(&name) {
            out.push_str(value);
        } else {
            out.push('$');
            out.push_str(&name);
        }
    }
    out
}

/// A configured post-run hook: a tokenized command template, substituted
/// and executed once per terminal run.
pub struct PostRunHook {
    argv_template: Vec<String>,
}

impl PostRunHook {
    /// Tokenize `command_template` once, at configuration time.
    pub fn new(command_template: &str) -> Option<Self> {
        let argv_template = shell_split(command_template);
        if argv_template.is_empty() {
            return None;
        }
        Some(Self { argv_template })
    }

    /// Substitute `vars` into the tokenized template and run it in the
    /// server's own process environment. Failures are logged, never
    /// propagated: a broken hook must not affect the run's recorded status.
    pub async fn run(&self, vars: &HashMap<String, String>) {
        let argv: Vec<String> = self.argv_template.iter().map(|t| substitute(t, vars)).collect();
        let Some((program, args)) = argv.split_first() else { return };

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        for (name, value) in vars {
            cmd.env(format!("ACTION_SERVER_HOOK_{}", name.to_uppercase()), value);
        }

        match cmd.status().await {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, program, "post-run hook exited non-zero"),
            Err(e) => warn!(error = %e, program, "post-run hook failed to start"),
        }
    }
}

#[cfg(test)]
#[path = "hook_tests.rs"]
mod tests;
