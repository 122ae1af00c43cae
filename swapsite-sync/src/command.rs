//! Running external programs with captured output.

use std::process::{Command, Output, Stdio};

use crate::error::CommandError;

/// Run `cmd` to completion, failing on spawn errors and non-zero exits.
pub(crate) fn run(cmd: &mut Command) -> Result<Output, CommandError> {
    let command = describe(cmd);
    tracing::debug!("running: {command}");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| CommandError::Spawn {
            command: command.clone(),
            source,
        })?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(CommandError::Exit {
            command,
            status: output.status.to_string(),
            stderr: redact_text(String::from_utf8_lossy(&output.stderr).trim()),
        })
    }
}

/// Render a command line for logs and errors, with URL credentials masked.
pub(crate) fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(
        cmd.get_args()
            .map(|arg| redact_userinfo(&arg.to_string_lossy())),
    );
    parts.join(" ")
}

/// Mask credentials in every URL-looking token of free text (tool stderr).
pub(crate) fn redact_text(text: &str) -> String {
    text.split_inclusive(char::is_whitespace)
        .map(redact_userinfo)
        .collect()
}

/// `https://user:pw@host/x` -> `https://***@host/x`
pub(crate) fn redact_userinfo(arg: &str) -> String {
    let Some(scheme_end) = arg.find("://") else {
        return arg.to_string();
    };
    let authority_start = scheme_end + 3;
    let authority_end = arg[authority_start..]
        .find('/')
        .map_or(arg.len(), |i| authority_start + i);
    match arg[authority_start..authority_end].rfind('@') {
        Some(at) => format!(
            "{}***{}",
            &arg[..authority_start],
            &arg[authority_start + at..]
        ),
        None => arg.to_string(),
    }
}
