use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::process::Command;

/// Run an external program to completion.
///
/// Blocking and all-or-nothing: a spawn failure or non-zero exit becomes
/// [`Error::ExternalTool`] carrying the captured stderr. Returns stdout.
pub fn run_tool<I, S>(program: &str, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let rendered: Vec<String> = args
        .iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect();
    tracing::info!(tool = program, args = %rendered.join(" "), "running external tool");

    let output = Command::new(program)
        .args(&args)
        .output()
        .map_err(|e| Error::ExternalTool {
            tool: program.to_string(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        Err(Error::ExternalTool {
            tool: program.to_string(),
            status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
