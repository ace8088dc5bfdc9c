use std::process::{Command, ExitStatus};

/// Runs a command and waits for it. STDOUT and STDERR aren't touched. The caller decides what a
/// non-zero status means.
pub fn run_cmd(cmd: &mut Command) -> std::io::Result<ExitStatus> {
    info!("- Running {}", describe_cmd(cmd));
    cmd.status()
}

/// Renders a command roughly the way it'd be typed into a shell.
pub fn describe_cmd(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    for arg in cmd.get_args() {
        let arg = arg.to_string_lossy();
        if arg.contains(' ') || arg.contains('\'') {
            parts.push(format!("\"{}\"", arg));
        } else {
            parts.push(arg.into_owned());
        }
    }
    parts.join(" ")
}
