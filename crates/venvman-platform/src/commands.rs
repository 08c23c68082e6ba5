use std::process::Stdio;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Configure a command to run headless with its output captured.
pub trait CapturedCommand {
    fn captured(&mut self) -> &mut Self;
}

impl CapturedCommand for tokio::process::Command {
    fn captured(&mut self) -> &mut Self {
        self.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("NO_COLOR", "1")
            .kill_on_drop(true);

        #[cfg(windows)]
        self.creation_flags(CREATE_NO_WINDOW);

        self
    }
}

#[cfg(test)]
mod tests {
    use super::CapturedCommand;

    #[test]
    fn captured_is_chainable() {
        let mut cmd = tokio::process::Command::new("echo");
        let before = &mut cmd as *mut tokio::process::Command;
        let after = cmd.captured() as *mut tokio::process::Command;
        assert_eq!(before, after);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_collects_stdout_and_stderr() {
        let output = tokio::process::Command::new("sh")
            .args(["-c", "echo out; echo err 1>&2"])
            .captured()
            .output()
            .await
            .expect("sh should run");

        assert_eq!(String::from_utf8_lossy(&output.stdout), "out\n");
        assert_eq!(String::from_utf8_lossy(&output.stderr), "err\n");
    }
}
