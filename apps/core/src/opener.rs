use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("refusing to open non-http url '{0}'")]
    UnsupportedUrl(String),
    #[error("failed to start url opener: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("url opener exited with status {0}")]
    Status(std::process::ExitStatus),
}

/// External viewer used to show a package page.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<(), OpenError>;
}

/// Hands the URL to the desktop's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<(), OpenError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(OpenError::UnsupportedUrl(url.to_string()));
        }

        let status = opener_command(url).status()?;
        if !status.success() {
            return Err(OpenError::Status(status));
        }
        Ok(())
    }
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg("start").arg("").arg(url);
    command
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}
