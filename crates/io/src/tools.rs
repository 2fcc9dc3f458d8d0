// External command-line tools (poppler, tesseract)

use std::path::PathBuf;
use std::process::{Command, Output};

use assetrecon_recon::ReconError;

/// A tool the pipeline shells out to, with the package that provides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tool {
    pub name: &'static str,
    pub package: &'static str,
}

pub const PDFINFO: Tool = Tool { name: "pdfinfo", package: "poppler-utils" };
pub const PDFTOTEXT: Tool = Tool { name: "pdftotext", package: "poppler-utils" };
pub const PDFTOPPM: Tool = Tool { name: "pdftoppm", package: "poppler-utils" };
pub const TESSERACT: Tool = Tool { name: "tesseract", package: "tesseract-ocr" };

impl Tool {
    pub fn locate(&self) -> Result<PathBuf, ReconError> {
        which::which(self.name)
            .map_err(|_| ReconError::Io(format!("{} not installed ({})", self.name, self.package)))
    }

    pub fn is_available(&self) -> bool {
        self.locate().is_ok()
    }

    /// Run with `args`, returning stdout. A non-zero exit is an error carrying
    /// the exit code and trimmed stderr.
    pub fn run(&self, args: &[&str]) -> Result<Vec<u8>, ReconError> {
        let program = self.locate()?;
        log::debug!("{} {}", self.name, args.join(" "));
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ReconError::Io(format!("failed to run {}: {e}", self.name)))?;
        check_status(self.name, output)
    }
}

fn check_status(name: &str, output: Output) -> Result<Vec<u8>, ReconError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReconError::Io(format!(
            "{name} failed (exit {}): {}",
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        )));
    }
    Ok(output.stdout)
}

/// Missing tools, for up-front diagnostics.
pub fn missing(tools: &[Tool]) -> Vec<Tool> {
    tools.iter().copied().filter(|t| !t.is_available()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tool_reports_package() {
        let tool = Tool { name: "assetrecon-no-such-tool", package: "nothing" };
        let err = tool.locate().unwrap_err();
        assert_eq!(err.to_string(), "IO error: assetrecon-no-such-tool not installed (nothing)");
        assert_eq!(missing(&[tool]), vec![tool]);
    }
}
