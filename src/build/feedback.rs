use colored::*;

/// Recognizes common go tool failures that produce no file diagnostics and
/// suggests a fix.
pub struct FeedbackAnalyzer;

impl FeedbackAnalyzer {
    pub fn analyze(output: &str) -> Option<String> {
        // 1. Outside GOPATH or module
        if output.contains("go.mod file not found")
            || output.contains("cannot find main module")
        {
            return Some(format!(
                "The go tool could not find a module for this project.\nRun {} in the project root, or place the project under {}.",
                "go mod init <module>".bold().green(),
                "$GOPATH/src".bold().yellow()
            ));
        }

        // 2. Missing dependency
        if output.contains("cannot find package")
            || output.contains("no required module provides package")
        {
            return Some(format!(
                "It looks like a {} error.\nCheck the import path, or fetch the package with {}.",
                "Missing Package".bold().red(),
                "go get <package>".bold().green()
            ));
        }

        // 3. Spec matched nothing buildable
        if output.contains("no Go files in") || output.contains("matched no packages") {
            return Some(format!(
                "The package spec matched no Go sources.\nCheck {} in {} or the project's {} folder.",
                "package".bold().yellow(),
                "gob.toml".bold().yellow(),
                "src/".bold().yellow()
            ));
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_module() {
        let err = "go: go.mod file not found in current directory or any parent directory";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("go mod init"));
    }

    #[test]
    fn test_missing_package() {
        let err = "main.go:3:8: no required module provides package example.com/nope";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("Missing Package"));
    }

    #[test]
    fn test_no_go_files() {
        let err = "can't load package: package .: no Go files in /work/app/src";
        let msg = FeedbackAnalyzer::analyze(err).unwrap();
        assert!(msg.contains("matched no Go sources"));
    }

    #[test]
    fn test_unrelated_output() {
        assert!(FeedbackAnalyzer::analyze("main.go:1:1: undefined: x").is_none());
    }
}
