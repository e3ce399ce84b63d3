//! Shell-command analysis for the shell-execution hooks: top-level
//! sub-commands, files the command reads, and package-manager install/run
//! targets per ecosystem.

mod bash;
mod packages;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::shell::bash::Segment;
use crate::shell::packages::classify_packages;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellCommandAnalysis {
    pub sub_commands: Vec<String>,
    pub input_files: Vec<String>,
    pub packages: BTreeMap<String, Vec<String>>,
}

/// Analyze `command` without a working directory: file detection falls back
/// to extension and well-known-filename heuristics only.
pub fn parse_shell_command(command: &str) -> ShellCommandAnalysis {
    parse_shell_command_in(command, None)
}

/// Analyze `command`, additionally treating arguments that resolve to
/// regular files under `cwd` as input files.
pub fn parse_shell_command_in(command: &str, cwd: Option<&Path>) -> ShellCommandAnalysis {
    let segments = bash::parse_segments(command);

    let mut analysis = ShellCommandAnalysis::default();
    for segment in &segments {
        analysis.sub_commands.push(segment.text.clone());
        collect_input_files(segment, cwd, &mut analysis.input_files);
        if let Some((ecosystem, targets)) = classify_packages(&segment.words) {
            if !targets.is_empty() {
                let entry = analysis.packages.entry(ecosystem.to_string()).or_default();
                for target in targets {
                    if !entry.contains(&target) {
                        entry.push(target);
                    }
                }
            }
        }
    }
    analysis
}

const INPUT_FILE_EXTENSIONS: &[&str] = &[
    ".py", ".js", ".ts", ".go", ".rs", ".c", ".h", ".cpp", ".hpp", ".json", ".yaml", ".yml",
    ".toml", ".txt", ".md", ".log", ".csv", ".tsv", ".env", ".conf", ".ini", ".sh", ".rb", ".pl",
    ".php", ".java", ".kt", ".swift", ".dart", ".scala", ".clj", ".elm", ".nim", ".zig", ".lua",
    ".tex", ".sql", ".xml", ".html", ".htm", ".css", ".tar", ".tar.gz", ".tgz", ".zip", ".gz",
    ".bz2", ".xz", ".7z",
];

const KNOWN_FILENAMES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "Cargo.toml",
    "Cargo.lock",
    "package.json",
    "package-lock.json",
    "pyproject.toml",
    "requirements.txt",
    "Gemfile",
    "Rakefile",
    "Justfile",
    "CMakeLists.txt",
    "go.mod",
    "go.sum",
];

fn collect_input_files(segment: &Segment, cwd: Option<&Path>, out: &mut Vec<String>) {
    let mut push = |candidate: &str| {
        if !out.iter().any(|existing| existing == candidate) {
            out.push(candidate.to_string());
        }
    };

    // Arguments only; the command name itself is never an input file.
    let mut args = segment.words.iter().skip(1).peekable();
    while let Some(word) = args.next() {
        if word == "-o" {
            // `-o` names an output target.
            args.next();
            continue;
        }
        if word.starts_with('-') {
            continue;
        }
        if qualifies_as_input_file(word, cwd) {
            push(word);
        }
    }

    for word in &segment.input_redirects {
        if qualifies_as_input_file(word, cwd) {
            push(word);
        }
    }
    // Output-redirect targets are written, never read.
}

fn qualifies_as_input_file(word: &str, cwd: Option<&Path>) -> bool {
    if word.is_empty() || word.starts_with('$') || word.contains('*') || word.contains('?') {
        return false;
    }

    let basename = word.rsplit('/').next().unwrap_or(word);
    if KNOWN_FILENAMES.contains(&basename)
        || basename.starts_with("Makefile")
        || basename.starts_with("Dockerfile")
    {
        return true;
    }

    let lower = basename.to_ascii_lowercase();
    if INPUT_FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }

    if let Some(cwd) = cwd {
        let path = if Path::new(word).is_absolute() {
            Path::new(word).to_path_buf()
        } else {
            cwd.join(word)
        };
        return path.is_file();
    }

    false
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn file_in_list(name: &str, files: &[String]) -> bool {
        files.iter().any(|f| f == name || f.ends_with(name))
    }

    #[test]
    fn simple_commands_and_files() {
        let result = parse_shell_command("python script.py");
        assert_eq!(result.sub_commands, vec!["python script.py"]);
        assert!(file_in_list("script.py", &result.input_files));
        assert!(result.packages.is_empty());

        let result = parse_shell_command("cat /tmp/test.txt");
        assert_eq!(result.input_files, vec!["/tmp/test.txt"]);
    }

    #[test]
    fn pipes_and_redirects() {
        let result = parse_shell_command("grep foo file.txt | sort | uniq > output.txt");
        assert_eq!(
            result.sub_commands,
            vec!["grep foo file.txt", "sort", "uniq > output.txt"]
        );
        assert!(file_in_list("file.txt", &result.input_files));
        assert!(!file_in_list("output.txt", &result.input_files));
    }

    #[test]
    fn tee_targets_count_as_files() {
        let result = parse_shell_command("python a.py | tee b.log");
        assert!(file_in_list("a.py", &result.input_files));
        assert!(file_in_list("b.log", &result.input_files));
    }

    #[test]
    fn input_redirect_is_read_output_redirect_is_not() {
        let result = parse_shell_command("python script.py < input.txt > output.txt");
        assert!(file_in_list("input.txt", &result.input_files));
        assert!(file_in_list("script.py", &result.input_files));
        assert!(!file_in_list("output.txt", &result.input_files));
    }

    #[test]
    fn multiple_file_arguments() {
        let result = parse_shell_command("cat file1.txt file2.txt file3.txt");
        for name in ["file1.txt", "file2.txt", "file3.txt"] {
            assert!(file_in_list(name, &result.input_files));
        }

        let result = parse_shell_command("diff old.py new.py");
        assert!(file_in_list("old.py", &result.input_files));
        assert!(file_in_list("new.py", &result.input_files));
    }

    #[test]
    fn exclusion_heuristics() {
        assert!(parse_shell_command("echo hello world").input_files.is_empty());
        assert!(parse_shell_command("ls -la -h").input_files.is_empty());
        assert!(parse_shell_command("ls /tmp").input_files.is_empty());
        assert!(parse_shell_command("ls *.txt").input_files.is_empty());
        assert!(parse_shell_command("echo $HOME").input_files.is_empty());
    }

    #[test]
    fn known_filenames_and_archives() {
        assert!(file_in_list(
            "Makefile",
            &parse_shell_command("cat Makefile").input_files
        ));
        assert!(file_in_list(
            "Makefile.dev",
            &parse_shell_command("make -f Makefile.dev").input_files
        ));
        assert!(file_in_list(
            "archive.tar.gz",
            &parse_shell_command("tar -xzf archive.tar.gz").input_files
        ));
        assert!(file_in_list(
            "package.json",
            &parse_shell_command("cat package.json").input_files
        ));
    }

    #[test]
    fn output_flag_target_is_excluded() {
        let result = parse_shell_command("sort input.txt -o sorted.txt");
        assert!(file_in_list("input.txt", &result.input_files));
        assert!(!file_in_list("sorted.txt", &result.input_files));

        let result = parse_shell_command("gcc -o program main.c utils.c");
        assert!(file_in_list("main.c", &result.input_files));
        assert!(file_in_list("utils.c", &result.input_files));
        assert!(!file_in_list("program", &result.input_files));
    }

    #[test]
    fn connectors_gather_files_from_both_sides() {
        let result = parse_shell_command("cat file1.txt; cat file2.txt");
        assert!(file_in_list("file1.txt", &result.input_files));
        assert!(file_in_list("file2.txt", &result.input_files));

        let result = parse_shell_command("test -f config.json && cat config.json");
        assert!(file_in_list("config.json", &result.input_files));
        // Deduplicated.
        assert_eq!(
            result
                .input_files
                .iter()
                .filter(|f| f.as_str() == "config.json")
                .count(),
            1
        );
    }

    #[test]
    fn existing_files_qualify_via_cwd() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("noext"), "data").unwrap();
        let result = parse_shell_command_in("cat noext", Some(dir.path()));
        assert!(file_in_list("noext", &result.input_files));

        // Without a cwd the same argument does not qualify.
        let result = parse_shell_command("cat noext");
        assert!(result.input_files.is_empty());
    }

    #[test]
    fn mixed_ecosystem_chain() {
        let result = parse_shell_command("uvx ruff check . && npx prettier --write .");
        assert_eq!(
            result.sub_commands,
            vec!["uvx ruff check .", "npx prettier --write ."]
        );
        assert!(result.input_files.is_empty());
        assert_eq!(result.packages["python"], vec!["ruff"]);
        assert_eq!(result.packages["node"], vec!["prettier"]);
    }

    #[test]
    fn packages_deduplicate_within_ecosystem() {
        let result = parse_shell_command("npx prettier . && npx prettier .");
        assert_eq!(result.packages["node"], vec!["prettier"]);

        let result = parse_shell_command("npx eslint . && npx prettier --write .");
        assert_eq!(result.packages["node"], vec!["eslint", "prettier"]);
    }

    #[test]
    fn multiple_docker_images_accumulate() {
        let result = parse_shell_command("docker run python:3.11 && docker run node:18");
        assert_eq!(result.packages["docker"], vec!["python:3.11", "node:18"]);
    }

    #[test]
    fn package_chain_with_pipe() {
        let result = parse_shell_command("uvx ruff check . | tee output.log");
        assert_eq!(result.packages["python"], vec!["ruff"]);
        assert!(file_in_list("output.log", &result.input_files));
    }

    #[test]
    fn no_packages_for_plain_commands() {
        assert!(parse_shell_command("cat file.txt | grep pattern").packages.is_empty());
        assert!(parse_shell_command("python script.py").packages.is_empty());
    }

    #[test]
    fn malformed_input_never_panics() {
        for cmd in ["", "   ", "|||", "echo 'unclosed", "cat <", ">>>", "a && && b"] {
            let result = parse_shell_command(cmd);
            // Shape only: lists exist, nothing crashed.
            let _ = (result.sub_commands, result.input_files, result.packages);
        }
    }
}
