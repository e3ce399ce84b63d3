//! Bash AST segmentation built on tree-sitter.
//!
//! A command line is broken into its top-level pipeline segments (split on
//! `|`, `;`, `&&`, `||`) with redirections kept attached to the segment that
//! owns them. When the grammar rejects the input we degrade to a token-level
//! split; this path never fails.

use tree_sitter::Node;
use tree_sitter::Parser;
use tree_sitter::Tree;
use tree_sitter_bash::LANGUAGE as BASH;

/// One top-level command segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    /// Source text of the segment, redirections included.
    pub text: String,
    /// Command name and arguments with surrounding quotes stripped.
    pub words: Vec<String>,
    /// Targets of `<` redirections.
    pub input_redirects: Vec<String>,
    /// Targets of `>`, `>>`, `2>`, `&>` redirections.
    pub output_redirects: Vec<String>,
}

pub(crate) fn parse_segments(src: &str) -> Vec<Segment> {
    if src.trim().is_empty() {
        return Vec::new();
    }
    match try_parse_bash(src) {
        Some(tree) if !tree.root_node().has_error() => {
            let mut segments = Vec::new();
            collect(tree.root_node(), src, &mut segments);
            if segments.is_empty() {
                fallback_segments(src)
            } else {
                segments
            }
        }
        _ => fallback_segments(src),
    }
}

fn try_parse_bash(src: &str) -> Option<Tree> {
    let lang = BASH.into();
    let mut parser = Parser::new();
    parser.set_language(&lang).ok()?;
    parser.parse(src, None)
}

fn collect(node: Node, src: &str, out: &mut Vec<Segment>) {
    match node.kind() {
        "command" => {
            out.push(segment_from_command(node, src));
        }
        "redirected_statement" => {
            let before = out.len();
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if !matches!(child.kind(), "file_redirect" | "heredoc_redirect") {
                    collect(child, src, out);
                }
            }
            let (inputs, outputs) = redirect_targets(node, src);
            if let Some(last) = out.get_mut(before..).and_then(<[Segment]>::last_mut) {
                // The owning segment's text covers the redirections too.
                last.text = node_text(node, src);
                last.input_redirects.extend(inputs);
                last.output_redirects.extend(outputs);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect(child, src, out);
            }
        }
    }
}

fn segment_from_command(node: Node, src: &str) -> Segment {
    let mut words = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "command_name" => {
                words.push(unquote(&node_text(child, src)));
            }
            "variable_assignment" | "file_redirect" | "heredoc_redirect" => {}
            _ => {
                words.push(unquote(&node_text(child, src)));
            }
        }
    }
    Segment {
        text: node_text(node, src).trim().to_string(),
        words,
        input_redirects: Vec::new(),
        output_redirects: Vec::new(),
    }
}

fn redirect_targets(node: Node, src: &str) -> (Vec<String>, Vec<String>) {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() != "file_redirect" {
            continue;
        }
        let Some(destination) = child.child_by_field_name("destination") else {
            continue;
        };
        let target = unquote(&node_text(destination, src));
        let redirect_text = node_text(child, src);
        let operator: String = redirect_text
            .chars()
            .take_while(|c| "0123456789<>&".contains(*c))
            .collect();
        if operator.contains('<') {
            inputs.push(target);
        } else {
            outputs.push(target);
        }
    }
    (inputs, outputs)
}

fn node_text(node: Node, src: &str) -> String {
    node.utf8_text(src.as_bytes()).unwrap_or_default().to_string()
}

fn unquote(word: &str) -> String {
    let trimmed = word.trim();
    if trimmed.len() >= 2 {
        let bytes = trimmed.as_bytes();
        if (bytes[0] == b'\'' && bytes[trimmed.len() - 1] == b'\'')
            || (bytes[0] == b'"' && bytes[trimmed.len() - 1] == b'"')
        {
            return trimmed[1..trimmed.len() - 1].to_string();
        }
    }
    trimmed.to_string()
}

/// Best-effort split used when the AST parse fails: break on top-level
/// connectors outside quotes, then tokenize each piece.
fn fallback_segments(src: &str) -> Vec<Segment> {
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = src.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    current.push(c);
                }
                '|' | '&' if chars.peek() == Some(&c) => {
                    chars.next();
                    pieces.push(std::mem::take(&mut current));
                }
                '|' | ';' => {
                    pieces.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    pieces.push(current);

    pieces
        .into_iter()
        .filter_map(|piece| {
            let text = piece.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let raw_words = shlex::split(&text)
                .unwrap_or_else(|| text.split_whitespace().map(str::to_string).collect());
            Some(segment_from_tokens(text, raw_words))
        })
        .collect()
}

/// Pull redirect operators out of a flat token list.
fn segment_from_tokens(text: String, raw_words: Vec<String>) -> Segment {
    let mut words = Vec::new();
    let mut input_redirects = Vec::new();
    let mut output_redirects = Vec::new();
    let mut iter = raw_words.into_iter().peekable();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "<" => {
                if let Some(target) = iter.next() {
                    input_redirects.push(target);
                }
            }
            ">" | ">>" | "1>" | "2>" | "&>" | "1>>" | "2>>" | "&>>" => {
                if let Some(target) = iter.next() {
                    output_redirects.push(target);
                }
            }
            _ => words.push(token),
        }
    }
    Segment {
        text,
        words,
        input_redirects,
        output_redirects,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(src: &str) -> Vec<String> {
        parse_segments(src).into_iter().map(|s| s.text).collect()
    }

    #[test]
    fn single_command() {
        let segments = parse_segments("python script.py");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].words, vec!["python", "script.py"]);
    }

    #[test]
    fn pipeline_is_split() {
        assert_eq!(
            texts("cat data.csv | sort | uniq"),
            vec!["cat data.csv", "sort", "uniq"]
        );
    }

    #[test]
    fn connectors_are_split() {
        assert_eq!(
            texts("test -f config.json && cat config.json"),
            vec!["test -f config.json", "cat config.json"]
        );
        assert_eq!(
            texts("cat a.txt; cat b.txt"),
            vec!["cat a.txt", "cat b.txt"]
        );
        assert_eq!(
            texts("cat a.txt || cat b.txt"),
            vec!["cat a.txt", "cat b.txt"]
        );
    }

    #[test]
    fn redirect_stays_attached_to_owner() {
        assert_eq!(
            texts("grep foo file.txt | sort | uniq > output.txt"),
            vec!["grep foo file.txt", "sort", "uniq > output.txt"]
        );
    }

    #[test]
    fn input_and_output_redirects_are_classified() {
        let segments = parse_segments("python script.py < input.txt > output.txt");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].input_redirects, vec!["input.txt"]);
        assert_eq!(segments[0].output_redirects, vec!["output.txt"]);
        assert_eq!(segments[0].words, vec!["python", "script.py"]);
    }

    #[test]
    fn stderr_and_combined_redirects_are_outputs() {
        let segments = parse_segments("python script.py 2> error.log");
        assert_eq!(segments[0].output_redirects, vec!["error.log"]);

        let segments = parse_segments("python test.py &> output.log");
        assert_eq!(segments[0].output_redirects, vec!["output.log"]);
    }

    #[test]
    fn quotes_are_stripped_from_words_but_kept_in_text() {
        let segments = parse_segments("awk '{print $1}' data.csv");
        assert_eq!(segments[0].text, "awk '{print $1}' data.csv");
        assert_eq!(segments[0].words, vec!["awk", "{print $1}", "data.csv"]);
    }

    #[test]
    fn unclosed_quote_falls_back_without_crashing() {
        let segments = parse_segments("echo 'unclosed");
        assert!(!segments.is_empty());
    }

    #[test]
    fn operator_garbage_yields_empty_list() {
        let segments = parse_segments("|||");
        assert!(segments.iter().all(|s| !s.text.is_empty()));
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(parse_segments("").is_empty());
        assert!(parse_segments("   ").is_empty());
    }
}
