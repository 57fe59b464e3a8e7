//! Recognition of git invocations inside a shell command line.
//!
//! The command arrives unexpanded, so only literal words are inspected.
//! Quoting follows POSIX shell rules closely enough for `-m "..."` and
//! `-m '...'` arguments; substitutions stay literal.

/// A git invocation relevant to the guards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCommand {
    /// `git commit`; one entry per `-m`, empty when the message comes from an
    /// editor or a file
    Commit { messages: Vec<String> },
    /// `git commit` whose message is built from a heredoc
    CommitHeredoc,
    /// `git push [remote] [refspec...]`
    Push {
        remote: Option<String>,
        refspecs: Vec<String>,
        tags_only: bool,
    },
    /// `git checkout -b`, `git switch -c` or `git branch <name>`
    CreateBranch { name: String },
}

const SEPARATORS: [&str; 5] = ["&&", "||", ";", "|", "&"];

/// Every git invocation in `command`, in order of appearance
pub fn parse(command: &str) -> Vec<GitCommand> {
    split_words(command)
        .split(|word| SEPARATORS.contains(&word.as_str()))
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(words: &[String]) -> Option<GitCommand> {
    let start = words.iter().position(|w| w == "git")?;
    let args = skip_global_options(&words[start + 1..]);
    let (subcommand, rest) = args.split_first()?;

    match subcommand.as_str() {
        "commit" => Some(parse_commit(rest)),
        "push" => Some(parse_push(rest)),
        "checkout" => flag_value(rest, &["-b", "-B"]).map(|name| GitCommand::CreateBranch { name }),
        "switch" => flag_value(rest, &["-c", "-C", "--create", "--force-create"])
            .map(|name| GitCommand::CreateBranch { name }),
        "branch" => {
            if rest.iter().any(|w| w.starts_with('-')) {
                return None;
            }
            rest.first().map(|name| GitCommand::CreateBranch { name: name.clone() })
        }
        _ => None,
    }
}

fn skip_global_options(words: &[String]) -> &[String] {
    let mut i = 0;
    while let Some(word) = words.get(i) {
        if !word.starts_with('-') {
            break;
        }
        i += match word.as_str() {
            "-C" | "-c" | "--git-dir" | "--work-tree" | "--namespace" => 2,
            _ => 1,
        };
    }
    words.get(i..).unwrap_or_default()
}

fn parse_commit(args: &[String]) -> GitCommand {
    if args.iter().any(|w| w.contains("<<")) {
        return GitCommand::CommitHeredoc;
    }

    let mut messages = Vec::new();
    let mut iter = args.iter();
    while let Some(word) = iter.next() {
        if word == "--message" {
            messages.extend(iter.next().cloned());
        } else if let Some(message) = word.strip_prefix("--message=") {
            messages.push(message.to_string());
        } else if is_short_cluster(word) {
            scan_commit_cluster(&word[1..], &mut iter, &mut messages);
        }
    }
    GitCommand::Commit { messages }
}

/// Walk a short option cluster (`-am msg`, `-mmsg`, `-Skey`). The first flag
/// that takes a value ends the cluster; its value is the rest of the cluster
/// or, for required values, the next word.
fn scan_commit_cluster<'a>(
    cluster: &str,
    rest: &mut impl Iterator<Item = &'a String>,
    messages: &mut Vec<String>,
) {
    for (at, flag) in cluster.char_indices() {
        let value = &cluster[at + flag.len_utf8()..];
        match flag {
            'm' => {
                if value.is_empty() {
                    messages.extend(rest.next().cloned());
                } else {
                    messages.push(value.to_string());
                }
                return;
            }
            'F' | 'C' | 'c' | 't' => {
                if value.is_empty() {
                    rest.next();
                }
                return;
            }
            // optional values are only ever attached
            'S' | 'u' => return,
            _ => {}
        }
    }
}

fn is_short_cluster(word: &str) -> bool {
    word.len() > 1 && word.starts_with('-') && !word.starts_with("--")
}

fn parse_push(args: &[String]) -> GitCommand {
    let tags_only = args.iter().any(|w| w == "--tags");
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(word) = iter.next() {
        match word.as_str() {
            "-o" | "--push-option" | "--repo" => {
                iter.next();
            }
            w if w.starts_with('-') => {}
            _ => positional.push(word.clone()),
        }
    }

    let mut positional = positional.into_iter();
    GitCommand::Push {
        remote: positional.next(),
        refspecs: positional.collect(),
        tags_only,
    }
}

fn flag_value(args: &[String], flags: &[&str]) -> Option<String> {
    let at = args.iter().position(|w| flags.contains(&w.as_str()))?;
    args.get(at + 1).cloned()
}

/// Split a command line into words and operator tokens.
fn split_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                for q in chars.by_ref() {
                    if q == '\'' {
                        break;
                    }
                    word.push(q);
                }
            }
            '"' => {
                in_word = true;
                while let Some(q) = chars.next() {
                    match q {
                        '"' => break,
                        '\\' if matches!(chars.peek(), Some('"' | '\\' | '$' | '`')) => {
                            word.extend(chars.next());
                        }
                        _ => word.push(q),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some('\n') | None => {}
                    Some(escaped) => word.push(escaped),
                }
            }
            ';' | '&' | '|' | '\n' => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
                let mut op = c.to_string();
                if (c == '&' || c == '|') && chars.peek() == Some(&c) {
                    op.push(c);
                    chars.next();
                }
                words.push(if c == '\n' { ";".to_string() } else { op });
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            _ => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    words
}
