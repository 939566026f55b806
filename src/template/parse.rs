//! Template parser

use crate::core::error::TemplateError;

use super::funcs;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
}

/// Commands separated by `|`; each result feeds the next command as its last argument
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.`
    Dot,
    /// `.Name.Sub`
    Field(Vec<String>),
    Str(String),
    Int(i64),
    Bool(bool),
    /// Function name
    Func(String),
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

pub(crate) fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let mut nodes = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    while pos < src.len() {
        let Some(rel) = src[pos..].find(OPEN) else {
            push_text(&mut nodes, &src[pos..], trim_next);
            break;
        };
        let open = pos + rel;
        push_text(&mut nodes, &src[pos..open], trim_next);

        let mut body_start = open + OPEN.len();
        if is_trim_marker(&src[body_start..]) {
            if let Some(Node::Text(text)) = nodes.last_mut() {
                text.truncate(text.trim_end().len());
            }
            body_start += 1;
        }

        let close = find_close(src, body_start)?;
        let mut body_end = close;
        trim_next = false;
        if src[..close].ends_with('-') && close - 1 > body_start {
            let before = &src[..close - 1];
            if before.ends_with(char::is_whitespace) {
                trim_next = true;
                body_end = close - 1;
            }
        }

        let body = src[body_start..body_end].trim();
        if !(body.starts_with("/*") && body.ends_with("*/")) {
            nodes.push(Node::Action(parse_pipeline(body, body_start)?));
        }
        pos = close + CLOSE.len();
    }

    Ok(nodes)
}

fn push_text(nodes: &mut Vec<Node>, text: &str, trim_start: bool) {
    let text = if trim_start { text.trim_start() } else { text };
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// `{{- ` trims the text before the action
fn is_trim_marker(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('-') && chars.next().is_some_and(char::is_whitespace)
}

/// Find the closing `}}`, skipping over string literals
fn find_close(src: &str, start: usize) -> Result<usize, TemplateError> {
    let bytes = src.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => i = skip_quoted(src, i)?,
            b'`' => {
                let end = src[i + 1..].find('`').ok_or_else(|| TemplateError::Parse {
                    offset: i,
                    message: "unterminated raw string".to_string(),
                })?;
                i += end + 2;
            }
            b'}' if src[i..].starts_with(CLOSE) => return Ok(i),
            _ => i += 1,
        }
    }
    Err(TemplateError::Parse {
        offset: start,
        message: "unclosed action".to_string(),
    })
}

/// Position just past the closing quote of the literal starting at `start`
fn skip_quoted(src: &str, start: usize) -> Result<usize, TemplateError> {
    let bytes = src.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i + 1),
            b'\n' => break,
            _ => i += 1,
        }
    }
    Err(TemplateError::Parse {
        offset: start,
        message: "unterminated quoted string".to_string(),
    })
}

fn parse_pipeline(body: &str, offset: usize) -> Result<Pipeline, TemplateError> {
    let tokens = tokenize(body, offset)?;
    if tokens.is_empty() {
        return Err(TemplateError::Parse {
            offset,
            message: "missing value for command".to_string(),
        });
    }

    let mut commands = Vec::new();
    let mut operands = Vec::new();
    for token in tokens {
        match token {
            Token::Pipe => {
                if operands.is_empty() {
                    return Err(TemplateError::Parse {
                        offset,
                        message: "missing command before '|'".to_string(),
                    });
                }
                commands.push(finish_command(std::mem::take(&mut operands), offset)?);
            }
            Token::Operand(operand) => operands.push(operand),
        }
    }
    if operands.is_empty() {
        return Err(TemplateError::Parse {
            offset,
            message: "missing command after '|'".to_string(),
        });
    }
    commands.push(finish_command(operands, offset)?);

    // Only functions can receive a piped value
    for command in commands.iter().skip(1) {
        if !matches!(command.operands.first(), Some(Operand::Func(_))) {
            return Err(TemplateError::Parse {
                offset,
                message: "non executable command in pipeline stage".to_string(),
            });
        }
    }

    Ok(Pipeline { commands })
}

fn finish_command(operands: Vec<Operand>, offset: usize) -> Result<Command, TemplateError> {
    if operands.len() > 1 && !matches!(operands[0], Operand::Func(_)) {
        return Err(TemplateError::Parse {
            offset,
            message: "can't give argument to non-function".to_string(),
        });
    }
    Ok(Command { operands })
}

#[derive(Debug)]
enum Token {
    Pipe,
    Operand(Operand),
}

fn tokenize(body: &str, offset: usize) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = body;

    loop {
        rest = rest.trim_start();
        let at = offset + (body.len() - rest.len());
        let Some(first) = rest.chars().next() else {
            break;
        };

        let (token, len) = match first {
            '|' => (Token::Pipe, 1),
            '"' => {
                let end = skip_quoted(rest, 0).map_err(|e| shift(e, at))?;
                (Token::Operand(Operand::Str(unquote(&rest[1..end - 1], at)?)), end)
            }
            '`' => {
                let end = rest[1..].find('`').ok_or_else(|| TemplateError::Parse {
                    offset: at,
                    message: "unterminated raw string".to_string(),
                })?;
                (Token::Operand(Operand::Str(rest[1..end + 1].to_string())), end + 2)
            }
            '.' => {
                let len = word_len(rest);
                let path = &rest[1..len];
                let operand = if path.is_empty() {
                    Operand::Dot
                } else {
                    let names: Vec<String> = path.split('.').map(str::to_string).collect();
                    if names.iter().any(|n| !is_identifier(n)) {
                        return Err(TemplateError::Parse {
                            offset: at,
                            message: format!("bad field path {:?}", &rest[..len]),
                        });
                    }
                    Operand::Field(names)
                };
                (Token::Operand(operand), len)
            }
            c if c.is_ascii_digit() || c == '-' || c == '+' => {
                let len = word_len(rest);
                let value = rest[..len].parse().map_err(|_| TemplateError::Parse {
                    offset: at,
                    message: format!("bad number syntax: {:?}", &rest[..len]),
                })?;
                (Token::Operand(Operand::Int(value)), len)
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = word_len(rest);
                let word = &rest[..len];
                let operand = match word {
                    "true" => Operand::Bool(true),
                    "false" => Operand::Bool(false),
                    _ if !is_identifier(word) => {
                        return Err(TemplateError::Parse {
                            offset: at,
                            message: format!("unexpected {:?} in command", word),
                        })
                    }
                    _ if !funcs::exists(word) => {
                        return Err(TemplateError::Parse {
                            offset: at,
                            message: format!("function {:?} not defined", word),
                        })
                    }
                    _ => Operand::Func(word.to_string()),
                };
                (Token::Operand(operand), len)
            }
            other => {
                return Err(TemplateError::Parse {
                    offset: at,
                    message: format!("unexpected {:?} in command", other),
                })
            }
        };

        tokens.push(token);
        rest = &rest[len..];
    }

    Ok(tokens)
}

/// Length of the run of characters up to whitespace or `|`
fn word_len(s: &str) -> usize {
    s.find(|c: char| c.is_whitespace() || c == '|')
        .unwrap_or(s.len())
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn unquote(s: &str, offset: usize) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            other => {
                return Err(TemplateError::Parse {
                    offset,
                    message: format!("invalid escape \\{}", other.unwrap_or(' ')),
                })
            }
        }
    }
    Ok(out)
}

fn shift(err: TemplateError, by: usize) -> TemplateError {
    match err {
        TemplateError::Parse { offset, message } => TemplateError::Parse {
            offset: offset + by,
            message,
        },
        other => other,
    }
}
