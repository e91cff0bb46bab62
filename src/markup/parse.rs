use crate::foundation::error::{CardError, CardResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TagKind {
    Var { path: String, raw: bool },
    OpenIf(String),
    OpenEach(String),
    Else,
    CloseIf,
    CloseEach,
    Comment,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece {
    Text(String),
    Tag { kind: TagKind, span: Span },
}

/// Markup syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Var {
        path: String,
        raw: bool,
    },
    If {
        path: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        path: String,
        body: Vec<Node>,
    },
}

pub(crate) fn lex(input: &str) -> CardResult<Vec<Piece>> {
    let mut out = Vec::new();
    let mut rest = 0usize;

    while let Some(rel) = input[rest..].find("{{") {
        let open = rest + rel;
        if open > rest {
            out.push(Piece::Text(input[rest..open].to_owned()));
        }

        let raw = input[open..].starts_with("{{{");
        let (body_start, closer) = if raw { (open + 3, "}}}") } else { (open + 2, "}}") };
        let Some(close_rel) = input[body_start..].find(closer) else {
            return Err(CardError::markup(format!(
                "unclosed '{}' at byte {open}",
                if raw { "{{{" } else { "{{" }
            )));
        };
        let body_end = body_start + close_rel;
        let end = body_end + closer.len();
        let span = Span { start: open };
        let kind = classify(input[body_start..body_end].trim(), raw, span)?;
        out.push(Piece::Tag { kind, span });
        rest = end;
    }

    if rest < input.len() {
        out.push(Piece::Text(input[rest..].to_owned()));
    }
    Ok(out)
}

fn classify(body: &str, raw: bool, span: Span) -> CardResult<TagKind> {
    let err = |msg: &str| CardError::markup(format!("{msg} at byte {}", span.start));

    if raw {
        if body.is_empty() || body.starts_with(['#', '/', '!']) {
            return Err(err("raw interpolation expects a path"));
        }
        return Ok(TagKind::Var {
            path: body.to_owned(),
            raw: true,
        });
    }

    if body.starts_with('!') {
        return Ok(TagKind::Comment);
    }
    if let Some(block) = body.strip_prefix('#') {
        let (name, arg) = block.split_once(char::is_whitespace).unwrap_or((block, ""));
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(err(&format!("block '#{name}' needs a path")));
        }
        return match name {
            "if" => Ok(TagKind::OpenIf(arg.to_owned())),
            "each" => Ok(TagKind::OpenEach(arg.to_owned())),
            other => Err(err(&format!("unknown block '#{other}'"))),
        };
    }
    if let Some(close) = body.strip_prefix('/') {
        return match close.trim() {
            "if" => Ok(TagKind::CloseIf),
            "each" => Ok(TagKind::CloseEach),
            other => Err(err(&format!("unknown closing block '/{other}'"))),
        };
    }
    if body == "else" {
        return Ok(TagKind::Else);
    }
    if body.is_empty() {
        return Err(err("empty interpolation"));
    }
    Ok(TagKind::Var {
        path: body.to_owned(),
        raw: false,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Root,
    If,
    Each,
}

pub(crate) fn parse(input: &str) -> CardResult<Vec<Node>> {
    let pieces = lex(input)?;
    let mut iter = pieces.into_iter();
    let (nodes, _) = parse_seq(&mut iter, Frame::Root, 0)?;
    Ok(nodes)
}

/// How a nested sequence ended.
enum SeqEnd {
    Else(Span),
    Close,
}

fn parse_seq(
    iter: &mut std::vec::IntoIter<Piece>,
    frame: Frame,
    opened_at: usize,
) -> CardResult<(Vec<Node>, Option<SeqEnd>)> {
    let mut nodes = Vec::new();
    while let Some(piece) = iter.next() {
        let (kind, span) = match piece {
            Piece::Text(t) => {
                nodes.push(Node::Text(t));
                continue;
            }
            Piece::Tag { kind, span } => (kind, span),
        };
        match kind {
            TagKind::Comment => {}
            TagKind::Var { path, raw } => nodes.push(Node::Var { path, raw }),
            TagKind::OpenIf(path) => {
                let (then, end) = parse_seq(iter, Frame::If, span.start)?;
                let otherwise = match end {
                    Some(SeqEnd::Else(_)) => {
                        let (otherwise, end) = parse_seq(iter, Frame::If, span.start)?;
                        if let Some(SeqEnd::Else(second)) = end {
                            return Err(CardError::markup(format!(
                                "second '{{{{else}}}}' at byte {}",
                                second.start
                            )));
                        }
                        otherwise
                    }
                    _ => Vec::new(),
                };
                nodes.push(Node::If {
                    path,
                    then,
                    otherwise,
                });
            }
            TagKind::OpenEach(path) => {
                let (body, end) = parse_seq(iter, Frame::Each, span.start)?;
                if let Some(SeqEnd::Else(s)) = end {
                    return Err(CardError::markup(format!(
                        "'{{{{else}}}}' inside '#each' at byte {}",
                        s.start
                    )));
                }
                nodes.push(Node::Each { path, body });
            }
            TagKind::Else => {
                if frame != Frame::If {
                    return Err(CardError::markup(format!(
                        "'{{{{else}}}}' outside '#if' at byte {}",
                        span.start
                    )));
                }
                return Ok((nodes, Some(SeqEnd::Else(span))));
            }
            TagKind::CloseIf | TagKind::CloseEach => {
                let expected = match kind {
                    TagKind::CloseIf => Frame::If,
                    _ => Frame::Each,
                };
                if frame != expected {
                    return Err(CardError::markup(format!(
                        "unexpected closing block at byte {}",
                        span.start
                    )));
                }
                return Ok((nodes, Some(SeqEnd::Close)));
            }
        }
    }

    match frame {
        Frame::Root => Ok((nodes, None)),
        Frame::If => Err(CardError::markup(format!(
            "unclosed '#if' opened at byte {opened_at}"
        ))),
        Frame::Each => Err(CardError::markup(format!(
            "unclosed '#each' opened at byte {opened_at}"
        ))),
    }
}
