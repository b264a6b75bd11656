use std::borrow::Cow;
use std::fmt;
use std::iter::Peekable;

/// Shader stage a program runs in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ProgramStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ProgramStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramStage::Vertex => f.write_str("vertex"),
            ProgramStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// A named entry point in a [`ProgramLibrary`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Program {
    pub name: String,
    pub stage: ProgramStage,
}

/// WGSL source with its vertex/fragment entry points indexed by name.
#[derive(Debug, Clone)]
pub struct ProgramLibrary {
    label: String,
    source: Cow<'static, str>,
    programs: Vec<Program>,
}

impl ProgramLibrary {
    pub fn from_wgsl(label: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
        let source = source.into();
        let programs = index_entry_points(&source);
        Self {
            label: label.into(),
            source,
            programs,
        }
    }

    /// Library bundled with the crate (`shaders/quad.wgsl`).
    pub fn default_library() -> Self {
        Self::from_wgsl("quadview default library", include_str!("shaders/quad.wgsl"))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn function(&self, name: &str) -> Option<&Program> {
        self.programs.iter().find(|p| p.name == name)
    }
}

fn index_entry_points(source: &str) -> Vec<Program> {
    let code = strip_comments(source);
    let mut tokens = code.split_whitespace().peekable();

    let mut programs = Vec::new();
    while let Some(tok) = tokens.next() {
        let stage = match tok {
            "@vertex" => ProgramStage::Vertex,
            "@fragment" => ProgramStage::Fragment,
            _ => continue,
        };

        skip_attributes(&mut tokens);
        if tokens.next() != Some("fn") {
            continue;
        }
        let Some(name_tok) = tokens.next() else { break };
        let name = name_tok.split('(').next().unwrap_or("");
        if !name.is_empty() {
            programs.push(Program {
                name: name.to_string(),
                stage,
            });
        }
    }
    programs
}

/// Consumes attributes such as `@must_use` or `@workgroup_size(8, 8)`.
fn skip_attributes<'a, I>(tokens: &mut Peekable<I>)
where
    I: Iterator<Item = &'a str>,
{
    let mut depth = 0i32;
    while let Some(&tok) = tokens.peek() {
        if depth == 0 && !tok.starts_with('@') {
            break;
        }
        let opened = tok.matches('(').count() as i32;
        let closed = tok.matches(')').count() as i32;
        depth = (depth + opened - closed).max(0);
        tokens.next();
    }
}

/// Blanks out `//` line comments and nested `/* */` block comments.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                depth += 1;
                out.push(' ');
            }
            ('*', Some('/')) if depth > 0 => {
                chars.next();
                depth -= 1;
            }
            ('/', Some('/')) if depth == 0 => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            // Keep line breaks so tokens on either side stay apart.
            ('\n', _) => out.push('\n'),
            _ if depth > 0 => {}
            _ => out.push(c),
        }
    }
    out
}
