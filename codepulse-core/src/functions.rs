//! Lexical function-length measurement.
//!
//! Neither scanner parses the language. Python functions are tracked by
//! indentation relative to their `def` line, with nested definitions kept on a
//! stack; brace languages by the running `{`/`}` balance from the line that
//! opened the function.

/// A function found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpan {
    /// Function name, `anonymous` or `arrow_function` when it has none.
    pub name: String,
    /// Number of lines attributed to the function.
    pub lines: usize,
    /// One-based line of the definition.
    pub start_line: usize,
}

/// Columns a tab advances to, as the Python tokenizer counts them.
const TAB_WIDTH: usize = 8;

/// Function spans for a file, chosen by extension. Other languages yield nothing.
pub fn function_spans(file_name: &str, lines: &[&str]) -> Vec<FunctionSpan> {
    if file_name.ends_with(".py") {
        let mut spans = PythonScanner::default().scan(lines);
        spans.sort_by_key(|span| span.start_line);
        spans
    } else if file_name.ends_with(".js") || file_name.ends_with(".ts") {
        BraceScanner::default().scan(lines)
    } else {
        Vec::new()
    }
}

#[derive(Debug)]
struct OpenDef {
    name: String,
    start: usize,
    indent: usize,
}

/// Open definitions, innermost last.
#[derive(Debug, Default)]
struct PythonScanner {
    open: Vec<OpenDef>,
    spans: Vec<FunctionSpan>,
}

impl PythonScanner {
    fn scan(mut self, lines: &[&str]) -> Vec<FunctionSpan> {
        for (index, line) in lines.iter().enumerate() {
            self.step(index, line);
        }
        self.close_from(0, lines.len());
        self.spans
    }

    fn step(&mut self, index: usize, line: &str) {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            return;
        }
        let indent = indent_width(line);
        self.close_from(indent, index);
        if let Some(name) = python_def_name(stripped) {
            self.open.push(OpenDef {
                name,
                start: index,
                indent,
            });
        }
    }

    /// Close every open definition whose body ends at a line indented `indent`.
    fn close_from(&mut self, indent: usize, end: usize) {
        while self.open.last().is_some_and(|def| def.indent >= indent) {
            let Some(def) = self.open.pop() else {
                break;
            };
            self.spans.push(FunctionSpan {
                name: def.name,
                lines: end - def.start,
                start_line: def.start + 1,
            });
        }
    }
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|ch| ch.is_whitespace())
        .fold(0, |width, ch| match ch {
            '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
            _ => width + 1,
        })
}

/// Name declared by a `def` or `async def` line.
pub(crate) fn python_def_name(stripped: &str) -> Option<String> {
    let rest = stripped
        .strip_prefix("def ")
        .or_else(|| stripped.strip_prefix("async def "))?;
    if !stripped.contains(':') {
        return None;
    }
    let name = rest.split('(').next().unwrap_or(rest).trim();
    Some(name.trim_end_matches(':').to_string())
}

#[derive(Debug, Default)]
enum BraceState {
    #[default]
    Outside,
    Inside {
        name: String,
        start: usize,
        depth: i64,
    },
}

#[derive(Debug, Default)]
struct BraceScanner {
    state: BraceState,
    spans: Vec<FunctionSpan>,
}

impl BraceScanner {
    fn scan(mut self, lines: &[&str]) -> Vec<FunctionSpan> {
        for (index, line) in lines.iter().enumerate() {
            self.step(index, line.trim());
        }
        self.spans
    }

    fn step(&mut self, index: usize, stripped: &str) {
        let balance = brace_balance(stripped);
        if let BraceState::Inside { depth, .. } = &mut self.state {
            *depth += balance;
            if *depth <= 0 {
                self.close(index);
            }
            return;
        }

        let opens_function =
            (stripped.contains("function ") || stripped.contains("=>")) && stripped.contains('{');
        if !opens_function {
            return;
        }
        self.state = BraceState::Inside {
            name: js_function_name(stripped),
            start: index,
            depth: balance,
        };
        if balance <= 0 {
            self.close(index);
        }
    }

    fn close(&mut self, end: usize) {
        if let BraceState::Inside { name, start, .. } = std::mem::take(&mut self.state) {
            self.spans.push(FunctionSpan {
                name,
                lines: end - start + 1,
                start_line: start + 1,
            });
        }
    }
}

fn brace_balance(line: &str) -> i64 {
    line.chars().fold(0, |balance, ch| match ch {
        '{' => balance + 1,
        '}' => balance - 1,
        _ => balance,
    })
}

fn js_function_name(stripped: &str) -> String {
    let Some(position) = stripped.find("function ") else {
        return "arrow_function".to_string();
    };
    let name: String = stripped[position + "function ".len()..]
        .trim_start()
        .chars()
        .take_while(|ch| ch.is_alphanumeric() || *ch == '_')
        .collect();
    if name.is_empty() {
        "anonymous".to_string()
    } else {
        name
    }
}
