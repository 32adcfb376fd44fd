//! GDB/MI output records
//!
//! Every line GDB writes in MI mode is one record. The grammar is small:
//!
//! ```text
//! record  := [token] ( "^" result-class | ("*" | "+" | "=") async-class ) ( "," result )*
//!          | ("~" | "@" | "&") c-string
//!          | "(gdb)"
//! result  := variable "=" value
//! value   := c-string | "{" [ result ( "," result )* ] "}" | "[" [ (value | result) ( "," ... )* ] "]"
//! ```

/// `name=value` pairs in the order GDB emitted them
pub type Results = Vec<(String, Value)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Const(String),
    Tuple(Results),
    /// List elements; the names of `name=value` elements are dropped
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Const(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Tuple(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_tuple().and_then(|fields| lookup(fields, key))
    }
}

/// First value named `key`
pub fn lookup<'a>(results: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    results.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

pub fn lookup_str<'a>(results: &'a [(String, Value)], key: &str) -> Option<&'a str> {
    lookup(results, key).and_then(Value::as_str)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Done,
    Running,
    Connected,
    Error,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncKind {
    /// `*`: execution state changes
    Exec,
    /// `+`: progress of long operations
    Status,
    /// `=`: everything else (breakpoints, threads, libraries)
    Notify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    /// `~`: console output, i.e. what the command would print on the CLI
    Console,
    /// `@`: output of the debugged program
    Target,
    /// `&`: GDB's own log
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Result {
        token: Option<u64>,
        class: ResultClass,
        results: Results,
    },
    Async {
        token: Option<u64>,
        kind: AsyncKind,
        class: String,
        results: Results,
    },
    Stream {
        kind: StreamKind,
        text: String,
    },
    Prompt,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MiError {
    #[error("unexpected end of line at column {pos}")]
    UnexpectedEnd { pos: usize },

    #[error("expected {expected} at column {pos}, found `{found}`")]
    Unexpected {
        expected: &'static str,
        found: char,
        pos: usize,
    },

    #[error("unknown result class `{0}`")]
    UnknownResultClass(String),

    #[error("token `{0}` is out of range")]
    InvalidToken(String),

    #[error("invalid escape `\\{0}`")]
    InvalidEscape(char),

    #[error("trailing characters at column {pos}")]
    Trailing { pos: usize },
}

/// Parse one line of MI output
pub fn parse_line(line: &str) -> Result<Record, MiError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim_end() == "(gdb)" {
        return Ok(Record::Prompt);
    }
    Parser { input: line, pos: 0 }.record()
}

/// Quote `text` as an MI c-string
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn next_char(&mut self) -> Result<char, MiError> {
        self.bump()
            .ok_or(MiError::UnexpectedEnd { pos: self.pos })
    }

    fn unexpected(&self, expected: &'static str, found: char) -> MiError {
        MiError::Unexpected {
            expected,
            found,
            pos: self.pos - found.len_utf8(),
        }
    }

    fn expect(&mut self, want: char, expected: &'static str) -> Result<(), MiError> {
        match self.next_char()? {
            c if c == want => Ok(()),
            found => Err(self.unexpected(expected, found)),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn word(&mut self) -> &'a str {
        self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    fn record(mut self) -> Result<Record, MiError> {
        let token = self.token()?;
        let record = match self.next_char()? {
            '^' => {
                let class = match self.word() {
                    "done" => ResultClass::Done,
                    "running" => ResultClass::Running,
                    "connected" => ResultClass::Connected,
                    "error" => ResultClass::Error,
                    "exit" => ResultClass::Exit,
                    other => return Err(MiError::UnknownResultClass(other.to_string())),
                };
                Record::Result {
                    token,
                    class,
                    results: self.results()?,
                }
            }
            marker @ ('*' | '+' | '=') => {
                let kind = match marker {
                    '*' => AsyncKind::Exec,
                    '+' => AsyncKind::Status,
                    _ => AsyncKind::Notify,
                };
                let class = self.word();
                if class.is_empty() {
                    return match self.peek() {
                        Some(found) => {
                            self.bump();
                            Err(self.unexpected("async class", found))
                        }
                        None => Err(MiError::UnexpectedEnd { pos: self.pos }),
                    };
                }
                Record::Async {
                    token,
                    kind,
                    class: class.to_string(),
                    results: self.results()?,
                }
            }
            marker @ ('~' | '@' | '&') if token.is_none() => {
                let kind = match marker {
                    '~' => StreamKind::Console,
                    '@' => StreamKind::Target,
                    _ => StreamKind::Log,
                };
                Record::Stream {
                    kind,
                    text: self.c_string()?,
                }
            }
            found => return Err(self.unexpected("record marker", found)),
        };

        if self.pos != self.input.len() {
            return Err(MiError::Trailing { pos: self.pos });
        }
        Ok(record)
    }

    fn token(&mut self) -> Result<Option<u64>, MiError> {
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Ok(None);
        }
        digits
            .parse()
            .map(Some)
            .map_err(|_| MiError::InvalidToken(digits.to_string()))
    }

    fn results(&mut self) -> Result<Results, MiError> {
        let mut results = Vec::new();
        while self.peek() == Some(',') {
            self.bump();
            results.push(self.result()?);
        }
        Ok(results)
    }

    fn result(&mut self) -> Result<(String, Value), MiError> {
        // older GDBs print extra breakpoint locations as unnamed tuples
        if matches!(self.peek(), Some('{' | '[')) {
            return Ok((String::new(), self.value()?));
        }
        let name = self.word();
        if name.is_empty() {
            let found = self.next_char()?;
            return Err(self.unexpected("variable name", found));
        }
        self.expect('=', "`=`")?;
        Ok((name.to_string(), self.value()?))
    }

    fn value(&mut self) -> Result<Value, MiError> {
        match self.peek() {
            Some('"') => self.c_string().map(Value::Const),
            Some('{') => {
                self.bump();
                let mut fields = Vec::new();
                if self.peek() == Some('}') {
                    self.bump();
                    return Ok(Value::Tuple(fields));
                }
                loop {
                    fields.push(self.result()?);
                    match self.next_char()? {
                        ',' => continue,
                        '}' => break,
                        found => return Err(self.unexpected("`,` or `}`", found)),
                    }
                }
                Ok(Value::Tuple(fields))
            }
            Some('[') => {
                self.bump();
                let mut items = Vec::new();
                if self.peek() == Some(']') {
                    self.bump();
                    return Ok(Value::List(items));
                }
                loop {
                    let item = match self.peek() {
                        Some('"' | '{' | '[') => self.value()?,
                        _ => self.result()?.1,
                    };
                    items.push(item);
                    match self.next_char()? {
                        ',' => continue,
                        ']' => break,
                        found => return Err(self.unexpected("`,` or `]`", found)),
                    }
                }
                Ok(Value::List(items))
            }
            Some(found) => {
                self.bump();
                Err(self.unexpected("value", found))
            }
            None => Err(MiError::UnexpectedEnd { pos: self.pos }),
        }
    }

    fn c_string(&mut self) -> Result<String, MiError> {
        self.expect('"', "`\"`")?;
        // octal escapes encode raw bytes, so decode into bytes first
        let mut bytes = Vec::new();
        loop {
            match self.next_char()? {
                '"' => break,
                '\\' => {
                    let byte = match self.next_char()? {
                        'n' => b'\n',
                        't' => b'\t',
                        'r' => b'\r',
                        'a' => 0x07,
                        'b' => 0x08,
                        'f' => 0x0c,
                        'v' => 0x0b,
                        'e' => 0x1b,
                        '\\' => b'\\',
                        '"' => b'"',
                        '\'' => b'\'',
                        first @ '0'..='7' => {
                            let mut value = first as u32 - '0' as u32;
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(digit @ '0'..='7') => {
                                        self.bump();
                                        value = value * 8 + (digit as u32 - '0' as u32);
                                    }
                                    _ => break,
                                }
                            }
                            (value & 0xff) as u8
                        }
                        other => return Err(MiError::InvalidEscape(other)),
                    };
                    bytes.push(byte);
                }
                c => {
                    let mut buf = [0; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> Value {
        Value::Const(s.to_string())
    }

    #[test]
    fn result_record_with_token() {
        let record = parse_line(r#"12^done,value="42""#).unwrap();
        assert_eq!(
            record,
            Record::Result {
                token: Some(12),
                class: ResultClass::Done,
                results: vec![("value".to_string(), c("42"))],
            }
        );
    }

    #[test]
    fn error_record_message() {
        let Record::Result { class, results, .. } =
            parse_line(r#"3^error,msg="No symbol table is loaded.  Use the \"file\" command.""#)
                .unwrap()
        else {
            panic!("expected a result record");
        };
        assert_eq!(class, ResultClass::Error);
        assert_eq!(
            lookup_str(&results, "msg"),
            Some(r#"No symbol table is loaded.  Use the "file" command."#)
        );
    }

    #[test]
    fn stopped_record_with_nested_frame() {
        let line = r#"*stopped,reason="breakpoint-hit",disp="keep",bkptno="1",frame={addr="0x0000555555555131",func="main",args=[],file="main.c",fullname="/tmp/main.c",line="4",arch="i386:x86-64"},thread-id="1",stopped-threads="all",core="3""#;
        let Record::Async {
            kind,
            class,
            results,
            token,
        } = parse_line(line).unwrap()
        else {
            panic!("expected an async record");
        };
        assert_eq!(token, None);
        assert_eq!(kind, AsyncKind::Exec);
        assert_eq!(class, "stopped");

        let frame = lookup(&results, "frame").unwrap();
        assert_eq!(frame.get("fullname").and_then(Value::as_str), Some("/tmp/main.c"));
        assert_eq!(frame.get("line").and_then(Value::as_str), Some("4"));
        assert_eq!(frame.get("args"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn lists_of_results_keep_values() {
        let line = r#"^done,stack=[frame={level="0",func="f"},frame={level="1",func="main"}]"#;
        let Record::Result { results, .. } = parse_line(line).unwrap() else {
            panic!("expected a result record");
        };
        let stack = lookup(&results, "stack").and_then(Value::as_list).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1].get("func").and_then(Value::as_str), Some("main"));
    }

    #[test]
    fn unnamed_breakpoint_locations() {
        let line = r#"=breakpoint-modified,bkpt={number="2",addr="<MULTIPLE>"},{number="2.1",line="3"},{number="2.2",line="9"}"#;
        let Record::Async { results, .. } = parse_line(line).unwrap() else {
            panic!("expected an async record");
        };
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].0, "");
        assert_eq!(results[2].1.get("line").and_then(Value::as_str), Some("9"));
    }

    #[test]
    fn console_stream_escapes() {
        let record = parse_line(r#"~"Breakpoint 1 at 0x1131: file main.c, line 4.\n""#).unwrap();
        assert_eq!(
            record,
            Record::Stream {
                kind: StreamKind::Console,
                text: "Breakpoint 1 at 0x1131: file main.c, line 4.\n".to_string(),
            }
        );

        // UTF-8 bytes escaped as octal
        let record = parse_line(r#"@"caf\303\251\t!""#).unwrap();
        assert_eq!(
            record,
            Record::Stream {
                kind: StreamKind::Target,
                text: "café\t!".to_string(),
            }
        );
    }

    #[test]
    fn prompt_with_trailing_space() {
        assert_eq!(parse_line("(gdb) "), Ok(Record::Prompt));
        assert_eq!(parse_line("(gdb)\r\n"), Ok(Record::Prompt));
    }

    #[test]
    fn rejects_program_output() {
        assert!(parse_line("Hello, world!").is_err());
        assert!(parse_line("").is_err());
        assert!(parse_line("^bogus").is_err());
        assert!(parse_line(r#"~"unterminated"#).is_err());
        assert!(parse_line(r#"^done,value="1"junk"#).is_err());
        assert_eq!(
            parse_line(r#"~"\q""#),
            Err(MiError::InvalidEscape('q'))
        );
    }

    #[test]
    fn quoting_escapes_specials() {
        assert_eq!(quote(r#"print "a\b""#), r#""print \"a\\b\"""#);
        assert_eq!(quote("x\ny"), r#""x\ny""#);

        let record = parse_line(&format!("~{}", quote(r#"say "hi" \ bye"#))).unwrap();
        assert_eq!(
            record,
            Record::Stream {
                kind: StreamKind::Console,
                text: r#"say "hi" \ bye"#.to_string(),
            }
        );
    }
}
