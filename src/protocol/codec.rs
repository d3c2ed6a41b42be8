//! Protocol codec
//!
//! Decoding and encoding for the pickle-based wire format spoken by the
//! fail2ban server socket.
//!
//! ## Decoding
//!
//! The decoder is a small stack machine over the pickle opcodes the daemon
//! emits (protocols 0 through 5). It produces a [`WireValue`] tree and knows
//! nothing about commands. Only one class reference is accepted: the builtin
//! `str`, which the daemon uses to wrap plain strings. Calling it returns its
//! first argument unchanged.
//!
//! ## Encoding
//!
//! Only command arrays are ever sent, so the encoder writes exactly one shape:
//! ```text
//! PROTO 2 │ EMPTY_LIST │ MARK │ BINUNICODE token... │ APPENDS │ STOP
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::num::IntErrorKind;
use std::rc::Rc;

use super::WireValue;
use crate::error::{JailwatchError, Result};

/// Highest pickle protocol the decoder accepts
pub const HIGHEST_PROTOCOL: u8 = 5;

/// Protocol used for outgoing commands
pub const COMMAND_PROTOCOL: u8 = 2;

/// Deepest list/tuple nesting a decoded value may have
pub const MAX_NESTING_DEPTH: usize = 512;

// =============================================================================
// Opcodes
// =============================================================================

mod op {
    pub const MARK: u8 = b'(';
    pub const STOP: u8 = b'.';
    pub const POP: u8 = b'0';
    pub const POP_MARK: u8 = b'1';
    pub const DUP: u8 = b'2';
    pub const FLOAT: u8 = b'F';
    pub const INT: u8 = b'I';
    pub const BININT: u8 = b'J';
    pub const BININT1: u8 = b'K';
    pub const LONG: u8 = b'L';
    pub const BININT2: u8 = b'M';
    pub const NONE: u8 = b'N';
    pub const PERSID: u8 = b'P';
    pub const REDUCE: u8 = b'R';
    pub const STRING: u8 = b'S';
    pub const BINSTRING: u8 = b'T';
    pub const SHORT_BINSTRING: u8 = b'U';
    pub const UNICODE: u8 = b'V';
    pub const BINUNICODE: u8 = b'X';
    pub const APPEND: u8 = b'a';
    pub const GLOBAL: u8 = b'c';
    pub const DICT: u8 = b'd';
    pub const EMPTY_DICT: u8 = b'}';
    pub const APPENDS: u8 = b'e';
    pub const GET: u8 = b'g';
    pub const BINGET: u8 = b'h';
    pub const LONG_BINGET: u8 = b'j';
    pub const LIST: u8 = b'l';
    pub const EMPTY_LIST: u8 = b']';
    pub const PUT: u8 = b'p';
    pub const BINPUT: u8 = b'q';
    pub const LONG_BINPUT: u8 = b'r';
    pub const TUPLE: u8 = b't';
    pub const EMPTY_TUPLE: u8 = b')';
    pub const BINFLOAT: u8 = b'G';

    // protocol 2
    pub const PROTO: u8 = 0x80;
    pub const NEWOBJ: u8 = 0x81;
    pub const TUPLE1: u8 = 0x85;
    pub const TUPLE2: u8 = 0x86;
    pub const TUPLE3: u8 = 0x87;
    pub const NEWTRUE: u8 = 0x88;
    pub const NEWFALSE: u8 = 0x89;
    pub const LONG1: u8 = 0x8a;
    pub const LONG4: u8 = 0x8b;

    // protocol 3
    pub const BINBYTES: u8 = b'B';
    pub const SHORT_BINBYTES: u8 = b'C';

    // protocol 4
    pub const SHORT_BINUNICODE: u8 = 0x8c;
    pub const BINUNICODE8: u8 = 0x8d;
    pub const BINBYTES8: u8 = 0x8e;
    pub const STACK_GLOBAL: u8 = 0x93;
    pub const MEMOIZE: u8 = 0x94;
    pub const FRAME: u8 = 0x95;
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one pickled value.
///
/// Decoding stops at the first STOP opcode; any bytes after it are ignored.
pub fn decode(bytes: &[u8]) -> Result<WireValue> {
    Decoder::new(bytes).run()
}

/// Entry on the decoder stack.
///
/// Lists are shared so that a list fetched back from the memo sees items
/// appended after it was memoized, as in the peer's object graph.
#[derive(Debug, Clone)]
enum Node {
    Scalar(WireValue),
    List(Rc<RefCell<Vec<Node>>>),
    Tuple(Rc<Vec<Node>>),

    /// A resolved class reference waiting for REDUCE / NEWOBJ
    Class,
}

impl Node {
    fn list(items: Vec<Node>) -> Self {
        Node::List(Rc::new(RefCell::new(items)))
    }

    fn tuple(items: Vec<Node>) -> Self {
        Node::Tuple(Rc::new(items))
    }

    /// Detach the children of a container nothing else shares
    fn take_children(&mut self) -> Option<Vec<Node>> {
        match self {
            Node::List(items) => Rc::get_mut(items).map(|cell| std::mem::take(cell.get_mut())),
            Node::Tuple(items) => Rc::get_mut(items).map(std::mem::take),
            Node::Scalar(_) | Node::Class => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(value) => value.kind(),
            Node::List(_) => "sequence",
            Node::Tuple(_) => "tuple",
            Node::Class => "class",
        }
    }

    /// Build the value tree; `open` holds the lists currently being converted
    fn to_value(
        &self,
        depth: usize,
        open: &mut Vec<*const RefCell<Vec<Node>>>,
    ) -> Result<WireValue> {
        if depth > MAX_NESTING_DEPTH {
            return Err(JailwatchError::decode(format!(
                "nesting too deep (more than {} levels)",
                MAX_NESTING_DEPTH
            )));
        }
        match self {
            Node::Scalar(value) => Ok(value.clone()),
            Node::Tuple(items) => Ok(WireValue::Tuple(
                items
                    .iter()
                    .map(|item| item.to_value(depth + 1, open))
                    .collect::<Result<_>>()?,
            )),
            Node::List(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return Err(JailwatchError::decode("recursive list"));
                }
                open.push(ptr);
                let values = items
                    .borrow()
                    .iter()
                    .map(|item| item.to_value(depth + 1, open))
                    .collect::<Result<_>>()?;
                open.pop();
                Ok(WireValue::Sequence(values))
            }
            Node::Class => Err(JailwatchError::decode("class reference used as a value")),
        }
    }
}

/// Tears nested containers down with a worklist so deep input cannot
/// exhaust the stack on drop
impl Drop for Node {
    fn drop(&mut self) {
        let Some(mut pending) = self.take_children() else {
            return;
        };
        while let Some(mut node) = pending.pop() {
            if let Some(children) = node.take_children() {
                pending.extend(children);
            }
        }
    }
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    stack: Vec<Node>,
    /// Stack heights recorded by MARK
    marks: Vec<usize>,
    memo: HashMap<u64, Node>,
}

impl<'a> Decoder<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            marks: Vec::new(),
            memo: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<WireValue> {
        loop {
            let offset = self.pos;
            let opcode = self.read_u8()?;

            match opcode {
                op::PROTO => {
                    let version = self.read_u8()?;
                    if version > HIGHEST_PROTOCOL {
                        return Err(JailwatchError::decode(format!(
                            "unsupported pickle protocol {}",
                            version
                        )));
                    }
                }
                op::FRAME => {
                    self.read_bytes(8)?;
                }
                op::STOP => return self.finish(),

                // -------------------------------------------------------------
                // Stack manipulation
                // -------------------------------------------------------------
                op::MARK => self.marks.push(self.stack.len()),
                op::POP => {
                    // POP right after MARK discards the mark instead
                    if self.marks.last() == Some(&self.stack.len()) {
                        self.marks.pop();
                    } else {
                        self.pop()?;
                    }
                }
                op::POP_MARK => {
                    self.pop_mark()?;
                }
                op::DUP => {
                    let top = self.peek()?.clone();
                    self.stack.push(top);
                }

                // -------------------------------------------------------------
                // Scalars
                // -------------------------------------------------------------
                op::NONE => self.push(WireValue::None),
                op::NEWTRUE => self.push(WireValue::Integer(1)),
                op::NEWFALSE => self.push(WireValue::Integer(0)),
                op::INT => {
                    let line = self.read_line()?;
                    let value = match line {
                        b"01" => 1,
                        b"00" => 0,
                        digits => parse_decimal(digits)?,
                    };
                    self.push(WireValue::Integer(value));
                }
                op::LONG => {
                    let line = self.read_line()?;
                    let digits = line.strip_suffix(b"L").unwrap_or(line);
                    let value = parse_decimal(digits)?;
                    self.push(WireValue::Integer(value));
                }
                op::BININT => {
                    let value = i32::from_le_bytes(self.read_array()?);
                    self.push(WireValue::Integer(value.into()));
                }
                op::BININT1 => {
                    let value = self.read_u8()?;
                    self.push(WireValue::Integer(value.into()));
                }
                op::BININT2 => {
                    let value = u16::from_le_bytes(self.read_array()?);
                    self.push(WireValue::Integer(value.into()));
                }
                op::LONG1 => {
                    let len = self.read_u8()? as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::Integer(decode_long(bytes)?));
                }
                op::LONG4 => {
                    let len = self.read_len_i32()?;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::Integer(decode_long(bytes)?));
                }

                // -------------------------------------------------------------
                // Strings
                // -------------------------------------------------------------
                op::STRING => {
                    let line = self.read_line()?;
                    let raw = unquote(line)?;
                    self.push(WireValue::String(bytes_to_string(&raw)));
                }
                op::BINSTRING => {
                    let len = self.read_len_i32()?;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::String(bytes_to_string(bytes)));
                }
                op::SHORT_BINSTRING | op::SHORT_BINBYTES => {
                    let len = self.read_u8()? as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::String(bytes_to_string(bytes)));
                }
                op::BINBYTES => {
                    let len = u32::from_le_bytes(self.read_array()?) as usize;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::String(bytes_to_string(bytes)));
                }
                op::BINBYTES8 => {
                    let len = self.read_len_u64()?;
                    let bytes = self.read_bytes(len)?;
                    self.push(WireValue::String(bytes_to_string(bytes)));
                }
                op::UNICODE => {
                    let line = self.read_line()?;
                    self.push(WireValue::String(raw_unicode_escape(line)?));
                }
                op::SHORT_BINUNICODE => {
                    let len = self.read_u8()? as usize;
                    let text = self.read_utf8(len)?;
                    self.push(WireValue::String(text));
                }
                op::BINUNICODE => {
                    let len = u32::from_le_bytes(self.read_array()?) as usize;
                    let text = self.read_utf8(len)?;
                    self.push(WireValue::String(text));
                }
                op::BINUNICODE8 => {
                    let len = self.read_len_u64()?;
                    let text = self.read_utf8(len)?;
                    self.push(WireValue::String(text));
                }

                // -------------------------------------------------------------
                // Tuples and lists
                // -------------------------------------------------------------
                op::EMPTY_TUPLE => self.stack.push(Node::tuple(Vec::new())),
                op::TUPLE => {
                    let items = self.pop_mark()?;
                    self.stack.push(Node::tuple(items));
                }
                op::TUPLE1 | op::TUPLE2 | op::TUPLE3 => {
                    let arity = (opcode - op::TUPLE1 + 1) as usize;
                    let items = self.pop_many(arity)?;
                    self.stack.push(Node::tuple(items));
                }
                op::EMPTY_LIST => self.stack.push(Node::list(Vec::new())),
                op::LIST => {
                    let items = self.pop_mark()?;
                    self.stack.push(Node::list(items));
                }
                op::APPEND => {
                    let item = self.pop()?;
                    self.top_list()?.borrow_mut().push(item);
                }
                op::APPENDS => {
                    let items = self.pop_mark()?;
                    self.top_list()?.borrow_mut().extend(items);
                }

                // -------------------------------------------------------------
                // Memo
                // -------------------------------------------------------------
                op::PUT => {
                    let line = self.read_line()?;
                    let index = parse_memo_index(line)?;
                    self.memoize(index)?;
                }
                op::BINPUT => {
                    let index = self.read_u8()?.into();
                    self.memoize(index)?;
                }
                op::LONG_BINPUT => {
                    let index = u32::from_le_bytes(self.read_array()?).into();
                    self.memoize(index)?;
                }
                op::MEMOIZE => {
                    let index = self.memo.len() as u64;
                    self.memoize(index)?;
                }
                op::GET => {
                    let line = self.read_line()?;
                    let index = parse_memo_index(line)?;
                    self.recall(index)?;
                }
                op::BINGET => {
                    let index = self.read_u8()?.into();
                    self.recall(index)?;
                }
                op::LONG_BINGET => {
                    let index = u32::from_le_bytes(self.read_array()?).into();
                    self.recall(index)?;
                }

                // -------------------------------------------------------------
                // Class references
                // -------------------------------------------------------------
                op::GLOBAL => {
                    let module = bytes_to_string(self.read_line()?);
                    let name = bytes_to_string(self.read_line()?);
                    self.push_class(module, name)?;
                }
                op::STACK_GLOBAL => {
                    let name = self.pop()?;
                    let module = self.pop()?;
                    match (&module, &name) {
                        (
                            Node::Scalar(WireValue::String(module)),
                            Node::Scalar(WireValue::String(name)),
                        ) => self.push_class(module.clone(), name.clone())?,
                        _ => {
                            return Err(JailwatchError::decode(
                                "STACK_GLOBAL requires module and name strings",
                            ))
                        }
                    }
                }
                op::REDUCE | op::NEWOBJ => {
                    let node = self.pop()?;
                    let args = match &node {
                        Node::Tuple(args) => Rc::clone(args),
                        other => {
                            return Err(JailwatchError::decode(format!(
                                "class call expects an argument tuple, got {}",
                                other.kind()
                            )))
                        }
                    };
                    let callable = self.pop()?;
                    if !matches!(callable, Node::Class) {
                        return Err(JailwatchError::decode(format!(
                            "cannot call a {} value",
                            callable.kind()
                        )));
                    }
                    // str(x) is x for the string values the peer wraps
                    let value = args
                        .first()
                        .cloned()
                        .unwrap_or_else(|| Node::Scalar(WireValue::String(String::new())));
                    self.stack.push(value);
                }

                op::FLOAT | op::BINFLOAT | op::DICT | op::EMPTY_DICT | op::PERSID => {
                    return Err(JailwatchError::decode(format!(
                        "unsupported value opcode {:?} at offset {}",
                        opcode as char, offset
                    )))
                }
                other => {
                    return Err(JailwatchError::decode(format!(
                        "unknown opcode 0x{:02x} at offset {}",
                        other, offset
                    )))
                }
            }
        }
    }

    fn finish(self) -> Result<WireValue> {
        match self.stack.as_slice() {
            [root] => root.to_value(1, &mut Vec::new()),
            stack => Err(JailwatchError::decode(format!(
                "STOP with {} items on the stack",
                stack.len()
            ))),
        }
    }

    // =========================================================================
    // Input helpers
    // =========================================================================

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.input.len());
        match end {
            Some(end) => {
                let input = self.input;
                let bytes = &input[self.pos..end];
                self.pos = end;
                Ok(bytes)
            }
            None => Err(JailwatchError::decode(format!(
                "unexpected end of data: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.input.len() - self.pos
            ))),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }

    fn read_len_i32(&mut self) -> Result<usize> {
        let len = i32::from_le_bytes(self.read_array()?);
        usize::try_from(len)
            .map_err(|_| JailwatchError::decode(format!("negative length {}", len)))
    }

    fn read_len_u64(&mut self) -> Result<usize> {
        let len = u64::from_le_bytes(self.read_array()?);
        usize::try_from(len)
            .map_err(|_| JailwatchError::decode(format!("length {} too large", len)))
    }

    /// Read up to the next newline, excluding it
    fn read_line(&mut self) -> Result<&'a [u8]> {
        let input = self.input;
        let rest = &input[self.pos..];
        match rest.iter().position(|b| *b == b'\n') {
            Some(n) => {
                self.pos += n + 1;
                Ok(&rest[..n])
            }
            None => Err(JailwatchError::decode(format!(
                "unexpected end of data: unterminated line at offset {}",
                self.pos
            ))),
        }
    }

    fn read_utf8(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| JailwatchError::decode(format!("invalid UTF-8 in unicode string: {}", e)))
    }

    // =========================================================================
    // Stack helpers
    // =========================================================================

    fn push(&mut self, value: WireValue) {
        self.stack.push(Node::Scalar(value));
    }

    fn push_class(&mut self, module: String, name: String) -> Result<()> {
        let is_str = matches!(module.as_str(), "builtins" | "__builtin__") && name == "str";
        if !is_str {
            return Err(JailwatchError::UnsupportedType { module, name });
        }
        tracing::trace!("Resolved class reference {}.{}", module, name);
        self.stack.push(Node::Class);
        Ok(())
    }

    /// Pop one node without reaching below the innermost MARK
    fn pop(&mut self) -> Result<Node> {
        let floor = self.marks.last().copied().unwrap_or(0);
        if self.stack.len() <= floor {
            return Err(JailwatchError::decode("stack underflow"));
        }
        self.stack
            .pop()
            .ok_or_else(|| JailwatchError::decode("stack underflow"))
    }

    fn peek(&self) -> Result<&Node> {
        self.stack
            .last()
            .ok_or_else(|| JailwatchError::decode("stack underflow"))
    }

    fn pop_many(&mut self, count: usize) -> Result<Vec<Node>> {
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(self.pop()?);
        }
        nodes.reverse();
        Ok(nodes)
    }

    /// Pop everything above the most recent MARK
    fn pop_mark(&mut self) -> Result<Vec<Node>> {
        let mark = self
            .marks
            .pop()
            .ok_or_else(|| JailwatchError::decode("MARK not found"))?;
        Ok(self.stack.split_off(mark))
    }

    fn top_list(&self) -> Result<&RefCell<Vec<Node>>> {
        match self.stack.last() {
            Some(Node::List(items)) => Ok(&**items),
            Some(other) => Err(JailwatchError::decode(format!(
                "append target is a {}, not a list",
                other.kind()
            ))),
            None => Err(JailwatchError::decode("append without a list on the stack")),
        }
    }

    fn memoize(&mut self, index: u64) -> Result<()> {
        let top = self.peek()?.clone();
        self.memo.insert(index, top);
        Ok(())
    }

    fn recall(&mut self, index: u64) -> Result<()> {
        let node = self
            .memo
            .get(&index)
            .cloned()
            .ok_or_else(|| JailwatchError::decode(format!("memo key {} not found", index)))?;
        self.stack.push(node);
        Ok(())
    }
}

// =============================================================================
// Scalar decoding
// =============================================================================

fn parse_memo_index(line: &[u8]) -> Result<u64> {
    let index = parse_decimal(line)?;
    u64::try_from(index)
        .map_err(|_| JailwatchError::decode(format!("negative memo key {}", index)))
}

fn parse_decimal(digits: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(digits)
        .map_err(|_| JailwatchError::decode("non-ASCII integer literal"))?;
    text.trim().parse::<i64>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => JailwatchError::IntegerOverflow,
        _ => JailwatchError::decode(format!("invalid integer literal {:?}", text)),
    })
}

/// Little-endian two's complement, as written by LONG1 / LONG4
fn decode_long(bytes: &[u8]) -> Result<i64> {
    let Some(last) = bytes.last() else {
        return Ok(0);
    };
    let negative = last & 0x80 != 0;
    let fill = if negative { 0xff } else { 0x00 };

    if bytes.len() > 8 {
        // Wider encodings only fit when the extra bytes are pure sign extension
        let sign_matches = (bytes[7] & 0x80 != 0) == negative;
        if !sign_matches || bytes[8..].iter().any(|b| *b != fill) {
            return Err(JailwatchError::IntegerOverflow);
        }
    }

    let mut buf = [fill; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    Ok(i64::from_le_bytes(buf))
}

/// Byte strings: UTF-8 when valid, Latin-1 otherwise
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|b| *b as char).collect(),
    }
}

/// Strip the quotes of a protocol-0 STRING argument and resolve escapes
fn unquote(line: &[u8]) -> Result<Vec<u8>> {
    let quoted = match line {
        [q @ (b'\'' | b'"'), inner @ .., end] if end == q => inner,
        _ => return Err(JailwatchError::decode("STRING argument is not quoted")),
    };

    let mut out = Vec::with_capacity(quoted.len());
    let mut iter = quoted.iter().copied();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match iter.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'r') => out.push(b'\r'),
            Some(b'x') => {
                let hi = iter.next();
                let lo = iter.next();
                let byte = hi
                    .zip(lo)
                    .and_then(|(h, l)| {
                        let hex = [h, l];
                        std::str::from_utf8(&hex)
                            .ok()
                            .and_then(|s| u8::from_str_radix(s, 16).ok())
                    })
                    .ok_or_else(|| JailwatchError::decode("invalid \\x escape"))?;
                out.push(byte);
            }
            Some(other) => out.push(other),
            None => return Err(JailwatchError::decode("dangling escape in STRING")),
        }
    }
    Ok(out)
}

/// Decode the `raw-unicode-escape` text of a protocol-0 UNICODE argument
fn raw_unicode_escape(line: &[u8]) -> Result<String> {
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < line.len() {
        let b = line[i];
        let width = match (b, line.get(i + 1)) {
            (b'\\', Some(b'u')) => 4,
            (b'\\', Some(b'U')) => 8,
            _ => 0,
        };
        if width == 0 {
            out.push(b as char);
            i += 1;
            continue;
        }

        let hex = line
            .get(i + 2..i + 2 + width)
            .and_then(|h| std::str::from_utf8(h).ok())
            .ok_or_else(|| JailwatchError::decode("truncated unicode escape"))?;
        let ch = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| JailwatchError::decode(format!("invalid unicode escape {}", hex)))?;
        out.push(ch);
        i += 2 + width;
    }
    Ok(out)
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a command as a pickled list of unicode strings
pub fn encode_command<T: AsRef<str>>(tokens: &[T]) -> Vec<u8> {
    let payload: usize = tokens.iter().map(|t| 5 + t.as_ref().len()).sum();
    let mut message = Vec::with_capacity(payload + 7);

    message.extend_from_slice(&[op::PROTO, COMMAND_PROTOCOL, op::EMPTY_LIST]);
    match tokens {
        [] => {}
        [token] => {
            push_unicode(&mut message, token.as_ref());
            message.push(op::APPEND);
        }
        _ => {
            message.push(op::MARK);
            for token in tokens {
                push_unicode(&mut message, token.as_ref());
            }
            message.push(op::APPENDS);
        }
    }
    message.push(op::STOP);

    message
}

fn push_unicode(message: &mut Vec<u8>, token: &str) {
    message.push(op::BINUNICODE);
    message.extend_from_slice(&(token.len() as u32).to_le_bytes());
    message.extend_from_slice(token.as_bytes());
}

/// Write an encoded command to a stream
pub fn write_command<W: Write, T: AsRef<str>>(writer: &mut W, tokens: &[T]) -> Result<()> {
    let bytes = encode_command(tokens);
    writer.write_all(&bytes)?;
    Ok(())
}
