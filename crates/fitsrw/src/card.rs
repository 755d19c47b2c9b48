//! Header card parsing and serialization.
//!
//! A card is one 80-byte keyword record: an 8-byte name, a `= ` value
//! indicator, and a value field with an optional ` / ` comment. String
//! values longer than one card spill into `CONTINUE` records.

use num_bigint::BigInt;

use crate::block::CARD_SIZE;
use crate::error::{Error, Result};

/// A parsed FITS header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Logical value (`T` or `F`).
    Bool(bool),
    /// Integer value. All integer widths normalise to `i64` on construction.
    Int(i64),
    /// Integer value too large for 64 bits.
    Big(BigInt),
    /// Floating-point value. `f32` normalises to `f64` on construction.
    Float(f64),
    /// Complex value `(real, imaginary)`; single-precision pairs normalise
    /// to double.
    Complex(f64, f64),
    /// Character string (content between single quotes).
    Str(String),
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(v as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, usize);

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Big(BigInt::from(v)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<(f32, f32)> for Value {
    fn from(v: (f32, f32)) -> Self {
        Value::Complex(v.0 as f64, v.1 as f64)
    }
}

impl From<(f64, f64)> for Value {
    fn from(v: (f64, f64)) -> Self {
        Value::Complex(v.0, v.1)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<BigInt> for Value {
    fn from(v: BigInt) -> Self {
        Value::Big(v)
    }
}

impl Value {
    /// Return the integer content, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Return the float content; integers convert.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Return the string content, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Return the logical content, if this value is a logical.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// One record block in a [`Header`](crate::header::Header).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Card {
    /// Keyword name: up to 8 characters of `A-Z 0-9 - _`, trailing blanks
    /// permitted. `COMMENT`, `HISTORY`, the blank name, `END` and
    /// `CONTINUE` are directives rather than values.
    pub name: String,
    /// The card value; `None` is the undefined value.
    pub value: Option<Value>,
    /// Free-form comment. Holds the whole body for commentary keywords.
    pub comment: String,
}

impl Card {
    /// Create a card with a value and comment.
    pub fn new(name: &str, value: impl Into<Value>, comment: &str) -> Card {
        Card {
            name: name.into(),
            value: Some(value.into()),
            comment: comment.into(),
        }
    }

    /// Create a card with an undefined value.
    pub fn undefined(name: &str, comment: &str) -> Card {
        Card {
            name: name.into(),
            value: None,
            comment: comment.into(),
        }
    }

    /// Create a `COMMENT` card.
    pub fn comment(text: &str) -> Card {
        Card {
            name: "COMMENT".into(),
            value: None,
            comment: text.into(),
        }
    }

    /// Create a `HISTORY` card.
    pub fn history(text: &str) -> Card {
        Card {
            name: "HISTORY".into(),
            value: None,
            comment: text.into(),
        }
    }

    /// Returns `true` for the free-form names whose duplicates are allowed:
    /// `COMMENT`, `HISTORY` and the blank name.
    pub fn is_commentary(&self) -> bool {
        matches!(self.name.as_str(), "COMMENT" | "HISTORY" | "")
    }
}

/// Verify a card name conforms to the standard: at most 8 characters of
/// capital letters, digits, minus or underscore, with trailing spaces
/// permitted but embedded spaces rejected.
pub(crate) fn verify_card_name(name: &str) -> Result<()> {
    if name.len() > 8 {
        return Err(Error::MalformedCard(format!(
            "card name longer than 8 characters: {name:?}"
        )));
    }
    let mut spaces = false;
    for c in name.chars() {
        match c {
            'A'..='Z' | '0'..='9' | '-' | '_' => {
                if spaces {
                    return Err(Error::MalformedCard(format!(
                        "card name contains embedded space(s): {name:?}"
                    )));
                }
            }
            ' ' => spaces = true,
            _ => {
                return Err(Error::MalformedCard(format!(
                    "card name contains illegal character in {name:?}"
                )));
            }
        }
    }
    Ok(())
}

// ── Parsing ──

/// Collect a quoted string value using a three-state machine that folds
/// doubled single-quotes into literal quotes. Returns the string (with
/// trailing blanks trimmed) and the number of bytes consumed.
pub(crate) fn process_string(s: &[u8]) -> Result<(String, usize)> {
    let mut buf = String::new();
    // 0: expecting the opening quote; 1: inside the string; 2: saw a quote.
    let mut state = 0u8;
    for (i, &b) in s.iter().enumerate() {
        let quote = b == b'\'';
        match state {
            0 => {
                if !quote {
                    return Err(Error::MalformedCard(format!(
                        "string does not start with a quote ({:?})",
                        String::from_utf8_lossy(s)
                    )));
                }
                state = 1;
            }
            1 => {
                if quote {
                    state = 2;
                } else {
                    buf.push(b as char);
                }
            }
            _ => {
                if quote {
                    buf.push('\'');
                    state = 1;
                } else {
                    return Ok((buf.trim_end_matches(' ').into(), i));
                }
            }
        }
    }
    if s.last() == Some(&b'\'') && state == 2 {
        return Ok((buf.trim_end_matches(' ').into(), s.len()));
    }
    Err(Error::MalformedCard(format!(
        "string ends prematurely ({:?})",
        String::from_utf8_lossy(s)
    )))
}

fn parse_float_text(s: &str) -> Option<f64> {
    let normalized = s.replacen('D', "E", 1).replacen('d', "e", 1);
    normalized.parse::<f64>().ok()
}

fn trimmed(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().into()
}

/// Comment of a card that carries no value indicator. A leading ` / `
/// separator is stripped so emitted undefined-value cards parse back to
/// their original comment.
fn valueless_comment(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.find(" /") {
        Some(idx) => text[idx + 2..].trim().into(),
        None => text.trim().into(),
    }
}

/// Parse one 80-byte line from a header block into a [`Card`].
pub fn parse_card_line(line: &[u8]) -> Result<Card> {
    if line.len() != CARD_SIZE {
        return Err(Error::MalformedCard(format!(
            "header line is {} bytes, expected {CARD_SIZE}",
            line.len()
        )));
    }

    let mut card = Card::default();

    // Commentary and directive keywords reserve the whole body.
    if line.starts_with(b"COMMENT ") {
        card.name = "COMMENT".into();
        card.comment = trimmed(&line[8..]);
        return Ok(card);
    }
    if line.starts_with(b"HISTORY ") {
        card.name = "HISTORY".into();
        card.comment = trimmed(&line[8..]);
        return Ok(card);
    }
    if line.starts_with(b"END     ") {
        card.name = "END".into();
        return Ok(card);
    }
    if line.starts_with(b"CONTINUE") {
        card.name = "CONTINUE".into();
        let body = &line[8..];
        let start = body.iter().position(|&b| b != b' ').unwrap_or(0);
        let (value, _) = process_string(&body[start..])?;
        card.comment = value;
        return Ok(card);
    }
    if line.starts_with(b"        ") {
        card.comment = trimmed(&line[8..]);
        return Ok(card);
    }

    let name = String::from_utf8_lossy(&line[..8]).trim_end().to_string();
    verify_card_name(&name)?;
    card.name = name;

    if &line[8..10] != b"= " {
        // No value indicator: the body is a comment.
        card.comment = valueless_comment(&line[8..]);
        return Ok(card);
    }

    // Skip leading blanks of the value field.
    let valpos = 10;
    let nblanks = line[valpos..].iter().take_while(|&&b| b == b' ').count();
    if valpos + nblanks == CARD_SIZE {
        // Absent value string: the keyword value is undefined.
        return Ok(card);
    }

    let mut i = valpos + nblanks;
    match line[i] {
        b'/' => {
            // Undefined value; leave `i` on the slash so the comment scan
            // below picks up the text after it.
        }
        b'\'' => {
            let (s, consumed) = process_string(&line[i..])?;
            card.value = Some(Value::Str(s));
            i += consumed;
        }
        b'(' => {
            let close = line[i..]
                .iter()
                .position(|&b| b == b')')
                .ok_or_else(|| {
                    Error::MalformedCard(format!(
                        "complex value missing closing ')' ({:?})",
                        String::from_utf8_lossy(line)
                    ))
                })?;
            let inner = String::from_utf8_lossy(&line[i + 1..i + close]).to_string();
            let comma = inner.find(',').ok_or_else(|| {
                Error::MalformedCard(format!("complex value missing ',' ({inner:?})"))
            })?;
            let re = parse_float_text(inner[..comma].trim());
            let im = parse_float_text(inner[comma + 1..].trim());
            match (re, im) {
                (Some(re), Some(im)) => card.value = Some(Value::Complex(re, im)),
                _ => {
                    return Err(Error::MalformedCard(format!(
                        "unparseable complex value ({inner:?})"
                    )));
                }
            }
            i += close + 1;
        }
        first => {
            // Integer, float or logical value string.
            let rest = &line[i..];
            let end = rest
                .windows(2)
                .position(|w| w == b" /")
                .unwrap_or(rest.len());
            let token = String::from_utf8_lossy(&rest[..end]).trim().to_string();
            i += end;

            if first.is_ascii_digit() || first == b'+' || first == b'-' {
                if token.contains(['.', 'D', 'E', 'd', 'e']) {
                    let f = parse_float_text(&token).ok_or_else(|| {
                        Error::MalformedCard(format!("unparseable float value ({token:?})"))
                    })?;
                    card.value = Some(Value::Float(f));
                } else {
                    match token.parse::<i64>() {
                        Ok(n) => card.value = Some(Value::Int(n)),
                        Err(_) => {
                            let big = token.parse::<BigInt>().map_err(|_| {
                                Error::MalformedCard(format!(
                                    "unparseable integer value ({token:?})"
                                ))
                            })?;
                            card.value = Some(Value::Big(big));
                        }
                    }
                }
            } else if first == b'T' {
                card.value = Some(Value::Bool(true));
            } else if first == b'F' {
                card.value = Some(Value::Bool(false));
            } else {
                return Err(Error::MalformedCard(format!(
                    "invalid card line ({:?})",
                    String::from_utf8_lossy(line)
                )));
            }
        }
    }

    if let Some(idx) = line[i..].iter().position(|&b| b == b'/') {
        card.comment = String::from_utf8_lossy(&line[i + idx + 1..])
            .trim()
            .to_string();
    }

    Ok(card)
}

// ── Writing ──

/// Format a float so that it fits in `max_len` bytes, reducing precision
/// as needed. The result always parses back as a float.
fn format_float(f: f64, max_len: usize) -> String {
    if f == 0.0 {
        return "0.0".into();
    }
    let mut precision = 15usize;
    loop {
        let s = format!("{f:.precision$E}");
        if s.len() <= max_len || precision == 0 {
            return s;
        }
        precision -= 1;
    }
}

/// Escape a string value into quote-pair units: each unit is either one
/// ordinary byte or the two bytes of a doubled quote. CONTINUE splitting
/// works in units so a doubled quote never straddles a card boundary.
fn escape_units(s: &str) -> Vec<Vec<u8>> {
    let mut units = Vec::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b == b'\'' {
            units.push(vec![b'\'', b'\'']);
        } else {
            units.push(vec![b]);
        }
    }
    units
}

/// Take units from `units[*pos..]` up to `max` bytes, advancing `pos`.
fn take_units(units: &[Vec<u8>], pos: &mut usize, max: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(max);
    while *pos < units.len() && out.len() + units[*pos].len() <= max {
        out.extend_from_slice(&units[*pos]);
        *pos += 1;
    }
    out
}

fn quoted(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 2);
    out.push(b'\'');
    out.extend_from_slice(content);
    while out.len() < 9 {
        out.push(b' ');
    }
    out.push(b'\'');
    out
}

fn pad_to_card(buf: &mut Vec<u8>) {
    let rem = (CARD_SIZE - buf.len() % CARD_SIZE) % CARD_SIZE;
    buf.extend(std::iter::repeat_n(b' ', rem));
}

fn push_left(buf: &mut Vec<u8>, bytes: &[u8], min_width: usize) {
    buf.extend_from_slice(bytes);
    if bytes.len() < min_width {
        buf.extend(std::iter::repeat_n(b' ', min_width - bytes.len()));
    }
}

fn push_right(buf: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    if bytes.len() < width {
        buf.extend(std::iter::repeat_n(b' ', width - bytes.len()));
    }
    buf.extend_from_slice(bytes);
}

/// Serialize a string value into the line buffer, spilling over-long
/// values into ampersand-terminated `CONTINUE` records.
fn write_string_value(buf: &mut Vec<u8>, s: &str) {
    let units = escape_units(s);
    let total: usize = units.iter().map(Vec::len).sum();

    // '' plus content must fit the remaining 70 bytes of the first card.
    if total + 2 <= CARD_SIZE - 10 {
        let mut content = Vec::with_capacity(total);
        for u in &units {
            content.extend_from_slice(u);
        }
        let v = if s.is_empty() {
            b"''".to_vec()
        } else {
            quoted(&content)
        };
        push_left(buf, &v, 20);
        return;
    }

    // First fragment: leave room for the ampersand and both quotes.
    let mut pos = 0usize;
    let first_max = CARD_SIZE - 10 - 1 - 2;
    let mut frag = take_units(&units, &mut pos, first_max);
    frag.push(b'&');
    push_left(buf, &quoted(&frag), 20);
    pad_to_card(buf);

    let cont_max = CARD_SIZE - 8 - 2 - 1 - 2;
    while pos < units.len() {
        let mut frag = take_units(&units, &mut pos, cont_max);
        if pos < units.len() {
            frag.push(b'&');
        }
        buf.extend_from_slice(b"CONTINUE  ");
        push_left(buf, &quoted(&frag), 20);
        pad_to_card(buf);
    }
}

/// Serialize a [`Card`] into one or more 80-byte lines.
pub fn make_card_lines(card: &Card) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(CARD_SIZE);

    match card.name.as_str() {
        "" | "COMMENT" | "HISTORY" => {
            let text = card.comment.as_bytes();
            for chunk in text.chunks(72) {
                push_left(&mut buf, card.name.as_bytes(), 8);
                push_left(&mut buf, chunk, 72);
            }
            return Ok(buf);
        }
        "END" => {
            push_left(&mut buf, b"END", CARD_SIZE);
            return Ok(buf);
        }
        _ => {}
    }

    verify_card_name(&card.name)?;
    push_left(&mut buf, card.name.as_bytes(), 8);

    let Some(value) = &card.value else {
        buf.extend_from_slice(b"  ");
        if !card.comment.is_empty() {
            let comment = format!(" / {}", card.comment);
            let max = comment.len().min(CARD_SIZE - buf.len());
            buf.extend_from_slice(&comment.as_bytes()[..max]);
        }
        pad_to_card(&mut buf);
        return Ok(buf);
    };

    buf.extend_from_slice(b"= ");

    match value {
        Value::Str(s) => write_string_value(&mut buf, s),
        Value::Bool(b) => push_right(&mut buf, if *b { "T" } else { "F" }, 20),
        Value::Int(n) => push_right(&mut buf, &n.to_string(), 20),
        Value::Float(f) => push_right(&mut buf, &format_float(*f, 20), 20),
        Value::Complex(re, im) => {
            let s = format!("({}, {})", format_float(*re, 20), format_float(*im, 20));
            push_right(&mut buf, &s, 20);
        }
        Value::Big(n) => buf.extend_from_slice(n.to_string().as_bytes()),
    }

    if !card.comment.is_empty() {
        let comment = format!(" / {}", card.comment);
        let line_used = buf.len() % CARD_SIZE;
        let spilled = buf.len() >= CARD_SIZE && line_used == 0;
        if spilled || comment.len() > CARD_SIZE - line_used {
            // Comment does not fit after the value: emit a COMMENT card.
            pad_to_card(&mut buf);
            let comline = make_card_lines(&Card::comment(&card.comment))?;
            buf.extend_from_slice(&comline);
        } else {
            buf.extend_from_slice(comment.as_bytes());
        }
    }

    pad_to_card(&mut buf);
    Ok(buf)
}
