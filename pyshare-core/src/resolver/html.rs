//! Tolerant HTML tokenizer for directory-listing pages
//!
//! Builds a loose element tree good enough to answer one question: for each
//! `<a>`, what is its href and what text follows it inside its container.
//! Malformed markup never fails; unknown constructs degrade to text and
//! unmatched end tags are dropped.

/// Number of following sibling nodes inspected for a size token
pub const SIBLING_WINDOW: usize = 5;

/// An anchor together with the text around it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorContext {
    pub href: Option<String>,
    pub text: String,
    /// Text content of up to `SIBLING_WINDOW` following sibling nodes
    pub siblings: Vec<String>,
    /// Text of the containing element after the anchor
    pub trailing_text: String,
}

/// Extract every anchor in document order
pub fn extract_anchors(html: &str) -> Vec<AnchorContext> {
    let doc = Document::parse(html);
    let mut anchors = Vec::new();

    for (id, node) in doc.nodes.iter().enumerate() {
        let NodeKind::Element { tag, attrs } = &node.kind else {
            continue;
        };
        if tag != "a" {
            continue;
        }

        let href = attrs
            .iter()
            .find(|(name, _)| name == "href")
            .map(|(_, value)| value.clone());

        let following: Vec<usize> = node
            .parent
            .and_then(|p| {
                let children = &doc.nodes[p].children;
                let pos = children.iter().position(|&c| c == id)?;
                Some(children[pos + 1..].to_vec())
            })
            .unwrap_or_default();

        anchors.push(AnchorContext {
            href,
            text: doc.text_content(id).trim().to_string(),
            siblings: following
                .iter()
                .take(SIBLING_WINDOW)
                .map(|&c| doc.text_content(c))
                .collect(),
            trailing_text: following.iter().map(|&c| doc.text_content(c)).collect(),
        });
    }

    anchors
}

#[derive(Debug)]
enum NodeKind {
    Root,
    Element { tag: String, attrs: Vec<(String, String)> },
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug)]
struct Document {
    nodes: Vec<Node>,
}

enum Token {
    Start { tag: String, attrs: Vec<(String, String)>, self_closing: bool },
    End(String),
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// Elements implicitly closed when a sibling of the same family opens
const AUTO_CLOSE: &[(&str, &[&str])] = &[
    ("a", &["a"]),
    ("li", &["li"]),
    ("p", &["p"]),
    ("option", &["option"]),
    ("dt", &["dt", "dd"]),
    ("dd", &["dt", "dd"]),
    ("tr", &["tr", "td", "th"]),
    ("td", &["td", "th"]),
    ("th", &["td", "th"]),
];

/// Auto-close never reaches past these
const SCOPE_BOUNDARIES: &[&str] = &["ul", "ol", "dl", "table", "tbody", "thead", "tfoot", "select", "body", "html"];

impl Document {
    fn parse(html: &str) -> Self {
        let mut doc = Document {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        };
        let mut stack: Vec<usize> = vec![0];

        for token in tokenize(html) {
            match token {
                Token::Text(text) => {
                    let parent = *stack.last().unwrap_or(&0);
                    doc.push(parent, NodeKind::Text(text));
                }
                Token::Start { tag, attrs, self_closing } => {
                    if let Some((_, closes)) = AUTO_CLOSE.iter().find(|(t, _)| *t == tag) {
                        doc.auto_close(&mut stack, closes);
                    }
                    let parent = *stack.last().unwrap_or(&0);
                    let is_void = self_closing || VOID_ELEMENTS.contains(&tag.as_str());
                    let id = doc.push(parent, NodeKind::Element { tag, attrs });
                    if !is_void {
                        stack.push(id);
                    }
                }
                Token::End(tag) => {
                    if let Some(pos) = stack.iter().rposition(|&id| doc.tag(id) == Some(tag.as_str())) {
                        stack.truncate(pos);
                    }
                }
            }
        }

        doc
    }

    fn push(&mut self, parent: usize, kind: NodeKind) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    fn tag(&self, id: usize) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Pop the outermost open element of the same family within scope
    fn auto_close(&self, stack: &mut Vec<usize>, closes: &[&str]) {
        let mut cut = None;
        for pos in (1..stack.len()).rev() {
            let Some(tag) = self.tag(stack[pos]) else { continue };
            if closes.contains(&tag) {
                cut = Some(pos);
            } else if SCOPE_BOUNDARIES.contains(&tag) {
                break;
            }
        }
        if let Some(pos) = cut {
            stack.truncate(pos);
        }
    }

    fn text_content(&self, id: usize) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: usize, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for &child in &self.nodes[id].children {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

fn tokenize(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(decode_entities(rest)));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(decode_entities(&rest[..lt])));
        }
        rest = &rest[lt..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map(|end| &after[end + 3..]).unwrap_or("");
            continue;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            rest = rest.find('>').map(|end| &rest[end + 1..]).unwrap_or("");
            continue;
        }

        let Some((token, consumed)) = parse_tag(rest) else {
            // Stray '<' is plain text
            tokens.push(Token::Text("<".to_string()));
            rest = &rest[1..];
            continue;
        };
        rest = &rest[consumed..];

        let raw_tag = match &token {
            Token::Start { tag, self_closing: false, .. } if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) => {
                Some(tag.clone())
            }
            _ => None,
        };
        tokens.push(token);

        // Script/style bodies are opaque; title/textarea keep their text
        if let Some(tag) = raw_tag {
            let end = find_ascii_case_insensitive(rest, &format!("</{}", tag)).unwrap_or(rest.len());
            let raw = &rest[..end];
            if (tag == "title" || tag == "textarea") && !raw.is_empty() {
                tokens.push(Token::Text(decode_entities(raw)));
            }
            rest = &rest[end..];
        }
    }

    tokens
}

/// Parse a tag at the start of `input` (which begins with '<')
fn parse_tag(input: &str) -> Option<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    let closing = bytes.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-' || bytes[i] == b':') {
        i += 1;
    }
    if i == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }
    let tag = input[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        match bytes.get(i) {
            None => return Some((make_tag(tag, attrs, closing, self_closing), input.len())),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'/') => {
                self_closing = true;
                i += 1;
                continue;
            }
            _ => {}
        }
        self_closing = false;

        let attr_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'>' | b'/') {
            i += 1;
        }
        if i == attr_start {
            // Lone '=' or similar junk
            i += 1;
            continue;
        }
        let name = input[attr_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let start = i + 1;
                    let end = input[start..].find(q as char).map(|e| start + e).unwrap_or(input.len());
                    value = decode_entities(&input[start..end]);
                    i = (end + 1).min(input.len());
                }
                _ => {
                    let start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = decode_entities(&input[start..i]);
                }
            }
        }
        attrs.push((name, value));
    }

    Some((make_tag(tag, attrs, closing, self_closing), i))
}

fn make_tag(tag: String, attrs: Vec<(String, String)>, closing: bool, self_closing: bool) -> Token {
    if closing {
        Token::End(tag)
    } else {
        Token::Start { tag, attrs, self_closing }
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.len() > hay.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

/// Decode the character references directory listings actually emit
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&rest[1..semi + 1]).map(|c| (c, semi + 2)));

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &rest[len..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        _ => return None,
    })
}
