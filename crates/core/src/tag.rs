//! Struct tag lookup using the conventional `key:"value" key2:"value2"` layout.

/// Value stored under `key`, unquoted. A malformed remainder ends the scan,
/// so keys after a syntax error are never found.
pub fn lookup(tag: &str, key: &str) -> Option<String> {
    let bytes = tag.as_bytes();
    let mut rest = 0usize;
    while rest < bytes.len() {
        // skip leading space
        let mut i = rest;
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len()
            && bytes[i] > b' '
            && bytes[i] != b':'
            && bytes[i] != b'"'
            && bytes[i] != 0x7f
        {
            i += 1;
        }
        if i == name_start || i + 1 >= bytes.len() || bytes[i] != b':' || bytes[i + 1] != b'"' {
            return None;
        }
        let name = &tag[name_start..i];

        // scan the quoted value
        let value_start = i + 1;
        let mut j = value_start + 1;
        while j < bytes.len() && bytes[j] != b'"' {
            if bytes[j] == b'\\' {
                j += 1;
            }
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        let quoted = &tag[value_start + 1..j];
        rest = j + 1;

        if name == key {
            return unquote(quoted);
        }
    }
    None
}

/// First comma-separated part of the value under `key`; `-` and empty
/// values count as absent.
pub fn tag_value(tag: &str, key: &str) -> Option<String> {
    if tag.is_empty() {
        return None;
    }
    let value = lookup(tag, key)?;
    let first = value.split(',').next().unwrap_or_default();
    if first.is_empty() || first == "-" {
        None
    } else {
        Some(first.to_string())
    }
}

fn unquote(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                let code = u8::from_str_radix(&hex, 16).ok()?;
                out.push(char::from(code));
            }
            _ => return None,
        }
    }
    Some(out)
}
