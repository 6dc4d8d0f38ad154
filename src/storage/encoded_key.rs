use crate::catalog::{EntityKind, KeyId, KeyPart};

const ID_INT: u8 = 0x10;
const ID_NAME: u8 = 0x14;

/// Encodes a key path into bytes whose lexicographic order matches the
/// derived order of the path.
pub fn encode_path(path: &[KeyPart]) -> Vec<u8> {
    let mut out = Vec::with_capacity(path.len() * 16);
    for part in path {
        out.push(part.kind.tag());
        match &part.id {
            KeyId::Int(id) => {
                out.push(ID_INT);
                out.extend_from_slice(&id.to_be_bytes());
            }
            KeyId::Name(name) => {
                out.push(ID_NAME);
                append_text(name, &mut out);
            }
        }
    }
    out
}

pub fn decode_path(bytes: &[u8]) -> Option<Vec<KeyPart>> {
    let mut path = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let kind = EntityKind::from_tag(bytes[pos])?;
        pos += 1;
        let id = match *bytes.get(pos)? {
            ID_INT => {
                let raw: [u8; 8] = bytes.get(pos + 1..pos + 9)?.try_into().ok()?;
                pos += 9;
                KeyId::Int(u64::from_be_bytes(raw))
            }
            ID_NAME => {
                let (name, consumed) = read_text(&bytes[pos + 1..])?;
                pos += 1 + consumed;
                KeyId::Name(name)
            }
            _ => return None,
        };
        path.push(KeyPart { kind, id });
    }
    Some(path)
}

fn append_text(s: &str, out: &mut Vec<u8>) {
    for byte in s.as_bytes() {
        if *byte == 0 {
            // Escape interior nulls so terminator remains unambiguous.
            out.extend_from_slice(&[0x00, 0xFF]);
        } else {
            out.push(*byte);
        }
    }
    out.push(0x00);
}

fn read_text(bytes: &[u8]) -> Option<(String, usize)> {
    let mut raw = Vec::new();
    let mut pos = 0;
    loop {
        match *bytes.get(pos)? {
            0x00 if bytes.get(pos + 1) == Some(&0xFF) => {
                raw.push(0x00);
                pos += 2;
            }
            0x00 => {
                pos += 1;
                break;
            }
            byte => {
                raw.push(byte);
                pos += 1;
            }
        }
    }
    String::from_utf8(raw).ok().map(|s| (s, pos))
}
