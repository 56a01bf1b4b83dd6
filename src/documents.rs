//! Document processing used by ledger clients: content hashing, detached
//! signing, symmetric encryption and owner tagging of XML documents.
//!
//! The ledger never looks inside documents. Clients hash a processed document
//! here and submit the digest as a record's `content_hash`.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::Signature;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::{Keypair, SIGNATURE_LEN};
use crate::error::DocumentError;
use crate::hasher::hash_concat;

const NONCE_LEN: usize = 12;

/// 256-bit symmetric key for document encryption.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentKey([u8; 32]);

impl DocumentKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        DocumentKey(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, DocumentError> {
        let raw = hex::decode(s.trim()).map_err(|_| DocumentError::InvalidKey)?;
        let bytes = <[u8; 32]>::try_from(raw.as_slice()).map_err(|_| DocumentError::InvalidKey)?;
        Ok(DocumentKey(bytes))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocumentKey(<redacted>)")
    }
}

/// Capabilities the ledger's clients rely on to prepare documents.
pub trait DocumentProcessor: Send + Sync {
    /// Hex digest of the raw bytes.
    fn hash(&self, data: &[u8]) -> String;

    fn verify_hash(&self, data: &[u8], digest: &str) -> bool {
        self.hash(data).eq_ignore_ascii_case(digest.trim())
    }

    /// Returns `data` with a signature attached.
    fn sign(&self, data: &[u8]) -> Vec<u8>;

    /// Checks a payload produced by [`DocumentProcessor::sign`].
    fn verify_signature(&self, signed: &[u8]) -> bool;

    fn generate_key(&self) -> DocumentKey;

    fn encrypt(&self, data: &[u8], key: &DocumentKey) -> Result<Vec<u8>, DocumentError>;

    fn decrypt(&self, data: &[u8], key: &DocumentKey) -> Result<Vec<u8>, DocumentError>;

    /// Appends an owner element to the document root.
    fn set_owner(&self, data: &[u8], owner: &str) -> Result<Vec<u8>, DocumentError>;

    fn change_owner(&self, data: &[u8], new_owner: &str) -> Result<Vec<u8>, DocumentError>;

    fn read_owner(&self, data: &[u8]) -> Result<String, DocumentError>;

    fn remove_owner(&self, data: &[u8]) -> Result<Vec<u8>, DocumentError>;

    /// Hex-encoded public half of the signing key.
    fn public_key_hex(&self) -> String;
}

/// In-process implementation: SHA-256, Ed25519, ChaCha20-Poly1305.
#[derive(Debug)]
pub struct LocalProcessor {
    keypair: Keypair,
}

impl LocalProcessor {
    pub fn new(keypair: Keypair) -> Self {
        LocalProcessor { keypair }
    }
}

impl DocumentProcessor for LocalProcessor {
    fn hash(&self, data: &[u8]) -> String {
        hash_concat(&[data])
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        let sig = self.keypair.sign(data);
        let mut out = Vec::with_capacity(data.len() + SIGNATURE_LEN);
        out.extend_from_slice(data);
        out.extend_from_slice(&sig.to_bytes());
        out
    }

    fn verify_signature(&self, signed: &[u8]) -> bool {
        let Some(split) = signed.len().checked_sub(SIGNATURE_LEN) else {
            return false;
        };
        let (payload, sig) = signed.split_at(split);
        let Ok(sig) = <[u8; SIGNATURE_LEN]>::try_from(sig) else {
            return false;
        };
        self.keypair.verify(payload, &Signature::from_bytes(&sig))
    }

    fn generate_key(&self) -> DocumentKey {
        DocumentKey::generate()
    }

    fn encrypt(&self, data: &[u8], key: &DocumentKey) -> Result<Vec<u8>, DocumentError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), data)
            .map_err(|_| DocumentError::EncryptionFailed)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, data: &[u8], key: &DocumentKey) -> Result<Vec<u8>, DocumentError> {
        if data.len() < NONCE_LEN {
            return Err(DocumentError::DecryptionFailed);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&key.0));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| DocumentError::DecryptionFailed)
    }

    fn set_owner(&self, data: &[u8], owner: &str) -> Result<Vec<u8>, DocumentError> {
        set_owner(data, owner)
    }

    fn change_owner(&self, data: &[u8], new_owner: &str) -> Result<Vec<u8>, DocumentError> {
        change_owner(data, new_owner)
    }

    fn read_owner(&self, data: &[u8]) -> Result<String, DocumentError> {
        read_owner(data)
    }

    fn remove_owner(&self, data: &[u8]) -> Result<Vec<u8>, DocumentError> {
        remove_owner(data)
    }

    fn public_key_hex(&self) -> String {
        self.keypair.public_hex()
    }
}

const OWNER_TAG: &str = "owner";

// Owner operations act on the first `<owner>` element that is a direct child
// of the document root. Everything else is streamed through unchanged.

fn malformed(e: impl std::fmt::Display) -> DocumentError {
    DocumentError::MalformedDocument(e.to_string())
}

fn reader(data: &[u8]) -> Result<Reader<&[u8]>, DocumentError> {
    let text = std::str::from_utf8(data).map_err(malformed)?;
    Ok(Reader::from_str(text))
}

fn is_owner(e: &BytesStart) -> bool {
    e.name().as_ref() == OWNER_TAG.as_bytes()
}

/// Element depth after `event`; children of the root sit at depth 1.
fn step(event: &Event, depth: &mut usize) {
    match event {
        Event::Start(_) => *depth += 1,
        Event::End(_) => *depth = depth.saturating_sub(1),
        _ => {}
    }
}

/// Consume events up to and including the end tag of an element whose start
/// tag was just read.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), DocumentError> {
    let mut depth = 1usize;
    while depth > 0 {
        match reader.read_event().map_err(malformed)? {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(malformed("unclosed owner element")),
            _ => {}
        }
    }
    Ok(())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event) -> Result<(), DocumentError> {
    writer.write_event(event).map_err(malformed)
}

/// Writes `<start>owner</start>`, keeping the start tag's attributes.
fn write_owner(
    writer: &mut Writer<Vec<u8>>,
    start: BytesStart,
    owner: &str,
) -> Result<(), DocumentError> {
    let end = start.to_end().into_owned();
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(owner)))?;
    write(writer, Event::End(end))
}

pub fn set_owner(data: &[u8], owner: &str) -> Result<Vec<u8>, DocumentError> {
    let mut reader = reader(data)?;
    let mut writer = Writer::new(Vec::with_capacity(data.len() + owner.len() + 16));
    let mut depth = 0usize;
    let mut placed = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => break,
            Event::End(end) if depth == 1 && !placed => {
                write_owner(&mut writer, BytesStart::new(OWNER_TAG), owner)?;
                write(&mut writer, Event::End(end))?;
                depth = 0;
                placed = true;
            }
            Event::Empty(root) if depth == 0 && !placed => {
                let end = root.to_end().into_owned();
                write(&mut writer, Event::Start(root))?;
                write_owner(&mut writer, BytesStart::new(OWNER_TAG), owner)?;
                write(&mut writer, Event::End(end))?;
                placed = true;
            }
            event => {
                step(&event, &mut depth);
                write(&mut writer, event)?;
            }
        }
    }
    if !placed {
        return Err(malformed("no root element"));
    }
    Ok(writer.into_inner())
}

pub fn change_owner(data: &[u8], new_owner: &str) -> Result<Vec<u8>, DocumentError> {
    let mut reader = reader(data)?;
    let mut writer = Writer::new(Vec::with_capacity(data.len() + new_owner.len()));
    let mut depth = 0usize;
    let mut found = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => break,
            Event::Start(e) if depth == 1 && !found && is_owner(&e) => {
                skip_element(&mut reader)?;
                write_owner(&mut writer, e, new_owner)?;
                found = true;
            }
            Event::Empty(e) if depth == 1 && !found && is_owner(&e) => {
                write_owner(&mut writer, e, new_owner)?;
                found = true;
            }
            event => {
                step(&event, &mut depth);
                write(&mut writer, event)?;
            }
        }
    }
    if !found {
        return Err(DocumentError::OwnerFieldMissing);
    }
    Ok(writer.into_inner())
}

pub fn read_owner(data: &[u8]) -> Result<String, DocumentError> {
    let mut reader = reader(data)?;
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => return Err(DocumentError::OwnerFieldMissing),
            Event::Start(e) if depth == 1 && is_owner(&e) => return owner_text(&mut reader),
            Event::Empty(e) if depth == 1 && is_owner(&e) => return Ok(String::new()),
            event => step(&event, &mut depth),
        }
    }
}

/// Text content of the owner element up to its first child or end tag.
fn owner_text(reader: &mut Reader<&[u8]>) -> Result<String, DocumentError> {
    let mut text = String::new();
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(malformed)?),
            Event::CData(c) => text.push_str(std::str::from_utf8(&c).map_err(malformed)?),
            Event::Eof => return Err(malformed("unclosed owner element")),
            _ => return Ok(text),
        }
    }
}

pub fn remove_owner(data: &[u8]) -> Result<Vec<u8>, DocumentError> {
    let mut reader = reader(data)?;
    let mut writer = Writer::new(Vec::with_capacity(data.len()));
    let mut depth = 0usize;
    let mut found = false;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => break,
            Event::Start(e) if depth == 1 && !found && is_owner(&e) => {
                skip_element(&mut reader)?;
                found = true;
            }
            Event::Empty(e) if depth == 1 && !found && is_owner(&e) => found = true,
            event => {
                step(&event, &mut depth);
                write(&mut writer, event)?;
            }
        }
    }
    if !found {
        return Err(DocumentError::OwnerFieldMissing);
    }
    Ok(writer.into_inner())
}
