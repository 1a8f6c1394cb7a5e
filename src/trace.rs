use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, bail};

/// Kind of memory reference recorded in a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    DataLoad,
    DataStore,
    InstructionLoad,
}

impl AccessKind {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(AccessKind::DataLoad),
            1 => Some(AccessKind::DataStore),
            2 => Some(AccessKind::InstructionLoad),
            _ => None,
        }
    }

    pub fn request(self) -> Request {
        match self {
            AccessKind::DataLoad | AccessKind::InstructionLoad => Request::Read,
            AccessKind::DataStore => Request::Write,
        }
    }
}

/// What an access asks of the cache once loads are folded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Read,
    Write,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Read => write!(f, "R"),
            Request::Write => write!(f, "W"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceAccess {
    pub core: usize,
    pub kind: AccessKind,
    pub address: u64,
}

#[derive(Debug, Clone)]
pub struct TraceFile {
    pub name: String,
    pub entries: Vec<TraceAccess>,
}

impl TraceFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(BufReader::new(file), name)
    }

    /// Parses `core type address` records, one per line.
    pub fn parse(reader: impl BufRead, name: impl Into<String>) -> Result<Self> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read line from trace")?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let mut parts = trimmed.split_whitespace();
            let core = parts
                .next()
                .with_context(|| format!("Trace line {} missing core id", idx + 1))?;
            let code = parts
                .next()
                .with_context(|| format!("Trace line {} missing access type", idx + 1))?;
            let addr = parts
                .next()
                .with_context(|| format!("Trace line {} missing address", idx + 1))?;
            if parts.next().is_some() {
                bail!("Trace line {} has extra tokens", idx + 1);
            }
            let core = core
                .parse::<usize>()
                .with_context(|| format!("Trace line {}: invalid core id '{}'", idx + 1, core))?;
            let kind = match code.parse::<u32>().ok().and_then(AccessKind::from_code) {
                Some(kind) => kind,
                None => bail!("Trace line {} has invalid access type '{}'", idx + 1, code),
            };
            let address = parse_address(addr).with_context(|| {
                format!("Trace line {}: invalid address literal '{}'", idx + 1, addr)
            })?;
            entries.push(TraceAccess {
                core,
                kind,
                address,
            });
        }
        Ok(Self {
            name: name.into(),
            entries,
        })
    }

    /// Highest core id referenced plus one.
    pub fn cores_used(&self) -> usize {
        self.entries.iter().map(|e| e.core + 1).max().unwrap_or(0)
    }
}

fn parse_address(token: &str) -> io::Result<u64> {
    let hex = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u64::from_str_radix(hex, 16).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
