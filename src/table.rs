// A table file holds one record per line, `<key>:<step> <step> ...\n`, every
// line padded to the same byte width and the lines sorted by the bytes of the
// key. Record `i` therefore starts at byte `i * width` and a key can be found
// with a binary search that only reads the key part of each probed record.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::info;
use rayon::prelude::*;

use crate::error::{Result, SearchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: String,
    pub steps: Vec<String>,
}

impl Record {
    pub fn parse(line: &str) -> Option<Record> {
        let (key, steps) = line.trim_end().split_once(':')?;
        Some(Record {
            key: key.to_owned(),
            steps: steps.split_whitespace().map(str::to_owned).collect(),
        })
    }

    // A leading numeric token is the cost itself (compacted tables), otherwise
    // the cost is the number of steps.
    pub fn cost(&self) -> u32 {
        match self.steps.first().and_then(|s| s.parse::<u32>().ok()) {
            Some(cost) => cost,
            None => self.steps.len() as u32,
        }
    }
}

pub fn table_desc(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let name = name.strip_prefix("lookup-table-").unwrap_or(&name);
    name.strip_suffix(".txt").unwrap_or(name).to_owned()
}

pub struct SortedTable {
    desc: String,
    path: PathBuf,
    linecount: u64,
    width: u64,
    key_width: usize,
    file: Option<RefCell<File>>,
    // never evicted: one table serves one stage, whose reachable keys are bounded
    cache: RefCell<HashMap<String, Option<Vec<String>>>>,
    preloaded: Cell<bool>,
    seek_calls: Cell<u64>,
}

impl SortedTable {
    pub fn open<P: AsRef<Path>>(path: P, linecount: u64) -> Result<SortedTable> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SearchError::TableMissing { path });
        }
        let malformed = |reason: String| SearchError::MalformedTable { path: path.clone(), reason };

        // Find the record width and key width from the first line
        let mut first_line = String::new();
        BufReader::new(File::open(&path)?).read_line(&mut first_line)?;
        if !first_line.ends_with('\n') {
            return Err(malformed("first record is not newline terminated".to_owned()));
        }
        let key_width = first_line
            .find(':')
            .ok_or_else(|| malformed("first record has no ':' delimiter".to_owned()))?;
        let width = first_line.len() as u64;

        let file_len = std::fs::metadata(&path)?.len();
        if file_len % width != 0 {
            return Err(malformed(format!("{} bytes is not a multiple of the record width {}", file_len, width)));
        }
        if file_len / width != linecount {
            return Err(malformed(format!("expected {} records, found {}", linecount, file_len / width)));
        }

        Ok(SortedTable {
            desc: table_desc(&path),
            file: Some(RefCell::new(File::open(&path)?)),
            path,
            linecount,
            width,
            key_width,
            cache: RefCell::new(HashMap::new()),
            preloaded: Cell::new(false),
            seek_calls: Cell::new(0),
        })
    }

    pub fn empty(desc: &str) -> SortedTable {
        SortedTable {
            desc: desc.to_owned(),
            path: PathBuf::new(),
            linecount: 0,
            width: 0,
            key_width: 0,
            file: None,
            cache: RefCell::new(HashMap::new()),
            preloaded: Cell::new(false),
            seek_calls: Cell::new(0),
        }
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn linecount(&self) -> u64 {
        self.linecount
    }

    pub fn key_width(&self) -> usize {
        self.key_width
    }

    pub fn seek_calls(&self) -> u64 {
        self.seek_calls.get()
    }

    pub fn reset_seek_calls(&self) {
        self.seek_calls.set(0);
    }

    fn read_at(&self, index: u64, buf: &mut [u8]) -> Result<()> {
        let file = match &self.file {
            Some(file) => file,
            None => return Ok(()),
        };
        let mut file = file.borrow_mut();
        file.seek(SeekFrom::Start(index * self.width))?;
        file.read_exact(buf)?;
        self.seek_calls.set(self.seek_calls.get() + 1);
        Ok(())
    }

    pub(crate) fn read_prefix(&self, index: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_at(index, &mut buf)?;
        Ok(buf)
    }

    pub(crate) fn read_record(&self, index: u64) -> Result<Record> {
        let mut buf = vec![0; self.width as usize];
        self.read_at(index, &mut buf)?;
        let line = String::from_utf8_lossy(&buf);
        Record::parse(&line).ok_or_else(|| SearchError::MalformedTable {
            path: self.path.clone(),
            reason: format!("record {} has no ':' delimiter", index),
        })
    }

    // Binary search over the first `prefix.len()` bytes of every record.
    // Returns the index of some record starting with `prefix`.
    pub(crate) fn binary_search_prefix(&self, prefix: &[u8]) -> Result<Option<u64>> {
        let mut first = 0;
        let mut last = self.linecount;

        while first < last {
            let midpoint = first + (last - first) / 2;

            // Only read the key part of the line
            let candidate = self.read_prefix(midpoint, prefix.len())?;
            match prefix.cmp(&candidate[..]) {
                Ordering::Less => last = midpoint,
                Ordering::Equal => return Ok(Some(midpoint)),
                Ordering::Greater => first = midpoint + 1,
            }
        }
        Ok(None)
    }

    pub fn binary_search(&self, key: &str) -> Result<Option<Record>> {
        if self.file.is_none() {
            return Ok(None);
        }
        if key.len() != self.key_width {
            return Err(SearchError::KeyWidth {
                table: self.desc.clone(),
                key: key.to_owned(),
                expected: self.key_width,
            });
        }
        match self.binary_search_prefix(key.as_bytes())? {
            Some(index) => Ok(Some(self.read_record(index)?)),
            None => Ok(None),
        }
    }

    pub fn lookup(&self, key: &str) -> Result<Option<Vec<String>>> {
        if self.preloaded.get() {
            return Ok(self.cache.borrow().get(key).cloned().flatten());
        }
        if let Some(steps) = self.cache.borrow().get(key) {
            return Ok(steps.clone());
        }

        let steps = self.binary_search(key)?.map(|record| record.steps);
        self.cache.borrow_mut().insert(key.to_owned(), steps.clone());
        Ok(steps)
    }

    pub fn cost(&self, key: &str) -> Result<Option<u32>> {
        Ok(self.lookup(key)?.map(|steps| Record { key: key.to_owned(), steps }.cost()))
    }

    pub fn preload(&self) -> Result<()> {
        let file = match &self.file {
            Some(file) => file,
            None => {
                self.preloaded.set(true);
                return Ok(());
            }
        };
        info!("{}: begin preload cache", self);

        let mut file = file.borrow_mut();
        file.seek(SeekFrom::Start(0))?;
        let mut cache = self.cache.borrow_mut();
        for line in BufReader::new(&mut *file).lines() {
            let line = line?;
            let record = Record::parse(&line).ok_or_else(|| SearchError::MalformedTable {
                path: self.path.clone(),
                reason: format!("record {:?} has no ':' delimiter", line),
            })?;
            cache.insert(record.key, Some(record.steps));
        }
        self.preloaded.set(true);

        info!("{}: end preload cache ({} records)", self, cache.len());
        Ok(())
    }

    // Check that every record has the table's width and delimiter position and
    // that keys are strictly ascending. Shards are checked in parallel, each
    // on its own file handle.
    pub fn validate(&self) -> Result<()> {
        if self.file.is_none() || self.linecount == 0 {
            return Ok(());
        }
        let layout = Layout {
            path: &self.path,
            linecount: self.linecount,
            width: self.width,
            key_width: self.key_width,
        };
        let num_shards = 32.min(self.linecount);
        (0..num_shards).into_par_iter().try_for_each(|shard_id| {
            let shard_start = shard_id * layout.linecount / num_shards;
            let shard_end = (shard_id + 1) * layout.linecount / num_shards;
            layout.validate_range(shard_start, shard_end)
        })?;
        info!("{}: {} records validated", self, self.linecount);
        Ok(())
    }
}

// The plain-data part of a table, shareable across validation threads.
struct Layout<'a> {
    path: &'a Path,
    linecount: u64,
    width: u64,
    key_width: usize,
}

impl Layout<'_> {
    // checks records [start, end) plus the ordering against record `end`
    fn validate_range(&self, start: u64, end: u64) -> Result<()> {
        let malformed = |reason: String| SearchError::MalformedTable { path: self.path.to_path_buf(), reason };

        let mut file = File::open(self.path)?;
        file.seek(SeekFrom::Start(start * self.width))?;
        let mut reader = BufReader::new(file);
        let mut buf = vec![0; self.width as usize];
        let mut prev_key: Option<Vec<u8>> = None;

        let stop = (end + 1).min(self.linecount);
        for index in start..stop {
            reader.read_exact(&mut buf)?;
            if buf[self.key_width] != b':' {
                return Err(malformed(format!("record {} has no ':' at byte {}", index, self.key_width)));
            }
            if buf[buf.len() - 1] != b'\n' || buf[..buf.len() - 1].contains(&b'\n') {
                return Err(malformed(format!("record {} is not {} bytes wide", index, self.width)));
            }
            let key = buf[..self.key_width].to_vec();
            if let Some(prev) = &prev_key {
                if prev >= &key {
                    return Err(malformed(format!(
                        "record {} key {} is not above {}",
                        index,
                        String::from_utf8_lossy(&key),
                        String::from_utf8_lossy(prev)
                    )));
                }
            }
            prev_key = Some(key);
        }
        Ok(())
    }
}

impl fmt::Display for SortedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.desc)
    }
}
