use std::cell::{Cell, RefCell};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::table::table_desc;

enum Backing {
    Memory(Vec<u8>),
    // Some cost-only tables are 2^32 characters, those are read one byte at a time
    Seek(RefCell<File>),
}

// A dense cost table: byte `i` of the file is the hex digit cost of the state
// whose integer key is `i`.
pub struct CostOnlyTable {
    desc: String,
    path: PathBuf,
    len: u64,
    backing: Backing,
    seek_calls: Cell<u64>,
}

impl CostOnlyTable {
    pub fn open<P: AsRef<Path>>(path: P, load_string: bool) -> Result<CostOnlyTable> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SearchError::TableMissing { path });
        }

        let backing;
        let len;
        if load_string {
            let mut content = std::fs::read(&path)?;
            if content.last() == Some(&b'\n') {
                content.pop();
            }
            len = content.len() as u64;
            backing = Backing::Memory(content);
        } else {
            let mut file = File::open(&path)?;
            let mut file_len = file.metadata()?.len();
            if file_len > 0 {
                let mut last = [0u8; 1];
                file.seek(SeekFrom::Start(file_len - 1))?;
                file.read_exact(&mut last)?;
                if last[0] == b'\n' {
                    file_len -= 1;
                }
            }
            len = file_len;
            backing = Backing::Seek(RefCell::new(file));
        }

        Ok(CostOnlyTable {
            desc: table_desc(&path),
            path,
            len,
            backing,
            seek_calls: Cell::new(0),
        })
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory(_))
    }

    pub fn seek_calls(&self) -> u64 {
        self.seek_calls.get()
    }

    pub fn reset_seek_calls(&self) {
        self.seek_calls.set(0);
    }

    pub fn cost(&self, index: u64) -> Result<u32> {
        if index >= self.len {
            return Err(SearchError::MalformedTable {
                path: self.path.clone(),
                reason: format!("key {} is beyond the {} entries of the table", index, self.len),
            });
        }

        let digit = match &self.backing {
            Backing::Memory(content) => content[index as usize],
            Backing::Seek(file) => {
                let mut file = file.borrow_mut();
                let mut buf = [0u8; 1];
                file.seek(SeekFrom::Start(index))?;
                file.read_exact(&mut buf)?;
                self.seek_calls.set(self.seek_calls.get() + 1);
                buf[0]
            }
        };

        (digit as char).to_digit(16).ok_or_else(|| SearchError::MalformedTable {
            path: self.path.clone(),
            reason: format!("byte {} is {:?}, not a hex digit", index, digit as char),
        })
    }
}

impl fmt::Display for CostOnlyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.desc)
    }
}
