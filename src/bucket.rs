// Tables whose keys are `<signature>_<detail>`, sorted by signature first so
// every record sharing a signature sits in one contiguous bucket.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;

use crate::error::{Result, SearchError};
use crate::table::{Record, SortedTable};

const SEPARATOR: char = '_';

pub struct SignatureBucketTable {
    table: SortedTable,
    signature_width: usize,
}

fn signature_of(key: &str) -> &str {
    key.split(SEPARATOR).next().unwrap_or(key)
}

impl SignatureBucketTable {
    pub fn open<P: AsRef<Path>>(path: P, linecount: u64) -> Result<SignatureBucketTable> {
        let table = SortedTable::open(path, linecount)?;
        let signature_width = if linecount == 0 {
            0
        } else {
            let first = table.read_record(0)?;
            first.key.find(SEPARATOR).ok_or_else(|| SearchError::MalformedTable {
                path: table.path().to_path_buf(),
                reason: format!("key {} has no {:?} separator", first.key, SEPARATOR),
            })?
        };
        Ok(SignatureBucketTable { table, signature_width })
    }

    pub fn table(&self) -> &SortedTable {
        &self.table
    }

    pub fn signature_width(&self) -> usize {
        self.signature_width
    }

    // Every record whose signature is exactly `signature`: binary search for
    // one of them, then walk backward and forward to the edges of the bucket.
    pub fn find_bucket(&self, signature: &str) -> Result<Vec<Record>> {
        let mut result = vec![];
        if signature.len() != self.signature_width {
            return Err(SearchError::KeyWidth {
                table: self.table.desc().to_owned(),
                key: signature.to_owned(),
                expected: self.signature_width,
            });
        }

        let midpoint = match self.table.binary_search_prefix(signature.as_bytes())? {
            Some(midpoint) => midpoint,
            None => {
                warn!("{}: could not find signature {}", self.table, signature);
                return Ok(result);
            }
        };

        // Go back one line at a time until we are at the first line with signature
        let mut index = midpoint;
        loop {
            let record = self.table.read_record(index)?;
            if signature_of(&record.key) != signature {
                break;
            }
            result.push(record);
            if index == 0 {
                break;
            }
            index -= 1;
        }

        // Go forward one line at a time until we have read the whole bucket
        for index in (midpoint + 1)..self.table.linecount() {
            let record = self.table.read_record(index)?;
            if signature_of(&record.key) != signature {
                break;
            }
            result.push(record);
        }

        Ok(result)
    }

    // Linear scan for every record whose binary signature has at least the
    // 1-bits of `signature` set. An all-zero signature matches every record.
    pub fn find_loose(&self, signature: &str) -> Result<Vec<Record>> {
        let bad_signature = || SearchError::InvalidConfig(format!("signature {} is not a binary string", signature));
        let to_find = u128::from_str_radix(signature, 2).map_err(|_| bad_signature())?;

        let mut result = vec![];
        if self.table.linecount() == 0 {
            return Ok(result);
        }
        let file = File::open(self.table.path())?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            let record = Record::parse(&line).ok_or_else(|| SearchError::MalformedTable {
                path: self.table.path().to_path_buf(),
                reason: format!("record {:?} has no ':' delimiter", line),
            })?;
            if to_find != 0 {
                let bits = u128::from_str_radix(signature_of(&record.key), 2).map_err(|_| SearchError::MalformedTable {
                    path: self.table.path().to_path_buf(),
                    reason: format!("key {} does not start with a binary signature", record.key),
                })?;
                if bits & to_find != to_find {
                    continue;
                }
            }
            result.push(record);
        }
        Ok(result)
    }
}
