//! Plain-text load and store.
//!
//! The file format is one entry per line: the key and the value, separated by
//! whitespace, each in its type's `FromStr` / `Display` form. There is no
//! header and no entry count. Entries are written bucket by bucket, so the
//! line order follows the table layout rather than insertion order.

use core::fmt::Display;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::str::FromStr;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use crate::HashMap;
use crate::error::Error;

/// Outcome of reading entries from a text source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Pairs inserted into the map.
    pub inserted: usize,
    /// Pairs skipped because their key was already present.
    pub duplicates: usize,
    /// Lines skipped because they did not hold a parseable key and value.
    pub malformed: usize,
    /// Whether reading stopped early on an I/O error.
    pub interrupted: bool,
}

enum Line<K, V> {
    Blank,
    Pair(K, V),
    Malformed(&'static str),
}

fn parse_line<K: FromStr, V: FromStr>(raw: &[u8]) -> Line<K, V> {
    let Ok(text) = core::str::from_utf8(raw) else {
        return Line::Malformed("not valid UTF-8");
    };

    let mut tokens = text.split_whitespace();
    let (Some(key), Some(value), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return if text.trim().is_empty() {
            Line::Blank
        } else {
            Line::Malformed("expected exactly two tokens")
        };
    };

    match (key.parse(), value.parse()) {
        (Ok(key), Ok(value)) => Line::Pair(key, value),
        (Err(_), _) => Line::Malformed("unparseable key"),
        (_, Err(_)) => Line::Malformed("unparseable value"),
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq + FromStr,
    V: PartialEq + FromStr,
    S: BuildHasher,
{
    /// Reads `key value` lines from `reader` and inserts every pair whose key
    /// is not already present.
    ///
    /// Blank lines are ignored. Lines that do not hold exactly two parseable
    /// tokens are skipped and logged. An I/O error stops reading; entries read
    /// before it stay in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use prime_chain::HashMap;
    ///
    /// let mut map: HashMap<String, u32> = HashMap::new();
    /// let summary = map.read_from("alice 30\nbob 25\n\nalice 99\nbroken\n".as_bytes());
    ///
    /// assert_eq!(summary.inserted, 2);
    /// assert_eq!(summary.duplicates, 1);
    /// assert_eq!(summary.malformed, 1);
    /// assert!(map.matches("alice", &30));
    /// ```
    pub fn read_from<R: BufRead>(&mut self, mut reader: R) -> LoadSummary {
        let mut summary = LoadSummary::default();
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!("read stopped after line {line_no}: {err}");
                    summary.interrupted = true;
                    break;
                }
            }
            line_no += 1;

            match parse_line::<K, V>(&buf) {
                Line::Blank => {}
                Line::Malformed(reason) => {
                    log::warn!("skipping line {line_no}: {reason}");
                    summary.malformed += 1;
                }
                Line::Pair(key, value) => {
                    if self.contains(&key) {
                        summary.duplicates += 1;
                    } else {
                        self.insert(key, value);
                        summary.inserted += 1;
                    }
                }
            }
        }

        summary
    }

    /// Loads entries from the file at `path`. See [`read_from`] for how lines
    /// are handled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Open`] if the file cannot be opened. Malformed lines
    /// and read errors after opening do not fail the load.
    ///
    /// [`read_from`]: HashMap::read_from
    pub fn try_load(&mut self, path: impl AsRef<Path>) -> Result<LoadSummary, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let summary = self.read_from(BufReader::new(file));
        log::info!(
            "loaded {} entries from {} ({} duplicate keys, {} malformed lines)",
            summary.inserted,
            path.display(),
            summary.duplicates,
            summary.malformed
        );
        Ok(summary)
    }

    /// Loads entries from the file at `path`, returning `false` only if the
    /// file cannot be opened.
    pub fn load(&mut self, path: impl AsRef<Path>) -> bool {
        match self.try_load(path) {
            Ok(_) => true,
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Display,
    V: Display,
{
    /// Writes every entry to `writer` as a `key value` line, in bucket order
    /// and then chain order. Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Propagates any error from `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<usize> {
        let mut written = 0;
        for (key, value) in self.iter() {
            writeln!(writer, "{key} {value}")?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Writes every entry to the file at `path`, replacing its contents.
    /// Returns the number of lines written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Create`] if the file cannot be opened for writing and
    /// [`Error::Write`] if writing or flushing fails afterwards.
    pub fn try_write_to_file(&self, path: impl AsRef<Path>) -> Result<usize, Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Create {
            path: path.to_path_buf(),
            source,
        })?;

        let written = self
            .write_to(BufWriter::new(file))
            .map_err(|source| Error::Write {
                path: path.to_path_buf(),
                source,
            })?;
        log::info!("wrote {written} entries to {}", path.display());
        Ok(written)
    }

    /// Writes every entry to the file at `path`, returning `false` on any
    /// failure.
    ///
    /// Unlike a check that only covers opening the file, a write or flush
    /// error partway through also yields `false`. The file may then hold a
    /// prefix of the entries.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> bool {
        match self.try_write_to_file(path) {
            Ok(_) => true,
            Err(err) => {
                log::warn!("{err}");
                false
            }
        }
    }

    /// Writes the [`dump`](HashMap::dump) rendering to `writer`, typically
    /// stderr.
    ///
    /// # Errors
    ///
    /// Propagates any error from `writer`.
    pub fn dump_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{}", self.dump())?;
        writer.flush()
    }
}
