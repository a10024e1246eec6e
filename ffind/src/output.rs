//! Serializes matched paths from every worker into one stream.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use crate::errors::{FindError, FindResult};
use crate::filters::Terminator;

/// Thread-safe, buffered destination for matched paths.
///
/// Each record (path bytes plus terminator) is written with a single call under
/// the lock, so records from different workers never interleave.
#[derive(Debug)]
pub struct OutputSink<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
}

impl<W: Write + Send> OutputSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    /// Writes one matched path followed by `terminator`
    pub fn write_match(&self, path: &Path, terminator: Terminator) -> FindResult<()> {
        let record = encode_record(path, terminator);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&record).map_err(FindError::Output)
    }

    /// Flushes buffered records and hands back the underlying writer
    pub fn finish(self) -> FindResult<W> {
        let writer = self
            .writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        writer
            .into_inner()
            .map_err(|e| FindError::Output(e.into_error()))
    }
}

fn encode_record(path: &Path, terminator: Terminator) -> Vec<u8> {
    let bytes = path_bytes(path);
    let terminator = terminator.as_bytes();
    let mut record = Vec::with_capacity(bytes.len() + terminator.len());
    record.extend_from_slice(&bytes);
    record.extend_from_slice(terminator);
    record
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    std::borrow::Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> std::borrow::Cow<'_, [u8]> {
    match path.to_string_lossy() {
        std::borrow::Cow::Borrowed(s) => std::borrow::Cow::Borrowed(s.as_bytes()),
        std::borrow::Cow::Owned(s) => std::borrow::Cow::Owned(s.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::thread;

    #[test]
    fn test_newline_terminated() {
        let sink = OutputSink::new(Vec::new());
        sink.write_match(Path::new("./a.txt"), Terminator::Newline)
            .unwrap();
        sink.write_match(Path::new("./b/c"), Terminator::Newline)
            .unwrap();

        let out = sink.finish().unwrap();
        assert_eq!(out, b"./a.txt\n./b/c\n");
    }

    #[test]
    fn test_nul_terminated() {
        let sink = OutputSink::new(Vec::new());
        sink.write_match(Path::new("with space"), Terminator::Nul)
            .unwrap();
        sink.write_match(Path::new("line\nbreak"), Terminator::Nul)
            .unwrap();

        let out = sink.finish().unwrap();
        assert_eq!(out, b"with space\0line\nbreak\0");
    }

    #[test]
    fn test_concurrent_writes_do_not_interleave() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 200;

        let sink = OutputSink::new(Vec::new());
        thread::scope(|s| {
            for t in 0..THREADS {
                let sink = &sink;
                s.spawn(move || {
                    for i in 0..PER_THREAD {
                        let path = format!("/worker{}/{}", t, "x".repeat(i % 50 + 1));
                        sink.write_match(Path::new(&path), Terminator::Newline)
                            .unwrap();
                    }
                });
            }
        });

        let out = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), THREADS * PER_THREAD);
        for line in lines {
            let (prefix, rest) = line.rsplit_once('/').unwrap();
            assert!(prefix.starts_with("/worker"), "corrupt record {:?}", line);
            assert!(rest.chars().all(|c| c == 'x'), "corrupt record {:?}", line);
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> io::Result<()> {
                Err(io::ErrorKind::BrokenPipe.into())
            }
        }

        let sink = OutputSink::new(Broken);
        // Small records sit in the buffer until the flush
        sink.write_match(Path::new("a"), Terminator::Newline)
            .unwrap();
        assert!(matches!(sink.finish(), Err(FindError::Output(_))));
    }
}
