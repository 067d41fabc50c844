//! Batched record reader and buffered record writer

use std::io::{self, BufWriter, ErrorKind, Read, Write};

use tracing::{debug, warn};

use super::{OutputRecord, RawRecord, DEFAULT_BATCH_SIZE, RAW_RECORD_SIZE};

/// Reads raw records in fixed-size batches
///
/// Each call to [`next_batch`](Self::next_batch) issues at most one
/// successful `read` of up to `batch_size` records. Bytes of a record split
/// across two reads are carried over; a partial record left at end of stream
/// is dropped and counted in [`trailing_bytes`](Self::trailing_bytes).
pub struct RecordReader<R> {
    reader: R,
    buf: Vec<u8>,
    filled: usize,
    records_read: u64,
    trailing_bytes: usize,
    eof: bool,
}

impl<R: Read> RecordReader<R> {
    /// Create a reader with the default batch size
    pub fn new(reader: R) -> Self {
        Self::with_batch_size(reader, DEFAULT_BATCH_SIZE)
    }

    /// Create a reader pulling `batch_size` records per read (minimum 1)
    pub fn with_batch_size(reader: R, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            reader,
            buf: vec![0u8; batch_size * RAW_RECORD_SIZE],
            filled: 0,
            records_read: 0,
            trailing_bytes: 0,
            eof: false,
        }
    }

    /// Number of records per batch
    pub fn batch_size(&self) -> usize {
        self.buf.len() / RAW_RECORD_SIZE
    }

    /// Total records decoded so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Bytes of an incomplete final record dropped at end of stream
    pub fn trailing_bytes(&self) -> usize {
        self.trailing_bytes
    }

    /// Decode the next batch into `out` (cleared first)
    ///
    /// Returns the number of records decoded; `Ok(0)` means end of stream.
    pub fn next_batch(&mut self, out: &mut Vec<RawRecord>) -> io::Result<usize> {
        out.clear();

        loop {
            if self.eof {
                return Ok(0);
            }

            let n = match self.reader.read(&mut self.buf[self.filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };

            if n == 0 {
                self.eof = true;
                if self.filled > 0 {
                    warn!(
                        bytes = self.filled,
                        "Dropping incomplete record at end of stream"
                    );
                    self.trailing_bytes = self.filled;
                    self.filled = 0;
                }
                return Ok(0);
            }

            self.filled += n;
            let whole = self.filled / RAW_RECORD_SIZE;
            if whole == 0 {
                // Not even one record yet, keep reading
                continue;
            }

            out.reserve(whole);
            for chunk in self.buf[..whole * RAW_RECORD_SIZE].chunks_exact(RAW_RECORD_SIZE) {
                let mut bytes = [0u8; RAW_RECORD_SIZE];
                bytes.copy_from_slice(chunk);
                out.push(RawRecord::from_bytes(&bytes));
            }

            let consumed = whole * RAW_RECORD_SIZE;
            self.buf.copy_within(consumed..self.filled, 0);
            self.filled -= consumed;
            self.records_read += whole as u64;

            debug!(records = whole, carried = self.filled, "Decoded batch");
            return Ok(whole);
        }
    }
}

/// Buffered writer of output records
pub struct RecordWriter<W: Write> {
    writer: BufWriter<W>,
    records_written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, inner),
            records_written: 0,
        }
    }

    /// Encode and buffer one record
    #[inline]
    pub fn write_record(&mut self, record: &OutputRecord) -> io::Result<()> {
        self.writer.write_all(&record.to_bytes())?;
        self.records_written += 1;
        Ok(())
    }

    /// Total records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush buffered records and return the inner writer
    pub fn finish(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OUTPUT_RECORD_SIZE;
    use std::io::Cursor;

    fn raw_stream(records: &[RawRecord]) -> Vec<u8> {
        records.iter().flat_map(|r| r.to_bytes()).collect()
    }

    /// Reader that hands out at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_reads_in_batches() {
        let records: Vec<_> = (0..10).map(|i| RawRecord::new(0, 1, i * 10)).collect();
        let mut reader = RecordReader::with_batch_size(Cursor::new(raw_stream(&records)), 4);
        let mut batch = Vec::new();

        assert_eq!(reader.next_batch(&mut batch).unwrap(), 4);
        assert_eq!(batch[0].time(), 0);
        assert_eq!(reader.next_batch(&mut batch).unwrap(), 4);
        assert_eq!(batch[0].time(), 40);
        assert_eq!(reader.next_batch(&mut batch).unwrap(), 2);
        assert_eq!(batch[1].time(), 90);
        assert_eq!(reader.next_batch(&mut batch).unwrap(), 0);
        assert!(batch.is_empty());
        assert_eq!(reader.records_read(), 10);
        assert_eq!(reader.trailing_bytes(), 0);
    }

    #[test]
    fn test_trailing_partial_record_dropped() {
        let records = [RawRecord::new(0, 2, 7), RawRecord::new(0, 3, 8)];
        let mut data = raw_stream(&records);
        data.extend_from_slice(&[0xde, 0xad, 0xbe]);

        let mut reader = RecordReader::new(Cursor::new(data));
        let mut batch = Vec::new();
        let mut total = 0;
        while reader.next_batch(&mut batch).unwrap() > 0 {
            total += batch.len();
        }
        assert_eq!(total, 2);
        assert_eq!(reader.trailing_bytes(), 3);
    }

    #[test]
    fn test_records_split_across_reads() {
        let records: Vec<_> = (0..5).map(|i| RawRecord::new(i as u8, 4, 1000 + i)).collect();
        let trickle = Trickle {
            data: raw_stream(&records),
            pos: 0,
            step: 7,
        };
        let mut reader = RecordReader::with_batch_size(trickle, 2);
        let mut batch = Vec::new();
        let mut seen = Vec::new();
        while reader.next_batch(&mut batch).unwrap() > 0 {
            seen.extend_from_slice(&batch);
        }
        assert_eq!(seen, records);
        assert_eq!(reader.trailing_bytes(), 0);
    }

    #[test]
    fn test_zero_batch_size_is_clamped() {
        let reader = RecordReader::with_batch_size(Cursor::new(Vec::new()), 0);
        assert_eq!(reader.batch_size(), 1);
    }

    #[test]
    fn test_writer_output_layout() {
        let mut writer = RecordWriter::new(Vec::new());
        writer.write_record(&OutputRecord::new(3, 2, 99)).unwrap();
        writer.write_record(&OutputRecord::replayed(1, 100)).unwrap();
        assert_eq!(writer.records_written(), 2);

        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), 2 * OUTPUT_RECORD_SIZE);
        let mut first = [0u8; OUTPUT_RECORD_SIZE];
        first.copy_from_slice(&bytes[..OUTPUT_RECORD_SIZE]);
        assert_eq!(OutputRecord::from_bytes(&first), OutputRecord::new(3, 2, 99));
    }
}
