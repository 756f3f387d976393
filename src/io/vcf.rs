//! # VCF Reading and Writing
//!
//! Streaming reader and writer for the tab-separated genotype table.
//! Header text is kept verbatim so an untouched table round-trips
//! byte-for-byte. Files ending in `.gz`/`.bgz` go through bgzf.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use noodles::bgzf;
use tracing::info_span;

use crate::data::record::{Samples, VariantRecord};
use crate::error::{KinphaseError, Result};

/// Fixed columns expected on the `#CHROM` header line
const FIXED_COLUMNS: [&str; 9] = [
    "#CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "INFO", "FORMAT",
];

fn is_gzipped(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "gz" || e == "bgz")
        .unwrap_or(false)
}

/// Streaming VCF reader
pub struct VcfReader {
    reader: Box<dyn BufRead + Send>,
    samples: Arc<Samples>,
    header: String,
    source: String,
    line_num: usize,
    peeked: Option<VariantRecord>,
    prev: Option<(String, u32)>,
    finished_chroms: HashSet<String>,
}

impl VcfReader {
    /// Open a VCF file and read through its header
    pub fn open(path: &Path) -> Result<Self> {
        info_span!("vcf_open", path = ?path).in_scope(|| {
            let file = File::open(path)?;
            let reader: Box<dyn BufRead + Send> = if is_gzipped(path) {
                Box::new(BufReader::new(bgzf::Reader::new(file)))
            } else {
                Box::new(BufReader::new(file))
            };
            let mut vcf = Self::from_reader(reader)?;
            vcf.source = path.display().to_string();
            Ok(vcf)
        })
    }

    /// Create from a reader positioned at the start of the header
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let mut header = String::new();
        let mut line_num = 0usize;
        let samples = loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Err(KinphaseError::parse(line_num + 1, "missing #CHROM header line"));
            }
            line_num += 1;
            if !line.starts_with('#') {
                return Err(KinphaseError::parse(
                    line_num,
                    "record line before the #CHROM header line",
                ));
            }
            header.push_str(&line);
            if line.starts_with("#CHROM") {
                break parse_sample_columns(line.trim_end_matches(['\n', '\r']), line_num)?;
            }
        };

        Ok(Self {
            reader,
            samples: Arc::new(samples),
            header,
            source: "<stream>".to_string(),
            line_num,
            peeked: None,
            prev: None,
            finished_chroms: HashSet::new(),
        })
    }

    /// Shared sample list from the header
    pub fn samples_arc(&self) -> Arc<Samples> {
        Arc::clone(&self.samples)
    }

    /// The header lines exactly as read, including the `#CHROM` line
    pub fn header_text(&self) -> &str {
        &self.header
    }

    /// Read the next record, enforcing chromosome grouping and ascending
    /// positions within a chromosome.
    pub fn next_record(&mut self) -> Result<Option<VariantRecord>> {
        if let Some(record) = self.peeked.take() {
            return Ok(Some(record));
        }

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = self.reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_num += 1;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }

            let record = VariantRecord::parse(trimmed, self.samples.len(), self.line_num)
                .map_err(|e| self.with_source(e))?;
            self.check_ordering(&record).map_err(|e| self.with_source(e))?;
            return Ok(Some(record));
        }
    }

    /// Prefix streaming errors with the source path
    fn with_source(&self, err: KinphaseError) -> KinphaseError {
        match err {
            KinphaseError::Parse { line, message } => KinphaseError::Parse {
                line,
                message: format!("{}: {}", self.source, message),
            },
            other => other,
        }
    }

    /// Materialize every record of the next chromosome, in stream order.
    pub fn next_chromosome(&mut self) -> Result<Option<Vec<VariantRecord>>> {
        info_span!("vcf_read_chromosome").in_scope(|| {
            let first = match self.next_record()? {
                Some(record) => record,
                None => return Ok(None),
            };
            let chrom = first.chrom_arc();
            let mut records = vec![first];

            while let Some(record) = self.next_record()? {
                if record.chrom() != chrom.as_ref() {
                    self.peeked = Some(record);
                    break;
                }
                records.push(record);
            }
            Ok(Some(records))
        })
    }

    fn check_ordering(&mut self, record: &VariantRecord) -> Result<()> {
        match &self.prev {
            Some((chrom, pos)) if chrom == record.chrom() => {
                if record.pos() < *pos {
                    return Err(KinphaseError::parse(
                        self.line_num,
                        format!(
                            "non-monotone position {} after {} on {}",
                            record.pos(),
                            pos,
                            chrom
                        ),
                    ));
                }
            }
            Some((chrom, _)) => {
                self.finished_chroms.insert(chrom.clone());
                if self.finished_chroms.contains(record.chrom()) {
                    return Err(KinphaseError::parse(
                        self.line_num,
                        format!("chromosome {} is not contiguous", record.chrom()),
                    ));
                }
            }
            None => {}
        }
        self.prev = Some((record.chrom().to_string(), record.pos()));
        Ok(())
    }
}

fn parse_sample_columns(line: &str, line_num: usize) -> Result<Samples> {
    let columns: Vec<&str> = line.split('\t').collect();
    if columns.len() < FIXED_COLUMNS.len() {
        return Err(KinphaseError::parse(line_num, "truncated #CHROM header line"));
    }
    for (found, expected) in columns.iter().zip(FIXED_COLUMNS.iter()) {
        if found != expected {
            return Err(KinphaseError::parse(
                line_num,
                format!("expected header column {}, found {}", expected, found),
            ));
        }
    }
    Ok(Samples::from_ids(
        columns[FIXED_COLUMNS.len()..]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    ))
}

/// VCF writer
pub struct VcfWriter {
    writer: Box<dyn Write + Send>,
}

impl VcfWriter {
    /// Create an output file, bgzf-compressed when the extension asks
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let writer: Box<dyn Write + Send> = if is_gzipped(path) {
            Box::new(BufWriter::new(bgzf::Writer::new(file)))
        } else {
            Box::new(BufWriter::new(file))
        };
        Ok(Self { writer })
    }

    /// Wrap an arbitrary writer (used by tests)
    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    /// Write the header text verbatim; call once, before any record.
    pub fn write_header(&mut self, header: &str) -> Result<()> {
        info_span!("vcf_write_header").in_scope(|| {
            self.writer.write_all(header.as_bytes())?;
            Ok(())
        })
    }

    /// Write one record line
    pub fn write_record(&mut self, record: &VariantRecord) -> Result<()> {
        writeln!(self.writer, "{}", record.to_line())?;
        Ok(())
    }

    /// Flush buffered output
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SMALL_VCF: &str = "\
##fileformat=VCFv4.2
##contig=<ID=chr1>
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\ts2
chr1\t100\t.\tA\tT\t.\tPASS\t.\tGT\t0/1\t0/0
chr1\t200\t.\tG\tC\t.\tPASS\t.\tGT\t1/1\t./.
chr2\t50\t.\tT\tA\t.\tPASS\t.\tGT\t0/0\t0/1
";

    fn reader(text: &str) -> VcfReader {
        VcfReader::from_reader(Box::new(Cursor::new(text.to_string()))).unwrap()
    }

    #[test]
    fn test_header_and_samples() {
        let reader = reader(SMALL_VCF);
        assert_eq!(reader.samples_arc().ids().len(), 2);
        assert_eq!(reader.samples_arc().ids()[0].as_ref(), "s1");
        assert!(reader.header_text().ends_with("FORMAT\ts1\ts2\n"));
    }

    #[test]
    fn test_chromosome_materialization() {
        let mut reader = reader(SMALL_VCF);
        let chr1 = reader.next_chromosome().unwrap().unwrap();
        assert_eq!(chr1.len(), 2);
        assert_eq!(chr1[0].chrom(), "chr1");
        let chr2 = reader.next_chromosome().unwrap().unwrap();
        assert_eq!(chr2.len(), 1);
        assert_eq!(chr2[0].pos(), 50);
        assert!(reader.next_chromosome().unwrap().is_none());
    }

    #[test]
    fn test_non_monotone_position_rejected() {
        let text = SMALL_VCF.replace("chr1\t200", "chr1\t90");
        let mut reader = reader(&text);
        assert!(reader.next_record().unwrap().is_some());
        assert!(matches!(
            reader.next_record(),
            Err(KinphaseError::Parse { .. })
        ));
    }

    #[test]
    fn test_non_contiguous_chromosome_rejected() {
        let text = format!("{}chr1\t300\t.\tA\tT\t.\tPASS\t.\tGT\t0/0\t0/0\n", SMALL_VCF);
        let mut reader = reader(&text);
        assert!(reader.next_chromosome().unwrap().is_some());
        assert!(matches!(
            reader.next_chromosome(),
            Err(KinphaseError::Parse { .. })
        ));
    }

    #[test]
    fn test_round_trip_is_byte_equal() {
        let mut reader = reader(SMALL_VCF);
        let mut out = String::from(reader.header_text());
        while let Some(record) = reader.next_record().unwrap() {
            out.push_str(&record.to_line());
            out.push('\n');
        }
        assert_eq!(out, SMALL_VCF);
    }
}
