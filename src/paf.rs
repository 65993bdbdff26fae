use crate::overlap::Overlap;
use anyhow::{bail, Result};
use std::fmt;
use std::io::Write;

/// Mapping quality written for every overlap (PAF "missing")
pub const MISSING_MAPQ: u8 = 255;

/// PAF record structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PafRecord {
    pub query_name: String,
    pub query_len: u32,
    pub query_start: u32,
    pub query_end: u32,
    pub strand: char,
    pub target_name: String,
    pub target_len: u32,
    pub target_start: u32,
    pub target_end: u32,
    pub matches: u32,
    pub block_len: u32,
    pub quality: u8,
    pub cigar: Option<String>,
}

impl PafRecord {
    /// Build a PAF row from an overlap.
    ///
    /// Matching bases are approximated as `num_residues * kmer_size` and the
    /// block length as the longer of the two spans.
    pub fn from_overlap(overlap: &Overlap, kmer_size: usize, cigar: Option<&str>) -> Self {
        let matches = (overlap.num_residues.max(0) as u64 * kmer_size as u64).min(u32::MAX as u64);
        PafRecord {
            query_name: overlap.query_read_name.clone(),
            query_len: overlap.query_length,
            query_start: overlap.query_start,
            query_end: overlap.query_end,
            strand: overlap.relative_strand.as_char(),
            target_name: overlap.target_read_name.clone(),
            target_len: overlap.target_length,
            target_start: overlap.target_start,
            target_end: overlap.target_end,
            matches: matches as u32,
            block_len: overlap.alignment_length(),
            quality: MISSING_MAPQ,
            cigar: cigar.map(str::to_string),
        }
    }

    /// Parse one PAF line; extra tags other than `cg:Z:` are ignored
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end().split('\t').collect();

        if fields.len() < 12 {
            bail!("PAF line has fewer than 12 required fields");
        }

        let strand = match fields[4] {
            "+" => '+',
            "-" => '-',
            other => bail!("Invalid strand '{}'", other),
        };

        let cigar = fields[12..]
            .iter()
            .find_map(|field| field.strip_prefix("cg:Z:"))
            .map(str::to_string);

        Ok(PafRecord {
            query_name: fields[0].to_string(),
            query_len: fields[1].parse()?,
            query_start: fields[2].parse()?,
            query_end: fields[3].parse()?,
            strand,
            target_name: fields[5].to_string(),
            target_len: fields[6].parse()?,
            target_start: fields[7].parse()?,
            target_end: fields[8].parse()?,
            matches: fields[9].parse()?,
            block_len: fields[10].parse()?,
            quality: fields[11].parse()?,
            cigar,
        })
    }
}

impl fmt::Display for PafRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_name,
            self.query_len,
            self.query_start,
            self.query_end,
            self.strand,
            self.target_name,
            self.target_len,
            self.target_start,
            self.target_end,
            self.matches,
            self.block_len,
            self.quality
        )?;

        // Write CIGAR if present
        if let Some(ref cigar) = self.cigar {
            write!(f, "\tcg:Z:{}", cigar)?;
        }

        Ok(())
    }
}

/// Write one PAF line per overlap.
///
/// `cigars` is either empty or holds one CIGAR per overlap, in order.
pub fn write_paf<W: Write>(
    writer: &mut W,
    overlaps: &[Overlap],
    cigars: &[String],
    kmer_size: usize,
) -> Result<()> {
    if !cigars.is_empty() && cigars.len() != overlaps.len() {
        bail!(
            "Got {} CIGAR strings for {} overlaps",
            cigars.len(),
            overlaps.len()
        );
    }

    for (idx, overlap) in overlaps.iter().enumerate() {
        let cigar = cigars.get(idx).map(String::as_str);
        writeln!(writer, "{}", PafRecord::from_overlap(overlap, kmer_size, cigar))?;
    }

    Ok(())
}
