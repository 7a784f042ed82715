use std::{
    fmt,
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use bincode::{
    config,
    error::{DecodeError, EncodeError},
};
use thiserror::Error;
use tracing::debug;

use crate::{
    errors::TradeError,
    mapper::{FieldMapper, field_names},
    trade::Trade,
};

/// Errors from reading or writing trade files
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error on line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },

    #[error("Bincode encode error: {0}")]
    BincodeEncode(#[from] EncodeError),

    #[error("Bincode decode error: {0}")]
    BincodeDecode(#[from] DecodeError),

    #[error("line {line}: {source}")]
    Record { line: u64, source: TradeError },

    #[error("unsupported format: `{0}`")]
    UnsupportedFormat(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

/// On-disk layout of a batch of trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Header row naming the fields, then one trade per row.
    Csv,
    /// JSON Lines: one object per line, fields bound by name.
    Json,
    /// A single bincode-encoded `Vec<Trade>`.
    Bincode,
}

impl Format {
    pub fn supported() -> &'static [Format] {
        &[Format::Csv, Format::Json, Format::Bincode]
    }

    /// Usual file extension, e.g. "csv"
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "jsonl",
            Format::Bincode => "bin",
        }
    }

    /// Infers the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Format::Csv),
            "json" | "jsonl" => Some(Format::Json),
            "bin" | "bincode" => Some(Format::Bincode),
            _ => None,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        Format::from_path(path) == Some(*self)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Bincode => "bincode",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = SourceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::supported()
            .iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| SourceError::UnsupportedFormat(s.to_string()))
    }
}

/// Reads CSV with a header row; each record is bound through a [`FieldMapper`].
pub fn read_csv<R: Read>(reader: R, strict: bool) -> SourceResult<Vec<Trade>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mapper = FieldMapper::from_headers(rdr.headers()?, strict)
        .map_err(|source| SourceError::Record { line: 1, source })?;

    let mut trades = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let trade = mapper
            .map(&record)
            .map_err(|source| SourceError::Record { line, source })?;
        trades.push(trade);
    }
    Ok(trades)
}

/// Reads JSON Lines, skipping blank lines.
///
/// Lines are parsed as raw bytes so invalid UTF-8 is reported with its line number.
pub fn read_json_lines<R: BufRead>(reader: R) -> SourceResult<Vec<Trade>> {
    let mut trades = Vec::new();
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let trade = serde_json::from_slice::<Trade>(&line)
            .map_err(|source| SourceError::Json { line: idx + 1, source })?;
        trades.push(trade);
    }
    Ok(trades)
}

/// Upper bound on memory a bincode batch may claim while decoding.
const BINCODE_LIMIT: usize = 1 << 30;

/// Smallest encoding of one trade: three one-byte varints and the ticker tag.
const MIN_ENCODED_TRADE: u64 = 4;

/// Decodes a whole `Vec<Trade>`.
///
/// Length prefixes are checked against the input before anything is
/// allocated, and bytes left over after the batch are rejected.
pub fn read_bincode<R: Read>(mut reader: R) -> SourceResult<Vec<Trade>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let (count, prefix): (u64, usize) = bincode::decode_from_slice(&bytes, config::standard())?;
    let remaining = (bytes.len() - prefix) as u64;
    if count > remaining / MIN_ENCODED_TRADE {
        return Err(DecodeError::Other("trade count exceeds input size").into());
    }

    let config = config::standard().with_limit::<BINCODE_LIMIT>();
    let (trades, read): (Vec<Trade>, usize) = bincode::decode_from_slice(&bytes, config)?;
    if read != bytes.len() {
        return Err(DecodeError::Other("trailing bytes after trades").into());
    }
    Ok(trades)
}

/// Writes a header row from the field table, then one row per trade.
///
/// An absent ticker is written as an empty cell, so this format is lossy for
/// `None`: it reads back as `Some("")`.
pub fn write_csv<W: Write>(writer: W, trades: &[Trade]) -> SourceResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(field_names())?;
    for t in trades {
        wtr.write_record([
            t.time().to_string(),
            t.ticker().unwrap_or_default().to_string(),
            t.quantity().to_string(),
            t.price().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json_lines<W: Write>(mut writer: W, trades: &[Trade]) -> SourceResult<()> {
    for (idx, t) in trades.iter().enumerate() {
        serde_json::to_writer(&mut writer, t)
            .map_err(|source| SourceError::Json { line: idx + 1, source })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_bincode<W: Write>(mut writer: W, trades: &[Trade]) -> SourceResult<()> {
    let bytes = bincode::encode_to_vec(trades, config::standard())?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Reads every trade in the file at `path`.
pub fn read_trades(path: impl AsRef<Path>, format: Format, strict: bool) -> SourceResult<Vec<Trade>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let trades = match format {
        Format::Csv => read_csv(BufReader::new(file), strict)?,
        Format::Json => read_json_lines(BufReader::new(file))?,
        Format::Bincode => read_bincode(BufReader::new(file))?,
    };
    debug!(path = %path.display(), %format, count = trades.len(), "read trades");
    Ok(trades)
}

/// Reads all files in `dir` whose extension matches `format`, in file-name order.
pub fn read_dir(dir: impl AsRef<Path>, format: Format, strict: bool) -> SourceResult<Vec<Trade>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && format.matches(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut trades = Vec::new();
    for path in &paths {
        trades.extend(read_trades(path, format, strict)?);
    }
    debug!(dir = %dir.display(), files = paths.len(), count = trades.len(), "read directory");
    Ok(trades)
}

/// Creates (or truncates) `path` and writes `trades` to it.
pub fn write_trades(path: impl AsRef<Path>, format: Format, trades: &[Trade]) -> SourceResult<()> {
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    match format {
        Format::Csv => write_csv(file, trades)?,
        Format::Json => write_json_lines(file, trades)?,
        Format::Bincode => write_bincode(file, trades)?,
    }
    debug!(path = %path.display(), %format, count = trades.len(), "wrote trades");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Trade> {
        vec![
            Trade::new(1_650_000_000_000, "AAPL", 100, 15000),
            Trade::new(1_650_000_000_500, "MSFT", 20, 28000),
        ]
    }

    #[test]
    fn test_format_from_path_and_str() {
        assert_eq!(Format::from_path("a/trades.csv"), Some(Format::Csv));
        assert_eq!(Format::from_path("trades.JSONL"), Some(Format::Json));
        assert_eq!(Format::from_path("trades.json"), Some(Format::Json));
        assert_eq!(Format::from_path("trades.bin"), Some(Format::Bincode));
        assert_eq!(Format::from_path("trades.avro"), None);
        assert_eq!(Format::from_path("trades"), None);

        assert_eq!("CSV".parse::<Format>().unwrap(), Format::Csv);
        assert_eq!("bincode".parse::<Format>().unwrap(), Format::Bincode);
        assert!(matches!(
            "parquet".parse::<Format>(),
            Err(SourceError::UnsupportedFormat(_))
        ));
        for f in Format::supported() {
            assert_eq!(&f.to_string().parse::<Format>().unwrap(), f);
            assert!(f.matches(Path::new(&format!("x.{}", f.extension()))));
        }
    }

    #[test]
    fn test_read_csv_with_reordered_and_extra_columns() {
        let data = "ticker,price,venue,time,quantity\nAAPL, 15000 ,XNAS,1650000000000,100\n";
        let trades = read_csv(data.as_bytes(), false).unwrap();
        assert_eq!(trades, vec![Trade::new(1_650_000_000_000, "AAPL", 100, 15000)]);
    }

    #[test]
    fn test_read_csv_strict_rejects_extra_column() {
        let data = "ticker,venue\nAAPL,XNAS\n";
        let err = read_csv(data.as_bytes(), true).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Record {
                line: 1,
                source: TradeError::UnknownField(_)
            }
        ));
    }

    #[test]
    fn test_read_csv_reports_bad_line() {
        let data = "time,ticker,quantity,price\n1,AAPL,1,1\n2,MSFT,lots,1\n";
        let err = read_csv(data.as_bytes(), false).unwrap_err();
        match err {
            SourceError::Record { line, source } => {
                assert_eq!(line, 3);
                assert!(matches!(source, TradeError::InvalidValue { field: "quantity", .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_write_csv_layout() {
        let mut out = Vec::new();
        let mut trades = sample();
        trades.push(Trade::default());
        write_csv(&mut out, &trades).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "time,ticker,quantity,price\n\
             1650000000000,AAPL,100,15000\n\
             1650000000500,MSFT,20,28000\n\
             0,,0,0\n"
        );
    }

    #[test]
    fn test_read_json_lines_skips_blank_and_reports_line() {
        let data = "{\"time\":1,\"ticker\":\"A\",\"quantity\":2,\"price\":3}\n\n{\"time\":\"x\"}\n";
        let err = read_json_lines(data.as_bytes()).unwrap_err();
        assert!(matches!(err, SourceError::Json { line: 3, .. }));

        let ok = read_json_lines("\n{\"ticker\":\"B\"}\n".as_bytes()).unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok[0].ticker(), Some("B"));
    }

    #[test]
    fn test_bincode_keeps_absent_ticker() {
        let mut trades = sample();
        trades.push(Trade::default());
        let mut out = Vec::new();
        write_bincode(&mut out, &trades).unwrap();
        assert_eq!(read_bincode(out.as_slice()).unwrap(), trades);
    }

    #[test]
    fn test_read_bincode_rejects_oversized_count() {
        // varint length prefix of 2^40 with no trades behind it
        let bytes = [253, 0, 0, 0, 0, 0, 1, 0, 0];
        assert!(matches!(
            read_bincode(bytes.as_slice()),
            Err(SourceError::BincodeDecode(_))
        ));
    }

    #[test]
    fn test_read_bincode_rejects_oversized_ticker() {
        // one trade: time 0, Some(ticker) claiming 2^40 bytes
        let bytes = [1, 0, 1, 253, 0, 0, 0, 0, 0, 1, 0, 0];
        assert!(matches!(
            read_bincode(bytes.as_slice()),
            Err(SourceError::BincodeDecode(_))
        ));
    }

    #[test]
    fn test_read_bincode_rejects_trailing_bytes() {
        for trades in [Vec::new(), sample()] {
            let mut out = Vec::new();
            write_bincode(&mut out, &trades).unwrap();
            out.extend_from_slice(b"garbage");
            assert!(matches!(
                read_bincode(out.as_slice()),
                Err(SourceError::BincodeDecode(_))
            ));
        }
    }

    #[test]
    fn test_read_json_lines_reports_line_of_invalid_utf8() {
        let data = b"{\"ticker\":\"A\"}\n{\"ticker\":\"\xff\"}\n";
        let err = read_json_lines(data.as_slice()).unwrap_err();
        assert!(matches!(err, SourceError::Json { line: 2, .. }));
    }

    #[test]
    fn test_read_json_lines_accepts_crlf() {
        let data = b"{\"ticker\":\"A\",\"price\":4}\r\n\r\n";
        let trades = read_json_lines(data.as_slice()).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price(), 4);
    }

    #[test]
    fn test_read_bincode_truncated() {
        let mut out = Vec::new();
        write_bincode(&mut out, &sample()).unwrap();
        out.truncate(out.len() / 2);
        assert!(matches!(
            read_bincode(out.as_slice()),
            Err(SourceError::BincodeDecode(_))
        ));
    }
}
