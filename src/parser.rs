use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::ParseResult;
use crate::models::{Account, CandidateRow};

pub const ACCOUNT_ID_HEADER: &str = "AccountId";
pub const READING_DATE_TIME_HEADER: &str = "MeterReadingDateTime";
pub const READ_VALUE_HEADER: &str = "MeterReadValue";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Parse an uploaded readings file into candidate rows, in file order
///
/// The first line is the header. Columns are matched to fields by header
/// name (case-insensitive) in any order; a field with no matching header
/// reads as empty. Missing cells become empty strings and extra cells are
/// ignored. Blank and whitespace-only lines are skipped; any other line,
/// even one made only of delimiters, becomes a row.
///
/// Only an unreadable stream (I/O failure, invalid UTF-8) is an error.
pub fn parse_readings<R: Read>(mut reader: R) -> ParseResult<Vec<CandidateRow>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let body = strip_bom(&bytes);

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(sniff_delimiter(body))
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body);

    let layout = ColumnLayout::from_headers(csv_reader.headers()?);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if is_blank_line(&record) {
            continue;
        }
        rows.push(layout.extract(&record));
    }

    Ok(rows)
}

/// Parse an account seed file with header `AccountId,FirstName,LastName`
///
/// Unlike readings, a malformed seed row is an error.
pub fn parse_accounts<R: Read>(mut reader: R) -> ParseResult<Vec<Account>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(strip_bom(&bytes));

    let mut accounts = Vec::new();
    for result in csv_reader.deserialize() {
        accounts.push(result?);
    }
    Ok(accounts)
}

/// A whitespace-only line trims down to a single empty field
fn is_blank_line(record: &StringRecord) -> bool {
    record.len() == 1 && record[0].is_empty()
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Pick the delimiter occurring most often in the header line
fn sniff_delimiter(body: &[u8]) -> u8 {
    let header = body
        .split(|&b| b == b'\n' || b == b'\r')
        .next()
        .unwrap_or_default();

    let mut best = (b',', 0);
    for candidate in CANDIDATE_DELIMITERS {
        let count = header.iter().filter(|&&b| b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// Column index of each field, resolved once from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnLayout {
    account_id: Option<usize>,
    reading_date_time: Option<usize>,
    read_value: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &StringRecord) -> Self {
        let position = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        Self {
            account_id: position(ACCOUNT_ID_HEADER),
            reading_date_time: position(READING_DATE_TIME_HEADER),
            read_value: position(READ_VALUE_HEADER),
        }
    }

    fn extract(&self, record: &StringRecord) -> CandidateRow {
        let field = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };

        CandidateRow {
            account_id: field(self.account_id),
            reading_date_time: field(self.reading_date_time),
            read_value: field(self.read_value),
        }
    }
}
