use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

use crate::error::LoadError;
use crate::models::{DateCell, Dataset, DerivedColumns, Row};
use crate::schema::Column;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Loads a workbook (first worksheet) or, for any other extension, a CSV
/// export. Either way the first row is the header row.
pub fn load_path(path: &Path) -> Result<Dataset, LoadError> {
    let dataset = if is_workbook(path) {
        load_workbook(path)?
    } else {
        load_reader(std::fs::File::open(path)?)?
    };
    info!(
        path = %path.display(),
        rows = dataset.rows.len(),
        columns = dataset.headers.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| w.eq_ignore_ascii_case(ext)))
}

pub fn load_workbook(path: &Path) -> Result<Dataset, LoadError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range_at(0).ok_or(LoadError::NoWorksheet)??;
    load_range(&range)
}

/// Builds a dataset from a worksheet range. Typed cells are rendered to
/// text and go through the same parsing as CSV cells.
pub fn load_range(range: &Range<Data>) -> Result<Dataset, LoadError> {
    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(first) => first.iter().map(cell_text).collect(),
        None => return Err(LoadError::EmptyHeader),
    };
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::EmptyHeader);
    }

    let columns = map_columns(&headers);
    let rows = sheet_rows
        .enumerate()
        .map(|(index, cells)| {
            let cells: Vec<String> = cells.iter().map(cell_text).collect();
            build_row(&headers, &columns, &cells, index + 2)
        })
        .collect();

    Ok(Dataset {
        headers,
        rows,
        derived: DerivedColumns::default(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(moment) => moment
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::Error(err) => {
            warn!(error = ?err, "spreadsheet error cell treated as blank");
            String::new()
        }
    }
}

/// Reads a CSV export. Bytes that are not valid UTF-8 (Latin-1 exports,
/// for instance) are replaced rather than failing the load.
pub fn load_reader<R: Read>(source: R) -> Result<Dataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::EmptyHeader);
    }

    let columns = map_columns(&headers);
    let mut rows = Vec::new();

    for (index, record) in reader.byte_records().enumerate() {
        let record = record?;
        let cells: Vec<String> = record
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        rows.push(build_row(&headers, &columns, &cells, index + 2));
    }

    Ok(Dataset {
        headers,
        rows,
        derived: DerivedColumns::default(),
    })
}

fn map_columns(headers: &[String]) -> Vec<Option<Column>> {
    headers.iter().map(|h| Column::from_header(h)).collect()
}

fn build_row(headers: &[String], columns: &[Option<Column>], cells: &[String], line: usize) -> Row {
    let mut row = Row {
        date: DateCell::Absent,
        campaign_name: None,
        category: None,
        spend: None,
        revenue: None,
        orders: None,
        extra: Vec::new(),
        roas: None,
        cpa: None,
    };

    for (position, header) in headers.iter().enumerate() {
        let cell = cells.get(position).map(String::as_str).unwrap_or("");
        match columns[position] {
            Some(Column::Date) => row.date = parse_date(cell),
            Some(Column::CampaignName) => row.campaign_name = text(cell),
            Some(Column::Category) => row.category = text(cell),
            Some(Column::Spend) => row.spend = amount(cell, header, line),
            Some(Column::Revenue) => row.revenue = amount(cell, header, line),
            Some(Column::Orders) => row.orders = count(cell, line),
            None => row.extra.push((header.clone(), cell.to_string())),
        }
    }

    row
}

fn text(cell: &str) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.to_string())
    }
}

fn amount(cell: &str, header: &str, line: usize) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!(line, column = header, value = cell, "unparseable amount treated as blank");
            None
        }
    }
}

fn count(cell: &str, line: usize) -> Option<u64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<u64>() {
        return Some(value);
    }
    // Spreadsheet exports often write integer columns as `12.0`.
    match trimmed.parse::<f64>() {
        Ok(value) if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 => {
            Some(value as u64)
        }
        _ => {
            warn!(line, column = "orders", value = cell, "unparseable order count treated as blank");
            None
        }
    }
}

pub fn parse_date(cell: &str) -> DateCell {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return DateCell::Absent;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return DateCell::Valid(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(moment) = NaiveDateTime::parse_from_str(trimmed, format) {
            return DateCell::Valid(moment.date());
        }
    }
    DateCell::Malformed(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
c_date,campaign_name,category,mark_spent,revenue,orders,clicks
2024-01-01,CampA,social,100,50,10,900
2024-01-02 00:00:00,CampA,social,100,400,20.0,1200
not-a-date,CampB,search,,75,,33
";

    #[test]
    fn loads_recognised_and_extra_columns() {
        let dataset = load_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.headers.len(), 7);
        assert_eq!(dataset.rows.len(), 3);

        let first = &dataset.rows[0];
        assert_eq!(first.date, DateCell::Valid(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(first.campaign_name.as_deref(), Some("CampA"));
        assert_eq!(first.spend, Some(100.0));
        assert_eq!(first.orders, Some(10));
        assert_eq!(first.extra, vec![("clicks".to_string(), "900".to_string())]);
        assert_eq!(first.roas, None);
    }

    #[test]
    fn integral_float_orders_and_datetimes_are_accepted() {
        let dataset = load_reader(SAMPLE.as_bytes()).unwrap();
        let second = &dataset.rows[1];
        assert_eq!(second.orders, Some(20));
        assert_eq!(second.date.valid(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn blank_cells_and_bad_dates_do_not_fail_the_load() {
        let dataset = load_reader(SAMPLE.as_bytes()).unwrap();
        let third = &dataset.rows[2];
        assert_eq!(third.date, DateCell::Malformed("not-a-date".to_string()));
        assert_eq!(third.spend, None);
        assert_eq!(third.orders, None);
        assert_eq!(third.revenue, Some(75.0));
    }

    #[test]
    fn garbage_amounts_become_blank() {
        let csv = "mark_spent,orders\nlots,-3\n";
        let dataset = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.rows[0].spend, None);
        assert_eq!(dataset.rows[0].orders, None);
    }

    #[test]
    fn short_records_are_padded_with_blanks() {
        let csv = "campaign_name,mark_spent,revenue\nCampA,10\n";
        let dataset = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.rows[0].spend, Some(10.0));
        assert_eq!(dataset.rows[0].revenue, None);
    }

    #[test]
    fn campaign_names_are_kept_verbatim() {
        let csv = "campaign_name\n CampA \n";
        let dataset = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(dataset.rows[0].campaign_name.as_deref(), Some(" CampA "));
    }

    #[test]
    fn empty_input_has_no_header() {
        let result = load_reader("".as_bytes());
        assert!(matches!(result, Err(LoadError::EmptyHeader)));
    }

    #[test]
    fn parses_alternate_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_date("2024/03/05"), DateCell::Valid(expected));
        assert_eq!(parse_date("05.03.2024"), DateCell::Valid(expected));
        assert_eq!(parse_date("2024-03-05T08:30:00"), DateCell::Valid(expected));
        assert_eq!(parse_date("3/5/2024"), DateCell::Valid(expected));
        assert_eq!(parse_date("03/05/2024"), DateCell::Valid(expected));
        assert_eq!(parse_date("2024-03-05 08:30:00.000"), DateCell::Valid(expected));
        assert_eq!(parse_date("2024-03-05T08:30:00.123456"), DateCell::Valid(expected));
        assert_eq!(parse_date(""), DateCell::Absent);
        assert!(matches!(parse_date("2024-13-40"), DateCell::Malformed(_)));
    }

    #[test]
    fn non_utf8_bytes_are_replaced_not_fatal() {
        let mut csv = b"campaign_name,category,mark_spent,revenue\nCampA,caf".to_vec();
        csv.push(0xE9);
        csv.extend_from_slice(b" \x80,10,20\n");
        let dataset = load_reader(csv.as_slice()).unwrap();
        let row = &dataset.rows[0];
        assert_eq!(row.campaign_name.as_deref(), Some("CampA"));
        assert!(row.category.as_deref().unwrap().starts_with("caf"));
        assert!(row.category.as_deref().unwrap().contains('\u{FFFD}'));
        assert_eq!(row.spend, Some(10.0));
        assert_eq!(row.revenue, Some(20.0));
    }

    fn sheet(cells: &[&[Data]]) -> Range<Data> {
        let height = cells.len() as u32;
        let width = cells.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                range.set_value((r as u32, c as u32), value.clone());
            }
        }
        range
    }

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn worksheet_rows_map_like_csv() {
        let range = sheet(&[
            &[s("c_date"), s("campaign_name"), s("mark_spent"), s("revenue"), s("orders"), s("notes")],
            &[
                Data::DateTimeIso("2024-03-05T00:00:00".to_string()),
                s("CampA"),
                Data::Float(100.0),
                Data::Float(50.5),
                Data::Int(10),
                s("launch"),
            ],
            &[s("3/6/2024"), s("CampA"), Data::Int(200), Data::Empty, Data::Float(4.0), Data::Empty],
        ]);
        let dataset = load_range(&range).unwrap();
        assert_eq!(dataset.headers.len(), 6);
        assert_eq!(dataset.rows.len(), 2);

        let first = &dataset.rows[0];
        assert_eq!(first.date.valid(), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(first.campaign_name.as_deref(), Some("CampA"));
        assert_eq!(first.spend, Some(100.0));
        assert_eq!(first.revenue, Some(50.5));
        assert_eq!(first.orders, Some(10));
        assert_eq!(first.extra, vec![("notes".to_string(), "launch".to_string())]);

        let second = &dataset.rows[1];
        assert_eq!(second.date.valid(), NaiveDate::from_ymd_opt(2024, 3, 6));
        assert_eq!(second.spend, Some(200.0));
        assert_eq!(second.revenue, None);
        assert_eq!(second.orders, Some(4));
    }

    #[test]
    fn empty_worksheet_has_no_header() {
        let range: Range<Data> = Range::empty();
        assert!(matches!(load_range(&range), Err(LoadError::EmptyHeader)));
    }

    #[test]
    fn workbook_extension_selects_workbook_reader() {
        assert!(is_workbook(Path::new("Marketing-Dataset.xlsx")));
        assert!(is_workbook(Path::new("export.XLSX")));
        assert!(!is_workbook(Path::new("export.csv")));
        assert!(!is_workbook(Path::new("export")));

        let path = std::env::temp_dir().join(format!("marketing-dss-{}.xlsx", uuid::Uuid::new_v4()));
        std::fs::write(&path, b"PK\x03\x04 not really a workbook").unwrap();
        let result = load_path(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(LoadError::Workbook(_))));
    }
}
