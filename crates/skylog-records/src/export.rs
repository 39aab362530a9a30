//! XML export of saved records.
//!
//! Layout:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <weather_records export_date="2024-03-01T12:00:00" total_records="1">
//!   <record>
//!     <location>Austin, TX</location>
//!     <date>2024-03-01</date>
//!     <temperature>72</temperature>
//!     <wind_speed>10 mph</wind_speed>
//!     <wind_direction>NW</wind_direction>
//!     <forecast>Sunny</forecast>
//!     <created_at>2024-03-01T17:00:00.000000Z</created_at>
//!   </record>
//! </weather_records>
//! ```

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use skylog_core::ExportError;

use crate::record::{WeatherRecord, DATE_FORMAT};

const ROOT: &str = "weather_records";
const RECORD: &str = "record";
const EXPORT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const INDENT: usize = 2;

/// Leaf element names, in document order
pub const FIELDS: [&str; 7] = [
    "location",
    "date",
    "temperature",
    "wind_speed",
    "wind_direction",
    "forecast",
    "created_at",
];

/// A parsed export file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDocument {
    pub export_date: String,
    pub total_records: usize,
    pub records: Vec<WeatherRecord>,
}

/// `weather_records_YYYYMMDD_HHMMSS.xml` for the current local time
pub fn default_export_file_name() -> String {
    format!("weather_records_{}.xml", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Write `records` to `path`. Returns `false` on any failure; the target is
/// then left as it was.
pub fn export(records: &[WeatherRecord], path: &Path) -> bool {
    match try_export(records, path) {
        Ok(()) => {
            tracing::info!("Exported {} records to {}", records.len(), path.display());
            true
        }
        Err(e) => {
            tracing::error!("Error exporting records to {}: {}", path.display(), e);
            false
        }
    }
}

/// Serialize `records` into a complete document.
pub fn render(records: &[WeatherRecord]) -> Result<String, ExportError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_err)?;

    let export_date = Local::now().format(EXPORT_DATE_FORMAT).to_string();
    let total = records.len().to_string();
    let mut root = BytesStart::new(ROOT);
    root.push_attribute(("export_date", export_date.as_str()));
    root.push_attribute(("total_records", total.as_str()));
    writer.write_event(Event::Start(root)).map_err(write_err)?;

    for record in records {
        writer
            .write_event(Event::Start(BytesStart::new(RECORD)))
            .map_err(write_err)?;

        let values = [
            record.location.clone(),
            record.date.format(DATE_FORMAT).to_string(),
            record.temperature.to_string(),
            record.wind_speed.clone(),
            record.wind_direction.clone(),
            record.forecast.clone(),
            record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        ];
        for (name, value) in FIELDS.iter().zip(values.iter()) {
            write_leaf(&mut writer, name, value)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new(RECORD)))
            .map_err(write_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(write_err)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(write_err)
}

/// Parse an export produced by [`export`].
pub fn read_export(path: &Path) -> Result<ExportDocument, ExportError> {
    let xml = fs::read_to_string(path).map_err(read_err)?;
    parse(&xml)
}

/// Parse export XML. Indentation between elements is ignored; leaf text is
/// taken verbatim.
pub fn parse(xml: &str) -> Result<ExportDocument, ExportError> {
    let mut reader = Reader::from_str(xml);

    let mut export_date = None;
    let mut total_records = None;
    let mut records = Vec::new();
    let mut fields: Option<Vec<(String, String)>> = None;
    let mut leaf: Option<(String, String)> = None;

    loop {
        match reader.read_event().map_err(read_err)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if name == ROOT {
                    for attr in e.attributes() {
                        let attr = attr.map_err(read_err)?;
                        let value = attr.unescape_value().map_err(read_err)?.into_owned();
                        match attr.key.as_ref() {
                            b"export_date" => export_date = Some(value),
                            b"total_records" => {
                                total_records = Some(value.parse::<usize>().map_err(read_err)?)
                            }
                            _ => {}
                        }
                    }
                } else if name == RECORD {
                    fields = Some(Vec::with_capacity(FIELDS.len()));
                } else if fields.is_some() {
                    leaf = Some((name, String::new()));
                }
            }
            Event::Text(e) => {
                if let Some((_, text)) = leaf.as_mut() {
                    text.push_str(&e.unescape().map_err(read_err)?);
                }
            }
            Event::CData(e) => {
                if let Some((_, text)) = leaf.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::Empty(e) => {
                if let Some(collected) = fields.as_mut() {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    collected.push((name, String::new()));
                }
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == RECORD.as_bytes() {
                    if let Some(collected) = fields.take() {
                        records.push(record_from_fields(collected)?);
                    }
                } else if let Some(done) = leaf.take() {
                    if let Some(collected) = fields.as_mut() {
                        collected.push(done);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let export_date =
        export_date.ok_or_else(|| ExportError::Read("missing export_date attribute".into()))?;
    let total_records =
        total_records.ok_or_else(|| ExportError::Read("missing total_records attribute".into()))?;

    Ok(ExportDocument {
        export_date,
        total_records,
        records,
    })
}

fn try_export(records: &[WeatherRecord], path: &Path) -> Result<(), ExportError> {
    let xml = render(records)?;
    let tmp = temp_path(path);

    let written = fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(xml.as_bytes())?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(ExportError::Write(e.to_string()));
    }

    Ok(())
}

fn write_leaf(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<(), ExportError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(write_err)?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(write_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_err)?;
    Ok(())
}

fn record_from_fields(fields: Vec<(String, String)>) -> Result<WeatherRecord, ExportError> {
    let field = |wanted: &str| -> Result<String, ExportError> {
        fields
            .iter()
            .find(|(name, _)| name == wanted)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| ExportError::Read(format!("record is missing <{}>", wanted)))
    };

    let date = NaiveDate::parse_from_str(&field("date")?, DATE_FORMAT).map_err(read_err)?;
    let temperature = field("temperature")?.trim().parse::<i32>().map_err(read_err)?;
    let created_at = DateTime::parse_from_rfc3339(&field("created_at")?)
        .map_err(read_err)?
        .with_timezone(&Utc);

    Ok(WeatherRecord {
        location: field("location")?,
        date,
        temperature,
        wind_speed: field("wind_speed")?,
        wind_direction: field("wind_direction")?,
        forecast: field("forecast")?,
        created_at,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_err<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Write(e.to_string())
}

fn read_err<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Read(e.to_string())
}
