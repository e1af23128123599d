//! Streaming reader for XML health exports
//!
//! Collects every element carrying the record tag (by default `Record`) into a
//! [`RawRecord`], in document order. Records nested inside other records are
//! emitted as rows of their own and also kept as children of their parent.

use crate::config::KpiConfig;
use crate::error::KpiError;
use crate::types::RawRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Reader for `export.xml` style documents
#[derive(Debug, Clone)]
pub struct XmlExportReader {
    record_tag: String,
    max_depth: usize,
}

impl Default for XmlExportReader {
    fn default() -> Self {
        Self::from_config(&KpiConfig::default())
    }
}

impl XmlExportReader {
    pub fn new(record_tag: impl Into<String>, max_depth: usize) -> Self {
        Self {
            record_tag: record_tag.into(),
            max_depth,
        }
    }

    pub fn from_config(config: &KpiConfig) -> Self {
        Self::new(config.record_tag.clone(), config.max_depth)
    }

    /// Parse an in-memory document
    pub fn read_str(&self, xml: &str) -> Result<Vec<RawRecord>, KpiError> {
        self.read_records(xml.as_bytes())
    }

    /// Parse a document and return its records in document order
    pub fn read_records<R: BufRead>(&self, input: R) -> Result<Vec<RawRecord>, KpiError> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let tag = self.record_tag.as_bytes();
        let mut buf = Vec::new();
        // Elements currently open inside a record subtree
        let mut open: Vec<RawRecord> = Vec::new();
        // (position in `open`, output slot) for each open record element
        let mut open_records: Vec<(usize, usize)> = Vec::new();
        let mut slots: Vec<Option<RawRecord>> = Vec::new();
        let mut depth = 0usize;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                KpiError::ParseError(format!(
                    "invalid XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;

            match event {
                Event::Start(start) => {
                    depth += 1;
                    self.check_depth(depth)?;

                    let is_record = start.name().as_ref() == tag;
                    if is_record || !open.is_empty() {
                        let node = element(&start)?;
                        if is_record {
                            open_records.push((open.len(), slots.len()));
                            slots.push(None);
                        }
                        open.push(node);
                    }
                }
                Event::Empty(start) => {
                    self.check_depth(depth + 1)?;

                    let is_record = start.name().as_ref() == tag;
                    if is_record || !open.is_empty() {
                        let node = element(&start)?;
                        match open.last_mut() {
                            Some(parent) => {
                                if is_record {
                                    slots.push(Some(node.clone()));
                                }
                                parent.children.push(node);
                            }
                            None => slots.push(Some(node)),
                        }
                    }
                }
                Event::End(_) => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        KpiError::ParseError("unexpected closing tag".to_string())
                    })?;

                    if let Some(node) = open.pop() {
                        let closes_record = open_records
                            .last()
                            .is_some_and(|(position, _)| *position == open.len());
                        let slot = if closes_record {
                            open_records.pop().map(|(_, slot)| slot)
                        } else {
                            None
                        };

                        match (open.last_mut(), slot) {
                            (Some(parent), Some(slot)) => {
                                slots[slot] = Some(node.clone());
                                parent.children.push(node);
                            }
                            (Some(parent), None) => parent.children.push(node),
                            (None, Some(slot)) => slots[slot] = Some(node),
                            (None, None) => {}
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if depth != 0 || !open.is_empty() {
            return Err(KpiError::ParseError(
                "unexpected end of document: unclosed elements".to_string(),
            ));
        }

        let records: Vec<RawRecord> = slots.into_iter().flatten().collect();
        tracing::debug!(records = records.len(), tag = %self.record_tag, "read XML export");
        Ok(records)
    }

    fn check_depth(&self, depth: usize) -> Result<(), KpiError> {
        if depth > self.max_depth {
            return Err(KpiError::ParseError(format!(
                "element nesting exceeds maximum depth of {}",
                self.max_depth
            )));
        }
        Ok(())
    }
}

fn element(start: &BytesStart<'_>) -> Result<RawRecord, KpiError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut record = RawRecord::new(tag);

    for attribute in start.attributes() {
        let attribute = attribute
            .map_err(|e| KpiError::ParseError(format!("invalid attribute: {e}")))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| KpiError::ParseError(format!("invalid attribute value: {e}")))?
            .into_owned();
        record.attributes.push((key, value));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE HealthData [
<!ELEMENT HealthData (ExportDate,Me,(Record|Workout)*)>
]>
<HealthData locale="en_US">
 <ExportDate value="2024-02-01 10:00:00 +0000"/>
 <Me HKCharacteristicTypeIdentifierBiologicalSex="HKBiologicalSexFemale"/>
 <Record type="HKQuantityTypeIdentifierHeartRate" sourceName="Watch" unit="count/min" startDate="2024-01-15 08:00:00 +0000" endDate="2024-01-15 08:00:00 +0000" value="72">
  <MetadataEntry key="HKMetadataKeyHeartRateMotionContext" value="0"/>
 </Record>
 <Record type="HKQuantityTypeIdentifierHeartRateVariabilitySDNN" unit="ms" startDate="2024-01-15 09:00:00 +0000" endDate="2024-01-15 09:01:00 +0000" value="48.5">
  <HeartRateVariabilityMetadataList>
   <InstantaneousBeatsPerMinute bpm="61" time="9:00:01.00 AM"/>
   <InstantaneousBeatsPerMinute bpm="63" time="9:00:02.00 AM"/>
  </HeartRateVariabilityMetadataList>
 </Record>
 <Record type="HKQuantityTypeIdentifierStepCount" value="120" startDate="2024-01-15 10:00:00 +0000" endDate="2024-01-15 10:05:00 +0000"/>
</HealthData>"#;

    #[test]
    fn test_reads_records_in_document_order() {
        let records = XmlExportReader::default().read_str(EXPORT).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].attribute("value"), Some("72"));
        assert_eq!(records[0].children.len(), 1);
        assert_eq!(records[0].children[0].tag, "MetadataEntry");
        assert_eq!(
            records[2].attribute("type"),
            Some("HKQuantityTypeIdentifierStepCount")
        );
    }

    #[test]
    fn test_nested_children_preserved() {
        let records = XmlExportReader::default().read_str(EXPORT).unwrap();

        let list = &records[1].children[0];
        assert_eq!(list.tag, "HeartRateVariabilityMetadataList");
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[1].attribute("bpm"), Some("63"));
    }

    #[test]
    fn test_nested_records_emitted_in_order() {
        let xml = r#"<Root><Record id="outer"><Record id="inner"/></Record></Root>"#;

        let records = XmlExportReader::default().read_str(xml).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].attribute("id"), Some("outer"));
        assert_eq!(records[0].children[0].attribute("id"), Some("inner"));
        assert_eq!(records[1].attribute("id"), Some("inner"));
    }

    #[test]
    fn test_escaped_attribute_values() {
        let xml = r#"<Root><Record sourceName="Tom &amp; Jerry's Watch"/></Root>"#;

        let records = XmlExportReader::default().read_str(xml).unwrap();

        assert_eq!(records[0].attribute("sourceName"), Some("Tom & Jerry's Watch"));
    }

    #[test]
    fn test_mismatched_tags_fail() {
        let xml = r#"<Root><Record value="1"></Root>"#;
        let result = XmlExportReader::default().read_str(xml);
        assert!(matches!(result, Err(KpiError::ParseError(_))));
    }

    #[test]
    fn test_unclosed_document_fails() {
        let xml = r#"<Root><Record value="1"/>"#;
        let result = XmlExportReader::default().read_str(xml);
        assert!(matches!(result, Err(KpiError::ParseError(_))));
    }

    #[test]
    fn test_depth_limit() {
        let xml = "<a><b><c><Record/></c></b></a>";
        let result = XmlExportReader::new("Record", 3).read_str(xml);
        assert!(matches!(result, Err(KpiError::ParseError(_))));

        let records = XmlExportReader::new("Record", 4).read_str(xml).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_custom_record_tag() {
        let xml = r#"<Root><Workout kind="run"/><Record value="1"/></Root>"#;
        let records = XmlExportReader::new("Workout", 16).read_str(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute("kind"), Some("run"));
    }
}
